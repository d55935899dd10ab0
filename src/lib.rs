//! # uptime-monitor
//!
//! Background worker that periodically probes user-configured HTTP(S)
//! endpoints, tracks their up/down state, alerts owners by SMS when the
//! state changes, and keeps a per-check log that is rotated into
//! compressed archive segments.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler (worker/)
//!     │
//!     ├── Check sweep ──▶ RecordStore (store/) ──▶ validate_check (domain/)
//!     │                      │
//!     │                      ├── Prober (worker/probe)
//!     │                      ├── LogArchive::append (archive/)
//!     │                      ├── RecordStore::update
//!     │                      └── Notifier (notify/)
//!     │
//!     └── Rotation sweep ──▶ LogArchive::compress + truncate
//!
//! Status API (api/) ──▶ WorkerContext counters, log listing
//! ```

pub mod api;
pub mod app_state;
pub mod archive;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod store;
pub mod worker;
