//! Record store: durable `(collection, id) → JSON record` mapping.
//!
//! The worker reads checks from and writes checks back to a
//! [`RecordStore`]. Each record is read and written atomically; there are
//! no cross-record transactions. Two backends are provided: one JSON file
//! per record ([`FileRecordStore`]) and a PostgreSQL table
//! ([`PostgresRecordStore`]).

pub mod fs;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::MonitorError;

pub use fs::FileRecordStore;
pub use postgres::PostgresRecordStore;

/// Named group of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// Uptime checks.
    Checks,
    /// User accounts.
    Users,
}

impl Collection {
    /// Collection name as stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Checks => "checks",
            Self::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key/value store for JSON records.
#[async_trait]
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Stores a new record.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::RecordExists`] if the id is taken, or an
    /// I/O or persistence error.
    async fn create(&self, collection: Collection, id: &str, record: &Value)
    -> Result<(), MonitorError>;

    /// Reads a record.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::RecordNotFound`] if there is no such record,
    /// or an I/O or persistence error.
    async fn read(&self, collection: Collection, id: &str) -> Result<Value, MonitorError>;

    /// Replaces an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::RecordNotFound`] if there is no such record,
    /// or an I/O or persistence error.
    async fn update(&self, collection: Collection, id: &str, record: &Value)
    -> Result<(), MonitorError>;

    /// Deletes a record.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::RecordNotFound`] if there is no such record,
    /// or an I/O or persistence error.
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), MonitorError>;

    /// Lists the ids in a collection, sorted.
    ///
    /// # Errors
    ///
    /// Returns an I/O or persistence error.
    async fn list(&self, collection: Collection) -> Result<Vec<String>, MonitorError>;
}
