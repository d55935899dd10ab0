//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::worker::WorkerContext;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Worker context the status API reports on.
    pub ctx: Arc<WorkerContext>,
}

impl AppState {
    /// Wraps the running worker's context.
    #[must_use]
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { ctx }
    }
}
