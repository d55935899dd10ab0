//! Worker status endpoints: sweep counters and check log listing.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app_state::AppState;
use crate::error::{ErrorResponse, MonitorError};
use crate::worker::StatsSnapshot;

/// Worker counters and configuration.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    /// Counters since process start.
    pub stats: StatsSnapshot,
    /// Checks currently being probed or rotated.
    pub in_flight: usize,
    /// Check sweep period in seconds.
    pub check_interval_secs: u64,
    /// Rotation sweep period in seconds.
    pub rotation_interval_secs: u64,
    /// Concurrent work units per sweep.
    pub sweep_concurrency: usize,
    /// Per-user check quota.
    pub max_checks_per_user: u32,
}

/// `GET /status`: Worker counters.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Worker",
    summary = "Worker status",
    description = "Returns sweep counters, the number of checks in flight, and the configured intervals.",
    responses(
        (status = 200, description = "Current worker status", body = StatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let ctx = &state.ctx;
    let settings = ctx.settings();
    Json(StatusResponse {
        stats: ctx.stats().snapshot(),
        in_flight: ctx.in_flight().len(),
        check_interval_secs: settings.check_interval.as_secs(),
        rotation_interval_secs: settings.rotation_interval.as_secs(),
        sweep_concurrency: settings.sweep_concurrency,
        max_checks_per_user: settings.max_checks_per_user,
    })
}

/// Query parameters for the log listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Also list archive segments.
    #[serde(default)]
    pub include_archived: bool,
}

/// Log ids known to the archive.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogListResponse {
    /// Sorted log ids.
    pub logs: Vec<String>,
    /// Number of ids.
    pub count: usize,
    /// Whether archive segments were included.
    pub include_archived: bool,
}

/// `GET /logs`: List check logs.
///
/// # Errors
///
/// Returns [`MonitorError::Io`] if the archive directory cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/logs",
    tag = "Worker",
    summary = "List check logs",
    description = "Lists active log ids, and archive segment ids when `include_archived` is set.",
    params(LogsQuery),
    responses(
        (status = 200, description = "Log ids", body = LogListResponse),
        (status = 500, description = "Archive unreadable", body = ErrorResponse),
    )
)]
pub async fn logs_handler(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogListResponse>, MonitorError> {
    let logs = state.ctx.archive().list(query.include_archived).await?;
    Ok(Json(LogListResponse {
        count: logs.len(),
        logs,
        include_archived: query.include_archived,
    }))
}

/// Worker routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(status_handler))
        .route("/logs", get(logs_handler))
}
