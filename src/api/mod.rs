//! Read-only status API: route handlers and router composition.
//!
//! Worker endpoints are mounted under `/api/v1`; `/health` and the
//! OpenAPI document live at the root.

pub mod handlers;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::error::{ErrorBody, ErrorResponse};
use crate::worker::StatsSnapshot;

/// OpenAPI document for the status API.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "uptime-monitor status API"),
    paths(
        handlers::system::health_handler,
        handlers::status::status_handler,
        handlers::status::logs_handler,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        handlers::status::StatusResponse,
        handlers::status::LogListResponse,
        StatsSnapshot,
        ErrorResponse,
        ErrorBody,
    )),
    tags(
        (name = "System", description = "Liveness"),
        (name = "Worker", description = "Sweep counters and check logs"),
    )
)]
pub struct ApiDoc;

async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .route("/api-docs/openapi.json", get(openapi_handler))
}
