//! Axum router: maps URL paths to handlers.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{
    api::{api_depict, api_plan},
    page::{index, submit},
    system::healthz,
};
use crate::state::{AppState, SharedState};

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        // Page
        .route("/", get(index).post(submit))

        // API endpoints
        .route("/api/plan", post(api_plan))
        .route("/api/depict", get(api_depict))
        .route("/healthz", get(healthz))

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
