use axum::{
    routing::{get, post},
    Router,
};
use crate::handlers::sync;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sync/status", get(sync::queue_status))
        .route("/sync/process", post(sync::process_queue))
        .route("/sync/enqueue", post(sync::enqueue))
        .route("/sync/unsynced-sales", get(sync::unsynced_sales))
        .route("/sync/batch-sync-sales", post(sync::batch_sync_sales))
        .route("/sync/clear-queue", post(sync::clear_queue))
        .route("/sync/events", get(sync::events))
        .route_layer(axum::middleware::from_fn(require_auth))
}
