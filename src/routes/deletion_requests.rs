use axum::{
    routing::{get, patch},
    Router,
};
use crate::handlers::deletion_request;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/deletion-requests",
            get(deletion_request::list_requests).post(deletion_request::create_request),
        )
        .route("/deletion-requests/pending", get(deletion_request::list_pending))
        .route(
            "/deletion-requests/sale/{sale_id}",
            get(deletion_request::pending_for_sale),
        )
        .route(
            "/deletion-requests/{id}",
            get(deletion_request::get_request).patch(deletion_request::update_request),
        )
        .route("/deletion-requests/{id}/approve", patch(deletion_request::approve_request))
        .route("/deletion-requests/{id}/reject", patch(deletion_request::reject_request))
        .route_layer(axum::middleware::from_fn(require_auth))
}
