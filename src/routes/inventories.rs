use axum::{
    routing::{get, patch},
    Router,
};
use crate::handlers::inventory;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/inventories",
            get(inventory::list_inventories).post(inventory::create_inventory),
        )
        .route("/inventories/{id}", get(inventory::get_inventory))
        .route("/inventories/{id}/items/{item_id}", patch(inventory::update_item))
        .route("/inventories/{id}/complete", patch(inventory::complete_inventory))
        .route("/inventories/{id}/cancel", patch(inventory::cancel_inventory))
        .route_layer(axum::middleware::from_fn(require_auth))
}
