use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use crate::handlers::sale;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sales", get(sale::list_sales).post(sale::create_sale))
        .route("/sales/drafts", get(sale::list_drafts))
        .route("/sales/draft", post(sale::create_draft))
        .route("/sales/draft/{id}", delete(sale::delete_draft))
        .route("/sales/{id}", get(sale::get_sale).delete(sale::delete_sale))
        .route("/sales/{id}/complete", patch(sale::complete_draft))
        .route_layer(axum::middleware::from_fn(require_auth))
}
