use axum::{routing::get, Router};
use crate::handlers::user;
use crate::middleware::auth::require_auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(user::list_users).post(user::create_user))
        .route_layer(axum::middleware::from_fn(require_auth))
}
