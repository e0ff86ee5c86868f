use axum::{routing::post, Router};
use crate::handlers::auth;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    // Login is the one route outside the auth layer
    Router::new().route("/auth/login", post(auth::login))
}
