pub mod auth;
pub mod deletion_requests;
pub mod inventories;
pub mod products;
pub mod sales;
pub mod sync;
pub mod users;

use axum::Router;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(products::routes())
        .merge(sales::routes())
        .merge(deletion_requests::routes())
        .merge(inventories::routes())
        .merge(sync::routes())
}
