use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::collections::HashMap;

use crate::dtos::inventory::{
    CreateInventoryRequest, InventoryResponse, UpdateInventoryItemRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::inventory::{Inventory, InventoryItem};
use crate::services::inventories;
use crate::state::AppState;

pub async fn create_inventory(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateInventoryRequest>,
) -> Result<(StatusCode, Json<InventoryResponse>), AppError> {
    let (inventory, items) = inventories::start(&db_pool, &auth, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(InventoryResponse::from_parts(inventory, items)),
    ))
}

pub async fn list_inventories(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Inventory>>, AppError> {
    let inventories =
        inventories::list(&db_pool, params.get("user_id").map(String::as_str)).await?;
    Ok(Json(inventories))
}

pub async fn get_inventory(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InventoryResponse>, AppError> {
    let (inventory, items) = inventories::get(&db_pool, &id).await?;
    Ok(Json(InventoryResponse::from_parts(inventory, items)))
}

pub async fn update_item(
    State(AppState { db_pool, .. }): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
    Json(req): Json<UpdateInventoryItemRequest>,
) -> Result<Json<InventoryItem>, AppError> {
    let item = inventories::record_count(&db_pool, &id, &item_id, req).await?;
    Ok(Json(item))
}

pub async fn complete_inventory(
    State(AppState { db_pool, notifier, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<InventoryResponse>, AppError> {
    let (inventory, items) = inventories::complete(&db_pool, &notifier, &auth, &id).await?;
    Ok(Json(InventoryResponse::from_parts(inventory, items)))
}

pub async fn cancel_inventory(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<InventoryResponse>, AppError> {
    let (inventory, items) = inventories::cancel(&db_pool, &id).await?;
    Ok(Json(InventoryResponse::from_parts(inventory, items)))
}
