use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::collections::HashMap;

use crate::dtos::product::CreateProductRequest;
use crate::error::AppError;
use crate::models::product::Product;
use crate::services::products;
use crate::state::AppState;

pub async fn create_product(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = products::create(&db_pool, req).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = products::list(
        &db_pool,
        params.get("search").map(String::as_str),
        params.get("category").map(String::as_str),
    )
    .await?;
    Ok(Json(products))
}

pub async fn get_product(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>, AppError> {
    let product = products::get(&db_pool, &id).await?;
    Ok(Json(product))
}

pub async fn low_stock_products(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = products::low_stock(&db_pool).await?;
    Ok(Json(products))
}
