use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::collections::HashMap;

use crate::dtos::sale::{CreateSaleRequest, SaleListItem, SaleResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::services::sales::{self, SaleFilters};
use crate::state::AppState;

pub async fn create_sale(
    State(AppState { db_pool, sync_queue, notifier }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    let (sale, items) =
        sales::create_sale(&db_pool, sync_queue.as_ref(), &notifier, &auth, req, false).await?;
    Ok((StatusCode::CREATED, Json(SaleResponse::from_parts(sale, items))))
}

pub async fn create_draft(
    State(AppState { db_pool, sync_queue, notifier }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateSaleRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), AppError> {
    let (sale, items) =
        sales::create_sale(&db_pool, sync_queue.as_ref(), &notifier, &auth, req, true).await?;
    Ok((StatusCode::CREATED, Json(SaleResponse::from_parts(sale, items))))
}

pub async fn list_sales(
    State(AppState { db_pool, .. }): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<SaleListItem>>, AppError> {
    let filters = SaleFilters {
        seller_id: params.get("seller_id").cloned(),
        start_date: params
            .get("start_date")
            .and_then(|d| d.parse::<chrono::NaiveDate>().ok()),
        end_date: params
            .get("end_date")
            .and_then(|d| d.parse::<chrono::NaiveDate>().ok()),
        status: None,
    };

    let sales = sales::list_sales(&db_pool, filters).await?;
    Ok(Json(sales))
}

pub async fn list_drafts(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<SaleListItem>>, AppError> {
    let drafts = sales::list_drafts(&db_pool, &auth.user_id).await?;
    Ok(Json(drafts))
}

pub async fn get_sale(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, AppError> {
    let (sale, items) = sales::get_sale(&db_pool, &id).await?;
    Ok(Json(SaleResponse::from_parts(sale, items)))
}

pub async fn complete_draft(
    State(AppState { db_pool, sync_queue, notifier }): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SaleResponse>, AppError> {
    let (sale, items) =
        sales::complete_draft(&db_pool, sync_queue.as_ref(), &notifier, &id).await?;
    Ok(Json(SaleResponse::from_parts(sale, items)))
}

pub async fn delete_sale(
    State(AppState { db_pool, notifier, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    sales::delete_sale(&db_pool, &notifier, &auth, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_draft(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    sales::delete_draft(&db_pool, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
