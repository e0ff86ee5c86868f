use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};

use crate::dtos::deletion_request::{
    CreateDeletionRequestRequest, DeletionRequestResponse, ProcessDeletionRequestRequest,
    UpdateDeletionRequestRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::services::deletion_requests;
use crate::state::AppState;

pub async fn create_request(
    State(AppState { db_pool, notifier, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateDeletionRequestRequest>,
) -> Result<(StatusCode, Json<DeletionRequestResponse>), AppError> {
    let request = deletion_requests::create(&db_pool, &notifier, &auth, req).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn list_requests(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<DeletionRequestResponse>>, AppError> {
    let requests = deletion_requests::list_all(&db_pool).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

pub async fn list_pending(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<DeletionRequestResponse>>, AppError> {
    let requests = deletion_requests::list_pending(&db_pool).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

pub async fn pending_for_sale(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(sale_id): Path<String>,
) -> Result<Json<Option<DeletionRequestResponse>>, AppError> {
    let request = deletion_requests::pending_for_sale(&db_pool, &sale_id).await?;
    Ok(Json(request.map(Into::into)))
}

pub async fn get_request(
    State(AppState { db_pool, .. }): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeletionRequestResponse>, AppError> {
    let request = deletion_requests::get(&db_pool, &id).await?;
    Ok(Json(request.into()))
}

pub async fn update_request(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<UpdateDeletionRequestRequest>,
) -> Result<Json<DeletionRequestResponse>, AppError> {
    let request = deletion_requests::edit(&db_pool, &auth, &id, req).await?;
    Ok(Json(request.into()))
}

pub async fn approve_request(
    State(AppState { db_pool, notifier, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<ProcessDeletionRequestRequest>,
) -> Result<Json<DeletionRequestResponse>, AppError> {
    let request =
        deletion_requests::approve(&db_pool, &notifier, &auth, &id, req.admin_response).await?;
    Ok(Json(request.into()))
}

pub async fn reject_request(
    State(AppState { db_pool, notifier, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    Json(req): Json<ProcessDeletionRequestRequest>,
) -> Result<Json<DeletionRequestResponse>, AppError> {
    let request =
        deletion_requests::reject(&db_pool, &notifier, &auth, &id, req.admin_response).await?;
    Ok(Json(request.into()))
}
