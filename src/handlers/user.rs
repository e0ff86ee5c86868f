use axum::{extract::State, http::StatusCode, Json};

use crate::dtos::user::{CreateUserRequest, UserResponse};
use crate::error::AppError;
use crate::services::users;
use crate::state::AppState;

pub async fn create_user(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = users::create(&db_pool, req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn list_users(
    State(AppState { db_pool, .. }): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = users::list(&db_pool).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
