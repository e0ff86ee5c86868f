use axum::{extract::State, Json};

use crate::auth::jwt::sign_token;
use crate::dtos::auth::{LoginRequest, LoginResponse};
use crate::error::AppError;
use crate::services::users;
use crate::state::AppState;

pub async fn login(
    State(AppState { db_pool, .. }): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = users::find_by_username(&db_pool, &req.username)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let valid = bcrypt::verify(&req.password, &user.password_hash)
        .map_err(|err| AppError::internal(format!("Password verification failed: {err}")))?;
    if !valid {
        return Err(AppError::Unauthorized);
    }

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::internal("JWT_SECRET is not configured"))?;
    let token = sign_token(&user.id, &user.role, &user.username, &secret)?;

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}
