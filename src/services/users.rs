use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::dtos::user::CreateUserRequest;
use crate::error::{is_unique_violation, AppError};
use crate::models::user::User;

pub async fn create(pool: &SqlitePool, req: CreateUserRequest) -> Result<User, AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::validation("Username is required"));
    }
    if req.password.len() < 4 {
        return Err(AppError::validation("Password is too short"));
    }

    let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
        .map_err(|err| AppError::internal(format!("Password hashing failed: {err}")))?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username.trim().to_string(),
        password_hash,
        full_name: req.full_name,
        role: req.role.unwrap_or_else(|| "seller".to_string()),
        is_active: true,
        created_at: Utc::now(),
    };

    let inserted = sqlx::query(
        r#"INSERT INTO users (id, username, password_hash, full_name, role, is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(&user.role)
    .bind(user.is_active)
    .bind(user.created_at)
    .execute(pool)
    .await;

    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AppError::conflict("A user with this username already exists"));
        }
        return Err(err.into());
    }

    Ok(user)
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as("SELECT * FROM users ORDER BY username")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE username = ?1 AND is_active = 1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}
