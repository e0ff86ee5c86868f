//! Deletion-request workflow: a time-boxed Pending → Approved/Rejected
//! state machine over sales.
//!
//! Approval is a two-phase operation inside one transaction: first every
//! request referencing the sale is detached (the FK is nulled), then the
//! sale is removed and its stock credited back. The detach must land
//! before the removal or the FK constraint rejects it.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, AuditEntry};
use crate::dtos::deletion_request::{
    CreateDeletionRequestRequest, DeletionRequestResponse, UpdateDeletionRequestRequest,
};
use crate::error::{is_unique_violation, AppError};
use crate::middleware::auth::AuthContext;
use crate::models::deletion_request::{DeletionRequest, DeletionRequestStatus};
use crate::services::sales;
use crate::sync::Notifier;

/// A requester may amend their request for five minutes after creation.
const EDIT_WINDOW_MINUTES: i64 = 5;

pub async fn create(
    pool: &SqlitePool,
    notifier: &Notifier,
    auth: &AuthContext,
    req: CreateDeletionRequestRequest,
) -> Result<DeletionRequest, AppError> {
    if req.reasons.is_empty() {
        return Err(AppError::validation("At least one reason is required"));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let sale: Option<(String,)> = sqlx::query_as("SELECT sale_number FROM sales WHERE id = ?1")
        .bind(&req.sale_id)
        .fetch_optional(&mut *tx)
        .await?;
    let (sale_number,) = sale.ok_or_else(|| AppError::not_found("Sale not found"))?;

    let request = DeletionRequest {
        id: Uuid::new_v4().to_string(),
        sale_id: Some(req.sale_id.clone()),
        sale_number,
        seller_id: auth.user_id.clone(),
        seller_name: auth.username.clone(),
        reasons: encode_reasons(&req.reasons)?,
        description: req.description,
        status: DeletionRequestStatus::Pending,
        admin_response: None,
        admin_response_at: None,
        created_at: now,
        updated_at: now,
    };

    // The partial unique index on (sale_id) WHERE status = 'pending'
    // backs the one-pending-request invariant even under concurrent
    // creates; the insert is the authoritative check.
    let inserted = sqlx::query(
        r#"INSERT INTO deletion_requests (
            id, sale_id, sale_number, seller_id, seller_name, reasons,
            description, status, admin_response, admin_response_at,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"#,
    )
    .bind(&request.id)
    .bind(&request.sale_id)
    .bind(&request.sale_number)
    .bind(&request.seller_id)
    .bind(&request.seller_name)
    .bind(&request.reasons)
    .bind(&request.description)
    .bind(request.status)
    .bind(&request.admin_response)
    .bind(request.admin_response_at)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(&mut *tx)
    .await;

    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AppError::conflict(
                "A deletion request is already pending for this sale",
            ));
        }
        return Err(err.into());
    }

    tx.commit().await?;

    notifier.new_deletion_request(response_json(&request));

    Ok(request)
}

/// Amends a pending request. Only the original requester may edit, and
/// only within the edit window.
pub async fn edit(
    pool: &SqlitePool,
    auth: &AuthContext,
    id: &str,
    req: UpdateDeletionRequestRequest,
) -> Result<DeletionRequest, AppError> {
    let request = get(pool, id).await?;

    if request.seller_id != auth.user_id {
        return Err(AppError::forbidden("You cannot edit this deletion request"));
    }
    if request.status != DeletionRequestStatus::Pending {
        return Err(AppError::conflict(
            "This deletion request has already been processed",
        ));
    }

    let now = Utc::now();
    if now.signed_duration_since(request.created_at) >= Duration::minutes(EDIT_WINDOW_MINUTES) {
        return Err(AppError::EditWindowExpired);
    }

    let reasons = encode_reasons(&req.reasons)?;
    let updated = sqlx::query(
        r#"UPDATE deletion_requests
           SET reasons = ?2, description = ?3, updated_at = ?4
           WHERE id = ?1 AND status = 'pending'"#,
    )
    .bind(id)
    .bind(&reasons)
    .bind(&req.description)
    .bind(now)
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict(
            "This deletion request has already been processed",
        ));
    }

    get(pool, id).await
}

/// Approves the request: detach every reference to the sale, persist the
/// approval, then remove the sale and credit its stock back — one
/// transactional unit.
pub async fn approve(
    pool: &SqlitePool,
    notifier: &Notifier,
    auth: &AuthContext,
    id: &str,
    admin_response: Option<String>,
) -> Result<DeletionRequest, AppError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let request = fetch(&mut *tx, id).await?;
    if request.status != DeletionRequestStatus::Pending {
        return Err(AppError::conflict(
            "This deletion request has already been processed",
        ));
    }
    let sale_id = request
        .sale_id
        .clone()
        .ok_or_else(|| AppError::conflict("This deletion request no longer references a sale"))?;

    let response = admin_response
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Request approved and sale deleted".to_string());

    // Phase 1: persist the approval and null this request's FK; the
    // status guard makes concurrent approvals lose cleanly.
    let updated = sqlx::query(
        r#"UPDATE deletion_requests
           SET status = 'approved', admin_response = ?2, admin_response_at = ?3,
               sale_id = NULL, updated_at = ?3
           WHERE id = ?1 AND status = 'pending'"#,
    )
    .bind(id)
    .bind(&response)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict(
            "This deletion request has already been processed",
        ));
    }

    // Still phase 1: every other request pointing at the sale must be
    // detached before the sale row goes away.
    sqlx::query("UPDATE deletion_requests SET sale_id = NULL, updated_at = ?2 WHERE sale_id = ?1")
        .bind(&sale_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    // Phase 2: reverse the sale's stock effect and remove it.
    let (sale, changes) = sales::remove_sale_restoring_stock(&mut *tx, &sale_id).await?;

    tx.commit().await?;

    for change in &changes {
        if let Some(alert) = &change.low_stock {
            notifier.low_stock_alert(alert);
        }
    }

    let approved = get(pool, id).await?;
    notifier.deletion_request_approved(response_json(&approved));
    audit::record(
        pool,
        AuditEntry {
            user_id: &auth.user_id,
            username: &auth.username,
            role: &auth.role,
            action: "approve",
            module: "deletion-requests",
            subject: Some(format!("Sale {} deleted on request", sale.sale_number)),
            details: Some(json!({ "request_id": id, "sale_number": sale.sale_number })),
        },
    )
    .await;

    Ok(approved)
}

/// Rejects the request. A rejection reason is mandatory; nothing touches
/// stock.
pub async fn reject(
    pool: &SqlitePool,
    notifier: &Notifier,
    auth: &AuthContext,
    id: &str,
    admin_response: Option<String>,
) -> Result<DeletionRequest, AppError> {
    let response = admin_response
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::validation("A rejection reason is required"))?;

    let request = get(pool, id).await?;
    if request.status != DeletionRequestStatus::Pending {
        return Err(AppError::conflict(
            "This deletion request has already been processed",
        ));
    }

    let now = Utc::now();
    let updated = sqlx::query(
        r#"UPDATE deletion_requests
           SET status = 'rejected', admin_response = ?2, admin_response_at = ?3, updated_at = ?3
           WHERE id = ?1 AND status = 'pending'"#,
    )
    .bind(id)
    .bind(&response)
    .bind(now)
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict(
            "This deletion request has already been processed",
        ));
    }

    let rejected = get(pool, id).await?;
    notifier.deletion_request_rejected(response_json(&rejected));
    audit::record(
        pool,
        AuditEntry {
            user_id: &auth.user_id,
            username: &auth.username,
            role: &auth.role,
            action: "reject",
            module: "deletion-requests",
            subject: Some(format!("Deletion request for sale {}", rejected.sale_number)),
            details: Some(json!({ "request_id": id })),
        },
    )
    .await;

    Ok(rejected)
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<DeletionRequest, AppError> {
    let request: Option<DeletionRequest> =
        sqlx::query_as("SELECT * FROM deletion_requests WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    request.ok_or_else(|| AppError::not_found("Deletion request not found"))
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<DeletionRequest>, AppError> {
    let requests =
        sqlx::query_as("SELECT * FROM deletion_requests ORDER BY created_at DESC")
            .fetch_all(pool)
            .await?;
    Ok(requests)
}

pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<DeletionRequest>, AppError> {
    let requests = sqlx::query_as(
        "SELECT * FROM deletion_requests WHERE status = 'pending' ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(requests)
}

pub async fn pending_for_sale(
    pool: &SqlitePool,
    sale_id: &str,
) -> Result<Option<DeletionRequest>, AppError> {
    let request = sqlx::query_as(
        "SELECT * FROM deletion_requests WHERE sale_id = ?1 AND status = 'pending'",
    )
    .bind(sale_id)
    .fetch_optional(pool)
    .await?;
    Ok(request)
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> Result<DeletionRequest, AppError> {
    let request: Option<DeletionRequest> =
        sqlx::query_as("SELECT * FROM deletion_requests WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    request.ok_or_else(|| AppError::not_found("Deletion request not found"))
}

fn encode_reasons(reasons: &[String]) -> Result<String, AppError> {
    serde_json::to_string(reasons)
        .map_err(|err| AppError::internal(format!("Failed to encode reasons: {err}")))
}

fn response_json(request: &DeletionRequest) -> serde_json::Value {
    serde_json::to_value(DeletionRequestResponse::from(request.clone()))
        .unwrap_or(serde_json::Value::Null)
}
