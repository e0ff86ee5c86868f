//! Best-effort audit sink.
//!
//! Audit writes ride alongside business operations but must never fail
//! them: `record` swallows and logs any failure, while the underlying
//! `insert` stays fallible so the two outcomes remain distinct.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct AuditEntry<'a> {
    pub user_id: &'a str,
    pub username: &'a str,
    pub role: &'a str,
    pub action: &'a str,
    pub module: &'a str,
    pub subject: Option<String>,
    pub details: Option<serde_json::Value>,
}

pub async fn record(pool: &SqlitePool, entry: AuditEntry<'_>) {
    if let Err(err) = insert(pool, &entry).await {
        tracing::warn!(
            action = entry.action,
            module = entry.module,
            error = %err,
            "Failed to write audit log"
        );
    }
}

async fn insert(pool: &SqlitePool, entry: &AuditEntry<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO audit_logs (id, user_id, username, role, action, module, subject, details, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(entry.user_id)
    .bind(entry.username)
    .bind(entry.role)
    .bind(entry.action)
    .bind(entry.module)
    .bind(&entry.subject)
    .bind(entry.details.as_ref().map(|d| d.to_string()))
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}
