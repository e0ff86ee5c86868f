use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeletionRequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, FromRow)]
pub struct DeletionRequest {
    pub id: String,
    /// Nulled on approval before the referenced sale is removed.
    pub sale_id: Option<String>,
    pub sale_number: String,
    pub seller_id: String,
    pub seller_name: String,
    /// JSON array of reason strings.
    pub reasons: String,
    pub description: String,
    pub status: DeletionRequestStatus,
    pub admin_response: Option<String>,
    pub admin_response_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeletionRequest {
    pub fn reason_list(&self) -> Vec<String> {
        serde_json::from_str(&self.reasons).unwrap_or_default()
    }
}
