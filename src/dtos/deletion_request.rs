use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::deletion_request::{DeletionRequest, DeletionRequestStatus};

#[derive(Deserialize)]
pub struct CreateDeletionRequestRequest {
    pub sale_id: String,
    pub reasons: Vec<String>,
    pub description: String,
}

#[derive(Deserialize)]
pub struct UpdateDeletionRequestRequest {
    pub reasons: Vec<String>,
    pub description: String,
}

#[derive(Deserialize, Default)]
pub struct ProcessDeletionRequestRequest {
    pub admin_response: Option<String>,
}

#[derive(Serialize)]
pub struct DeletionRequestResponse {
    pub id: String,
    pub sale_id: Option<String>,
    pub sale_number: String,
    pub seller_id: String,
    pub seller_name: String,
    pub reasons: Vec<String>,
    pub description: String,
    pub status: DeletionRequestStatus,
    pub admin_response: Option<String>,
    pub admin_response_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeletionRequest> for DeletionRequestResponse {
    fn from(request: DeletionRequest) -> Self {
        let reasons = request.reason_list();
        DeletionRequestResponse {
            id: request.id,
            sale_id: request.sale_id,
            sale_number: request.sale_number,
            seller_id: request.seller_id,
            seller_name: request.seller_name,
            reasons,
            description: request.description,
            status: request.status,
            admin_response: request.admin_response,
            admin_response_at: request.admin_response_at,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}
