use serde::{Deserialize, Serialize};

use crate::sync::SyncKind;

#[derive(Deserialize)]
pub struct EnqueueRequest {
    /// Re-enqueueing an id overwrites the buffered item.
    pub id: Option<String>,
    pub kind: SyncKind,
    pub payload: serde_json::Value,
}

#[derive(Deserialize)]
pub struct BatchSyncSalesRequest {
    pub sale_ids: Vec<String>,
}

#[derive(Serialize)]
pub struct ProcessQueueResponse {
    pub message: String,
    pub success: u64,
    pub failed: u64,
}

#[derive(Serialize)]
pub struct AckResponse {
    pub message: String,
}
