use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::inventory::{Inventory, InventoryItemStatus, InventoryStatus};

#[derive(Deserialize)]
pub struct CreateInventoryRequest {
    pub notes: Option<String>,
    pub items: Vec<CreateInventoryItemRequest>,
}

#[derive(Deserialize)]
pub struct CreateInventoryItemRequest {
    pub product_id: String,
    /// Counts may be supplied up front or recorded later, item by item.
    pub physical_quantity: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateInventoryItemRequest {
    pub physical_quantity: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct InventoryResponse {
    pub id: String,
    pub inventory_number: String,
    pub status: InventoryStatus,
    pub notes: Option<String>,
    pub total_items: i64,
    pub counted_items: i64,
    pub items_with_discrepancy: i64,
    pub total_discrepancy: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items: Vec<InventoryItemResponse>,
}

impl InventoryResponse {
    pub fn from_parts(inventory: Inventory, items: Vec<InventoryItemResponse>) -> Self {
        InventoryResponse {
            id: inventory.id,
            inventory_number: inventory.inventory_number,
            status: inventory.status,
            notes: inventory.notes,
            total_items: inventory.total_items,
            counted_items: inventory.counted_items,
            items_with_discrepancy: inventory.items_with_discrepancy,
            total_discrepancy: inventory.total_discrepancy,
            user_id: inventory.user_id,
            created_at: inventory.created_at,
            updated_at: inventory.updated_at,
            completed_at: inventory.completed_at,
            items,
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct InventoryItemResponse {
    pub id: String,
    pub inventory_id: String,
    pub product_id: String,
    pub product_name: String,
    pub product_sku: String,
    pub theoretical_quantity: i64,
    pub physical_quantity: Option<i64>,
    pub difference: i64,
    pub status: InventoryItemStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
