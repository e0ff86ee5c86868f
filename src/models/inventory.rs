use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InventoryStatus {
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InventoryItemStatus {
    Pending,
    Counted,
    Discrepancy,
}

/// Aggregate counters are recomputed from the items after every item
/// mutation, never drifted incrementally.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Inventory {
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
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InventoryItem {
    pub id: String,
    pub inventory_id: String,
    pub product_id: String,
    /// Snapshot of the product's stock when the inventory was started.
    pub theoretical_quantity: i64,
    pub physical_quantity: Option<i64>,
    pub difference: i64,
    pub status: InventoryItemStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
