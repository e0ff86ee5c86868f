//! Inventory reconciliation: snapshot theoretical quantities, record
//! physical counts, then overwrite stock with the counted values.
//!
//! Completion is an authoritative correction, not a delta: whatever the
//! stock drifted to between start and completion, the counted value
//! wins. Aggregate counters are recomputed from the items after every
//! mutation.

use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, AuditEntry};
use crate::dtos::inventory::{
    CreateInventoryRequest, InventoryItemResponse, UpdateInventoryItemRequest,
};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::inventory::{Inventory, InventoryItem, InventoryItemStatus, InventoryStatus};
use crate::services::{sequence, stock};
use crate::sync::Notifier;

/// Starts an inventory, snapshotting each product's current quantity as
/// the theoretical value. The snapshot is taken here and never re-read.
pub async fn start(
    pool: &SqlitePool,
    auth: &AuthContext,
    req: CreateInventoryRequest,
) -> Result<(Inventory, Vec<InventoryItemResponse>), AppError> {
    if req.items.is_empty() {
        return Err(AppError::validation(
            "Inventory must contain at least one item",
        ));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let inventory_id = Uuid::new_v4().to_string();
    let inventory_number =
        sequence::next_number(&mut *tx, sequence::INVENTORY_TAG, now.date_naive()).await?;

    sqlx::query(
        r#"INSERT INTO inventories (
            id, inventory_number, status, notes, total_items, counted_items,
            items_with_discrepancy, total_discrepancy, user_id, created_at, updated_at
        ) VALUES (?1, ?2, 'in_progress', ?3, 0, 0, 0, 0, ?4, ?5, ?5)"#,
    )
    .bind(&inventory_id)
    .bind(&inventory_number)
    .bind(&req.notes)
    .bind(&auth.user_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for item in &req.items {
        let theoretical: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1 AND is_active = 1")
                .bind(&item.product_id)
                .fetch_optional(&mut *tx)
                .await?;
        let theoretical = theoretical.ok_or_else(|| {
            AppError::not_found(format!("Product {} not found", item.product_id))
        })?;

        if let Some(physical) = item.physical_quantity {
            if physical < 0 {
                return Err(AppError::validation("Physical quantity cannot be negative"));
            }
        }

        let (difference, status) = item_state(theoretical, item.physical_quantity);

        sqlx::query(
            r#"INSERT INTO inventory_items (
                id, inventory_id, product_id, theoretical_quantity,
                physical_quantity, difference, status, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&inventory_id)
        .bind(&item.product_id)
        .bind(theoretical)
        .bind(item.physical_quantity)
        .bind(difference)
        .bind(status)
        .bind(&item.notes)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    recompute_stats(&mut *tx, &inventory_id).await?;

    tx.commit().await?;

    get(pool, &inventory_id).await
}

/// Records a physical count for one item, then recomputes the aggregate
/// counters from all items.
pub async fn record_count(
    pool: &SqlitePool,
    inventory_id: &str,
    item_id: &str,
    req: UpdateInventoryItemRequest,
) -> Result<InventoryItem, AppError> {
    let mut tx = pool.begin().await?;

    let inventory = fetch(&mut *tx, inventory_id).await?;
    if inventory.status != InventoryStatus::InProgress {
        return Err(AppError::conflict(
            "Cannot update items of a completed or cancelled inventory",
        ));
    }

    let item: Option<InventoryItem> = sqlx::query_as(
        "SELECT * FROM inventory_items WHERE id = ?1 AND inventory_id = ?2",
    )
    .bind(item_id)
    .bind(inventory_id)
    .fetch_optional(&mut *tx)
    .await?;
    let mut item = item.ok_or_else(|| AppError::not_found("Inventory item not found"))?;

    if let Some(physical) = req.physical_quantity {
        if physical < 0 {
            return Err(AppError::validation("Physical quantity cannot be negative"));
        }
        let (difference, status) = item_state(item.theoretical_quantity, Some(physical));
        item.physical_quantity = Some(physical);
        item.difference = difference;
        item.status = status;
    }
    if let Some(notes) = req.notes {
        item.notes = Some(notes);
    }

    sqlx::query(
        r#"UPDATE inventory_items
           SET physical_quantity = ?2, difference = ?3, status = ?4, notes = ?5
           WHERE id = ?1"#,
    )
    .bind(&item.id)
    .bind(item.physical_quantity)
    .bind(item.difference)
    .bind(item.status)
    .bind(&item.notes)
    .execute(&mut *tx)
    .await?;

    recompute_stats(&mut *tx, inventory_id).await?;

    tx.commit().await?;

    Ok(item)
}

/// Completes the inventory, overwriting stock with the counted value for
/// every item with a non-zero difference. Non-discrepant items are left
/// untouched.
pub async fn complete(
    pool: &SqlitePool,
    notifier: &Notifier,
    auth: &AuthContext,
    id: &str,
) -> Result<(Inventory, Vec<InventoryItemResponse>), AppError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let inventory = fetch(&mut *tx, id).await?;
    if inventory.status != InventoryStatus::InProgress {
        return Err(AppError::conflict("Inventory is not in progress"));
    }

    let discrepant: Vec<(String, i64)> = sqlx::query_as(
        r#"SELECT product_id, physical_quantity FROM inventory_items
           WHERE inventory_id = ?1 AND physical_quantity IS NOT NULL AND difference != 0"#,
    )
    .bind(id)
    .fetch_all(&mut *tx)
    .await?;

    let mut alerts = Vec::new();
    for (product_id, physical_quantity) in &discrepant {
        let change = stock::set_absolute(&mut *tx, product_id, *physical_quantity).await?;
        alerts.extend(change.low_stock);
    }

    let updated = sqlx::query(
        r#"UPDATE inventories
           SET status = 'completed', completed_at = ?2, updated_at = ?2
           WHERE id = ?1 AND status = 'in_progress'"#,
    )
    .bind(id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Inventory is not in progress"));
    }

    tx.commit().await?;

    for alert in &alerts {
        notifier.low_stock_alert(alert);
    }
    audit::record(
        pool,
        AuditEntry {
            user_id: &auth.user_id,
            username: &auth.username,
            role: &auth.role,
            action: "complete",
            module: "inventories",
            subject: Some(format!("Inventory {} completed", inventory.inventory_number)),
            details: Some(json!({
                "inventory_id": id,
                "corrections": discrepant.len(),
            })),
        },
    )
    .await;

    get(pool, id).await
}

/// Cancels the inventory, discarding all counts without touching stock.
pub async fn cancel(
    pool: &SqlitePool,
    id: &str,
) -> Result<(Inventory, Vec<InventoryItemResponse>), AppError> {
    let now = Utc::now();

    let inventory: Option<Inventory> = sqlx::query_as("SELECT * FROM inventories WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let inventory = inventory.ok_or_else(|| AppError::not_found("Inventory not found"))?;
    if inventory.status != InventoryStatus::InProgress {
        return Err(AppError::conflict("Inventory is not in progress"));
    }

    let updated = sqlx::query(
        r#"UPDATE inventories SET status = 'cancelled', updated_at = ?2
           WHERE id = ?1 AND status = 'in_progress'"#,
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::conflict("Inventory is not in progress"));
    }

    get(pool, id).await
}

pub async fn get(
    pool: &SqlitePool,
    id: &str,
) -> Result<(Inventory, Vec<InventoryItemResponse>), AppError> {
    let inventory: Option<Inventory> = sqlx::query_as("SELECT * FROM inventories WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let inventory = inventory.ok_or_else(|| AppError::not_found("Inventory not found"))?;

    let items: Vec<InventoryItemResponse> = sqlx::query_as(
        r#"SELECT
            ii.id, ii.inventory_id, ii.product_id, p.name AS product_name,
            p.sku AS product_sku, ii.theoretical_quantity, ii.physical_quantity,
            ii.difference, ii.status, ii.notes, ii.created_at
           FROM inventory_items ii
           JOIN products p ON p.id = ii.product_id
           WHERE ii.inventory_id = ?1
           ORDER BY ii.rowid"#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok((inventory, items))
}

pub async fn list(pool: &SqlitePool, user_id: Option<&str>) -> Result<Vec<Inventory>, AppError> {
    let inventories = match user_id {
        Some(user_id) => {
            sqlx::query_as(
                "SELECT * FROM inventories WHERE user_id = ?1 ORDER BY created_at DESC",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM inventories ORDER BY created_at DESC")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(inventories)
}

fn item_state(theoretical: i64, physical: Option<i64>) -> (i64, InventoryItemStatus) {
    match physical {
        None => (0, InventoryItemStatus::Pending),
        Some(physical) => {
            let difference = physical - theoretical;
            let status = if difference == 0 {
                InventoryItemStatus::Counted
            } else {
                InventoryItemStatus::Discrepancy
            };
            (difference, status)
        }
    }
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> Result<Inventory, AppError> {
    let inventory: Option<Inventory> = sqlx::query_as("SELECT * FROM inventories WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    inventory.ok_or_else(|| AppError::not_found("Inventory not found"))
}

/// Full recompute from the items; incremental updates would drift under
/// concurrent item mutations.
async fn recompute_stats(conn: &mut SqliteConnection, inventory_id: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"UPDATE inventories SET
            total_items = (SELECT COUNT(*) FROM inventory_items WHERE inventory_id = ?1),
            counted_items = (SELECT COUNT(*) FROM inventory_items
                             WHERE inventory_id = ?1 AND physical_quantity IS NOT NULL),
            items_with_discrepancy = (SELECT COUNT(*) FROM inventory_items
                                      WHERE inventory_id = ?1 AND status = 'discrepancy'),
            total_discrepancy = (SELECT COALESCE(SUM(ABS(difference)), 0) FROM inventory_items
                                 WHERE inventory_id = ?1),
            updated_at = ?2
           WHERE id = ?1"#,
    )
    .bind(inventory_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}
