//! Offline-sync queue, delivery sweep and notifier.
//!
//! Disconnected clients hand their mutations to the queue; a sweep
//! re-applies them to the durable store and fans change events out to
//! subscribers. Delivery failures are retried up to [`MAX_ATTEMPTS`];
//! exhausted items stay queued as failed until explicitly cleared.

pub mod notifier;
pub mod queue;

pub use notifier::{Notifier, SyncEvent};
pub use queue::{MemorySyncQueue, QueueStatus, SyncKind, SyncQueue, SyncQueueItem, MAX_ATTEMPTS};

use chrono::Utc;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::dtos::sale::SaleResponse;
use crate::error::AppError;
use crate::models::product::Product;
use crate::services::{sales, stock};

#[derive(Debug, Clone, Copy)]
pub struct ProcessOutcome {
    pub success: u64,
    pub failed: u64,
}

/// Sweeps the pending items once. Items enqueued while the sweep runs
/// are picked up by the next sweep; the snapshot keeps this one stable.
pub async fn process_queue(
    pool: &SqlitePool,
    queue: &dyn SyncQueue,
    notifier: &Notifier,
) -> ProcessOutcome {
    let pending = queue.snapshot_pending();
    let mut success = 0;
    let mut failed = 0;

    for item in pending {
        match deliver(pool, notifier, &item).await {
            Ok(()) => {
                debug!(id = %item.id, "Sync item delivered");
                queue.mark_synced(&item.id);
                success += 1;
            }
            Err(err) => {
                warn!(id = %item.id, error = ?err, "Sync delivery failed");
                queue.record_failure(&item.id);
                failed += 1;
            }
        }
    }

    ProcessOutcome { success, failed }
}

async fn deliver(
    pool: &SqlitePool,
    notifier: &Notifier,
    item: &SyncQueueItem,
) -> Result<(), AppError> {
    match item.kind {
        SyncKind::Sale => deliver_sale(pool, notifier, &item.payload).await,
        SyncKind::Product => deliver_product(pool, notifier, &item.payload).await,
        SyncKind::Stock => deliver_stock(pool, notifier, &item.payload).await,
    }
}

/// Confirms a locally-created sale against the shared view and announces
/// it. Offline clients are matched through their `client_sale_id`.
async fn deliver_sale(
    pool: &SqlitePool,
    notifier: &Notifier,
    payload: &Value,
) -> Result<(), AppError> {
    let client_sale_id = payload.get("client_sale_id").and_then(Value::as_str);
    let sale_id = payload.get("sale_id").and_then(Value::as_str);

    let id: Option<String> = match (client_sale_id, sale_id) {
        (Some(client_id), _) => {
            sqlx::query_scalar("SELECT id FROM sales WHERE client_sale_id = ?1")
                .bind(client_id)
                .fetch_optional(pool)
                .await?
        }
        (None, Some(id)) => sqlx::query_scalar("SELECT id FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
        (None, None) => {
            return Err(AppError::validation(
                "Sale sync payload must carry sale_id or client_sale_id",
            ))
        }
    };

    let id = id.ok_or_else(|| AppError::not_found("Sale not found"))?;

    sqlx::query("UPDATE sales SET synced = 1, updated_at = ?2 WHERE id = ?1")
        .bind(&id)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    let (sale, items) = sales::get_sale(pool, &id).await?;
    notifier.new_sale(
        serde_json::to_value(SaleResponse::from_parts(sale, items)).unwrap_or(Value::Null),
    );

    Ok(())
}

async fn deliver_product(
    pool: &SqlitePool,
    notifier: &Notifier,
    payload: &Value,
) -> Result<(), AppError> {
    let id = payload
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::validation("Product sync payload must carry an id"))?;

    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let product = product.ok_or_else(|| AppError::not_found("Product not found"))?;

    notifier.product_updated(serde_json::to_value(&product).unwrap_or(Value::Null));

    Ok(())
}

/// Applies a client-reported absolute stock value, then announces the
/// product and, when it applies, the low-stock condition.
async fn deliver_stock(
    pool: &SqlitePool,
    notifier: &Notifier,
    payload: &Value,
) -> Result<(), AppError> {
    let product_id = payload
        .get("product_id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::validation("Stock sync payload must carry a product_id"))?;
    let new_quantity = payload
        .get("new_quantity")
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::validation("Stock sync payload must carry a new_quantity"))?;

    let mut tx = pool.begin().await?;
    let change = stock::set_absolute(&mut *tx, product_id, new_quantity).await?;
    tx.commit().await?;

    if let Some(alert) = &change.low_stock {
        notifier.low_stock_alert(alert);
    }

    let product: Option<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_optional(pool)
        .await?;
    if let Some(product) = product {
        notifier.product_updated(serde_json::to_value(&product).unwrap_or(Value::Null));
    }

    Ok(())
}

/// Bulk idempotent confirmation used when a client reports successful
/// local persistence; independent of the retry queue.
pub async fn batch_mark_synced(
    pool: &SqlitePool,
    notifier: &Notifier,
    sale_ids: &[String],
) -> Result<u64, AppError> {
    if sale_ids.is_empty() {
        return Ok(0);
    }

    let updated = sales::mark_synced(pool, sale_ids).await?;

    for id in sale_ids {
        if let Ok((sale, items)) = sales::get_sale(pool, id).await {
            notifier.new_sale(
                serde_json::to_value(SaleResponse::from_parts(sale, items)).unwrap_or(Value::Null),
            );
        }
    }

    Ok(updated)
}
