//! Inventory reconciliation: snapshot at start, full aggregate
//! recomputes, and completion as an absolute overwrite that beats any
//! drift accumulated since the snapshot.

mod common;

use stocklite_backend::dtos::inventory::{
    CreateInventoryRequest, CreateInventoryItemRequest, UpdateInventoryItemRequest,
};
use stocklite_backend::error::AppError;
use stocklite_backend::models::inventory::{InventoryItemStatus, InventoryStatus};
use stocklite_backend::services::{inventories, stock};

use common::*;

fn start_req(product_ids: &[&str]) -> CreateInventoryRequest {
    CreateInventoryRequest {
        notes: None,
        items: product_ids
            .iter()
            .map(|product_id| CreateInventoryItemRequest {
                product_id: product_id.to_string(),
                physical_quantity: None,
                notes: None,
            })
            .collect(),
    }
}

fn count(physical: i64) -> UpdateInventoryItemRequest {
    UpdateInventoryItemRequest {
        physical_quantity: Some(physical),
        notes: None,
    }
}

#[tokio::test]
async fn start_snapshots_theoretical_quantities() {
    let pool = setup_pool().await;
    let auth = seed_user(&pool, "counter1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;

    let (inventory, items) = inventories::start(&pool, &auth, start_req(&[&product.id]))
        .await
        .unwrap();

    assert_eq!(inventory.status, InventoryStatus::InProgress);
    assert!(inventory.inventory_number.starts_with("IN"));
    assert_eq!(inventory.total_items, 1);
    assert_eq!(inventory.counted_items, 0);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].theoretical_quantity, 10);
    assert_eq!(items[0].status, InventoryItemStatus::Pending);
    assert_eq!(items[0].physical_quantity, None);
}

#[tokio::test]
async fn counts_recompute_item_state_and_aggregates() {
    let pool = setup_pool().await;
    let auth = seed_user(&pool, "counter1").await;
    let cola = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;
    let oil = seed_product(&pool, "Oil", "OIL-1", 6, 2).await;

    let (inventory, items) = inventories::start(&pool, &auth, start_req(&[&cola.id, &oil.id]))
        .await
        .unwrap();

    // 7 counted against 10 theoretical: discrepancy of -3.
    let cola_item = inventories::record_count(&pool, &inventory.id, &items[0].id, count(7))
        .await
        .unwrap();
    assert_eq!(cola_item.difference, -3);
    assert_eq!(cola_item.status, InventoryItemStatus::Discrepancy);

    // Exact count: no discrepancy.
    let oil_item = inventories::record_count(&pool, &inventory.id, &items[1].id, count(6))
        .await
        .unwrap();
    assert_eq!(oil_item.difference, 0);
    assert_eq!(oil_item.status, InventoryItemStatus::Counted);

    let (inventory, _) = inventories::get(&pool, &inventory.id).await.unwrap();
    assert_eq!(inventory.total_items, 2);
    assert_eq!(inventory.counted_items, 2);
    assert_eq!(inventory.items_with_discrepancy, 1);
    assert_eq!(inventory.total_discrepancy, 3);
}

#[tokio::test]
async fn completion_overwrites_stock_even_after_drift() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let auth = seed_user(&pool, "counter1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;

    let (inventory, items) = inventories::start(&pool, &auth, start_req(&[&product.id]))
        .await
        .unwrap();
    inventories::record_count(&pool, &inventory.id, &items[0].id, count(7))
        .await
        .unwrap();

    // Stock drifts to 12 between the snapshot and completion.
    let mut conn = pool.acquire().await.unwrap();
    stock::adjust(&mut conn, &product.id, 2).await.unwrap();
    drop(conn);
    assert_eq!(product_quantity(&pool, &product.id).await, 12);

    // The counted value wins over the drift.
    let (completed, _) = inventories::complete(&pool, &notifier, &auth, &inventory.id)
        .await
        .unwrap();
    assert_eq!(completed.status, InventoryStatus::Completed);
    assert!(completed.completed_at.is_some());
    assert_eq!(product_quantity(&pool, &product.id).await, 7);

    // Double completion is a conflict and moves nothing.
    let err = inventories::complete(&pool, &notifier, &auth, &inventory.id)
        .await
        .expect_err("second completion must fail");
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(product_quantity(&pool, &product.id).await, 7);

    // Completed inventories no longer accept counts.
    let err = inventories::record_count(&pool, &inventory.id, &items[0].id, count(9))
        .await
        .expect_err("counting on a completed inventory must fail");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn non_discrepant_items_are_left_untouched() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let auth = seed_user(&pool, "counter1").await;
    let cola = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;
    let oil = seed_product(&pool, "Oil", "OIL-1", 6, 2).await;

    let (inventory, items) = inventories::start(&pool, &auth, start_req(&[&cola.id, &oil.id]))
        .await
        .unwrap();
    inventories::record_count(&pool, &inventory.id, &items[0].id, count(4))
        .await
        .unwrap();
    inventories::record_count(&pool, &inventory.id, &items[1].id, count(6))
        .await
        .unwrap();

    inventories::complete(&pool, &notifier, &auth, &inventory.id)
        .await
        .unwrap();

    assert_eq!(product_quantity(&pool, &cola.id).await, 4);
    assert_eq!(product_quantity(&pool, &oil.id).await, 6);
}

#[tokio::test]
async fn cancellation_discards_counts_without_touching_stock() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let auth = seed_user(&pool, "counter1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;

    let (inventory, items) = inventories::start(&pool, &auth, start_req(&[&product.id]))
        .await
        .unwrap();
    inventories::record_count(&pool, &inventory.id, &items[0].id, count(3))
        .await
        .unwrap();

    let (cancelled, _) = inventories::cancel(&pool, &inventory.id).await.unwrap();
    assert_eq!(cancelled.status, InventoryStatus::Cancelled);
    assert_eq!(product_quantity(&pool, &product.id).await, 10);

    // Cancelled is terminal.
    let err = inventories::complete(&pool, &notifier, &auth, &inventory.id)
        .await
        .expect_err("completing a cancelled inventory must fail");
    assert!(matches!(err, AppError::Conflict(_)));
    let err = inventories::cancel(&pool, &inventory.id)
        .await
        .expect_err("cancelling twice must fail");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn unknown_products_and_negative_counts_are_rejected() {
    let pool = setup_pool().await;
    let auth = seed_user(&pool, "counter1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;

    let err = inventories::start(&pool, &auth, start_req(&["no-such-product"]))
        .await
        .expect_err("unknown product must fail");
    assert!(matches!(err, AppError::NotFound(_)));

    let (inventory, items) = inventories::start(&pool, &auth, start_req(&[&product.id]))
        .await
        .unwrap();
    let err = inventories::record_count(&pool, &inventory.id, &items[0].id, count(-1))
        .await
        .expect_err("negative count must fail");
    assert!(matches!(err, AppError::ValidationError(_)));
}
