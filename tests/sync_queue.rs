//! Sync queue: bounded retries, snapshot sweeps, idempotent enqueue and
//! confirmation, and fan-out on successful delivery.

mod common;

use serde_json::json;

use stocklite_backend::services::sales;
use stocklite_backend::sync::{
    self, SyncKind, SyncQueue, SyncQueueItem, MAX_ATTEMPTS,
};

use common::*;

#[tokio::test]
async fn retries_are_bounded_and_failures_stay_queued() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();
    let auth = seed_user(&pool, "seller1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 50, 5).await;

    // Two committed sales enqueue themselves for sync.
    sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 1, 100.0)]),
        false,
    )
    .await
    .unwrap();
    sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 1, 100.0)]),
        false,
    )
    .await
    .unwrap();

    // A third item that can never deliver.
    queue.enqueue(SyncQueueItem::new(
        "broken-item",
        SyncKind::Stock,
        json!({ "product_id": "no-such-product", "new_quantity": 5 }),
    ));

    let status = queue.status();
    assert_eq!(status.total, 3);
    assert_eq!(status.pending, 3);

    let outcome = sync::process_queue(&pool, queue.as_ref(), &notifier).await;
    assert_eq!(outcome.success, 2);
    assert_eq!(outcome.failed, 1);

    // The failing item is retried on each sweep until attempts run out.
    for _ in 1..MAX_ATTEMPTS {
        let outcome = sync::process_queue(&pool, queue.as_ref(), &notifier).await;
        assert_eq!(outcome.success, 0);
        assert_eq!(outcome.failed, 1);
    }

    let status = queue.status();
    assert_eq!(status.total, 3);
    assert_eq!(status.synced, 2);
    assert_eq!(status.pending, 0);
    assert_eq!(status.failed, 1);

    // Exhausted items are skipped, not retried forever.
    let outcome = sync::process_queue(&pool, queue.as_ref(), &notifier).await;
    assert_eq!(outcome.success, 0);
    assert_eq!(outcome.failed, 0);

    // And never auto-discarded: only an explicit clear removes them.
    queue.clear();
    let status = queue.status();
    assert_eq!(status.total, 0);
    assert_eq!(status.failed, 0);
    assert_eq!(status.synced, 0);
}

#[tokio::test]
async fn successful_delivery_marks_sales_synced_and_notifies() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();
    let auth = seed_user(&pool, "seller1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 50, 5).await;

    let (sale, _) = sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 1, 100.0)]),
        false,
    )
    .await
    .unwrap();
    assert!(!sale.synced);

    let unsynced = sales::list_unsynced(&pool).await.unwrap();
    assert_eq!(unsynced.len(), 1);

    let mut events = notifier.subscribe();
    let outcome = sync::process_queue(&pool, queue.as_ref(), &notifier).await;
    assert_eq!(outcome.success, 1);

    let (sale, _) = sales::get_sale(&pool, &sale.id).await.unwrap();
    assert!(sale.synced);
    assert!(sales::list_unsynced(&pool).await.unwrap().is_empty());

    let event = events.try_recv().expect("new-sale event expected");
    assert_eq!(event.event, "new-sale");
    assert_eq!(event.data["id"], serde_json::Value::String(sale.id.clone()));
}

#[tokio::test]
async fn stock_delivery_applies_absolute_value_and_alerts() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();
    let product = seed_product(&pool, "Cola", "COLA-1", 50, 5).await;

    queue.enqueue(SyncQueueItem::new(
        "stock-1",
        SyncKind::Stock,
        json!({ "product_id": product.id, "new_quantity": 2 }),
    ));

    let mut events = notifier.subscribe();
    let outcome = sync::process_queue(&pool, queue.as_ref(), &notifier).await;
    assert_eq!(outcome.success, 1);
    assert_eq!(product_quantity(&pool, &product.id).await, 2);

    // 2 <= min_stock 5: the low-stock alert precedes the product update.
    let first = events.try_recv().expect("low-stock event expected");
    assert_eq!(first.event, "low-stock-alert");
    let second = events.try_recv().expect("product-updated event expected");
    assert_eq!(second.event, "product-updated");
}

#[tokio::test]
async fn enqueue_is_idempotent_and_resets_retry_state() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();

    let item = || {
        SyncQueueItem::new(
            "dup-item",
            SyncKind::Stock,
            json!({ "product_id": "missing", "new_quantity": 1 }),
        )
    };

    queue.enqueue(item());
    queue.enqueue(item());
    assert_eq!(queue.status().total, 1, "same id overwrites, never duplicates");

    // Exhaust the retries.
    for _ in 0..MAX_ATTEMPTS {
        sync::process_queue(&pool, queue.as_ref(), &notifier).await;
    }
    assert_eq!(queue.status().failed, 1);

    // Re-enqueueing revives the item with a fresh retry budget.
    queue.enqueue(item());
    let status = queue.status();
    assert_eq!(status.failed, 0);
    assert_eq!(status.pending, 1);
}

#[tokio::test]
async fn batch_confirmation_is_idempotent() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();
    let auth = seed_user(&pool, "seller1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 50, 5).await;

    let (first, _) = sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 1, 100.0)]),
        false,
    )
    .await
    .unwrap();
    let (second, _) = sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 1, 100.0)]),
        false,
    )
    .await
    .unwrap();

    let ids = vec![first.id.clone(), second.id.clone()];

    let mut events = notifier.subscribe();
    sync::batch_mark_synced(&pool, &notifier, &ids).await.unwrap();

    let (first, _) = sales::get_sale(&pool, &first.id).await.unwrap();
    let (second, _) = sales::get_sale(&pool, &second.id).await.unwrap();
    assert!(first.synced);
    assert!(second.synced);

    assert_eq!(events.try_recv().unwrap().event, "new-sale");
    assert_eq!(events.try_recv().unwrap().event, "new-sale");

    // Confirming again is harmless.
    sync::batch_mark_synced(&pool, &notifier, &ids).await.unwrap();
    let (first, _) = sales::get_sale(&pool, &first.id).await.unwrap();
    assert!(first.synced);
}
