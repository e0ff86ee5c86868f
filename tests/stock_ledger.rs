//! Ledger conservation: product quantity always equals the sum of the
//! applied movements, never goes negative, and a rejected commit leaves
//! every item untouched.

mod common;

use stocklite_backend::error::AppError;
use stocklite_backend::services::{sales, stock};

use common::*;

#[tokio::test]
async fn sale_debit_low_stock_signal_and_reversal() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();
    let auth = seed_user(&pool, "seller1").await;
    let product = seed_product(&pool, "Cola 33cl", "COLA-33", 10, 5).await;

    let mut events = notifier.subscribe();

    // 10 - 3 = 7, still above min_stock: no alert.
    let (_first, _) = sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 3, 100.0)]),
        false,
    )
    .await
    .expect("first sale should commit");
    assert_eq!(product_quantity(&pool, &product.id).await, 7);
    assert!(events.try_recv().is_err(), "no low-stock event expected at 7");

    // 7 - 3 = 4 <= min_stock 5: the alert fires after commit.
    let (second, _) = sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&product.id, 3, 100.0)]),
        false,
    )
    .await
    .expect("second sale should commit");
    assert_eq!(product_quantity(&pool, &product.id).await, 4);

    let event = events.try_recv().expect("low-stock event expected at 4");
    assert_eq!(event.event, "low-stock-alert");
    assert_eq!(event.data["quantity"], 4);
    assert_eq!(event.data["min_stock"], 5);

    // Deleting the completed sale credits the debit back.
    sales::delete_sale(&pool, &notifier, &auth, &second.id)
        .await
        .expect("delete should succeed");
    assert_eq!(product_quantity(&pool, &product.id).await, 7);
}

#[tokio::test]
async fn rejected_commit_debits_nothing() {
    let pool = setup_pool().await;
    let queue = queue();
    let notifier = notifier();
    let auth = seed_user(&pool, "seller1").await;
    let plenty = seed_product(&pool, "Rice 5kg", "RICE-5", 5, 0).await;
    let scarce = seed_product(&pool, "Oil 1l", "OIL-1", 1, 0).await;

    let err = sales::create_sale(
        &pool,
        queue.as_ref(),
        &notifier,
        &auth,
        sale_request(&[(&plenty.id, 2, 50.0), (&scarce.id, 3, 80.0)]),
        false,
    )
    .await
    .expect_err("sale exceeding stock must fail");

    match err {
        AppError::InsufficientStock { product, available, requested } => {
            assert_eq!(product, "Oil 1l");
            assert_eq!(available, 1);
            assert_eq!(requested, 3);
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }

    // No partial debit: both products are exactly where they started.
    assert_eq!(product_quantity(&pool, &plenty.id).await, 5);
    assert_eq!(product_quantity(&pool, &scarce.id).await, 1);
}

#[tokio::test]
async fn adjust_enforces_non_negative_floor() {
    let pool = setup_pool().await;
    let product = seed_product(&pool, "Sugar 1kg", "SUGAR-1", 2, 0).await;

    // The in-memory pool has a single connection; keep it until all the
    // direct stock calls are done, then read back through the pool.
    let mut conn = pool.acquire().await.unwrap();

    let err = stock::adjust(&mut conn, &product.id, -3)
        .await
        .expect_err("over-debit must fail");
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let change = stock::adjust(&mut conn, &product.id, -2).await.unwrap();
    assert_eq!(change.new_quantity, 0);

    let err = stock::adjust(&mut conn, "no-such-product", 1)
        .await
        .expect_err("unknown product must fail");
    assert!(matches!(err, AppError::NotFound(_)));

    drop(conn);
    assert_eq!(product_quantity(&pool, &product.id).await, 0);
}

#[tokio::test]
async fn set_absolute_rejects_negative_values() {
    let pool = setup_pool().await;
    let product = seed_product(&pool, "Milk 1l", "MILK-1", 4, 2).await;

    let mut conn = pool.acquire().await.unwrap();

    let err = stock::set_absolute(&mut conn, &product.id, -1)
        .await
        .expect_err("negative absolute value must fail");
    assert!(matches!(err, AppError::ValidationError(_)));

    let change = stock::set_absolute(&mut conn, &product.id, 1).await.unwrap();
    assert_eq!(change.new_quantity, 1);
    assert!(change.low_stock.is_some(), "1 <= min_stock 2 raises the signal");

    drop(conn);
    assert_eq!(product_quantity(&pool, &product.id).await, 1);
}
