//! Deletion-request state machine: one pending request per sale, a
//! five-minute edit window, and approval that reverses the sale's stock
//! effect after detaching every reference.

mod common;

use chrono::{Duration, Utc};

use stocklite_backend::dtos::deletion_request::{
    CreateDeletionRequestRequest, UpdateDeletionRequestRequest,
};
use stocklite_backend::error::AppError;
use stocklite_backend::models::deletion_request::DeletionRequestStatus;
use stocklite_backend::models::sale::Sale;
use stocklite_backend::services::{deletion_requests, sales};

use common::*;

fn create_req(sale: &Sale) -> CreateDeletionRequestRequest {
    CreateDeletionRequestRequest {
        sale_id: sale.id.clone(),
        reasons: vec!["Wrong quantity".to_string()],
        description: "Customer returned the ticket".to_string(),
    }
}

async fn committed_sale(
    pool: &sqlx::SqlitePool,
    auth: &stocklite_backend::middleware::auth::AuthContext,
    product_id: &str,
    quantity: i64,
) -> Sale {
    let queue = queue();
    let notifier = notifier();
    let (sale, _) = sales::create_sale(
        pool,
        queue.as_ref(),
        &notifier,
        auth,
        sale_request(&[(product_id, quantity, 100.0)]),
        false,
    )
    .await
    .unwrap();
    sale
}

/// Rewinds a request's creation time to probe the edit window boundary.
async fn backdate_request(pool: &sqlx::SqlitePool, id: &str, age: Duration) {
    sqlx::query("UPDATE deletion_requests SET created_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now() - age)
        .execute(pool)
        .await
        .unwrap();
}

#[tokio::test]
async fn only_one_pending_request_per_sale() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let auth = seed_user(&pool, "seller1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;
    let sale = committed_sale(&pool, &auth, &product.id, 2).await;

    let request = deletion_requests::create(&pool, &notifier, &auth, create_req(&sale))
        .await
        .unwrap();
    assert_eq!(request.status, DeletionRequestStatus::Pending);

    let found = deletion_requests::pending_for_sale(&pool, &sale.id)
        .await
        .unwrap()
        .expect("pending request should be findable by sale");
    assert_eq!(found.id, request.id);

    let err = deletion_requests::create(&pool, &notifier, &auth, create_req(&sale))
        .await
        .expect_err("second pending request must fail");
    assert!(matches!(err, AppError::Conflict(_)));

    let err = deletion_requests::create(
        &pool,
        &notifier,
        &auth,
        CreateDeletionRequestRequest {
            sale_id: "no-such-sale".to_string(),
            reasons: vec!["Duplicate".to_string()],
            description: String::new(),
        },
    )
    .await
    .expect_err("unknown sale must fail");
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn edit_is_requester_only_and_time_boxed() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let requester = seed_user(&pool, "seller1").await;
    let other = seed_user(&pool, "seller2").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;
    let sale = committed_sale(&pool, &requester, &product.id, 2).await;

    let request = deletion_requests::create(&pool, &notifier, &requester, create_req(&sale))
        .await
        .unwrap();

    let update = UpdateDeletionRequestRequest {
        reasons: vec!["Wrong price".to_string(), "Duplicate".to_string()],
        description: "Amended".to_string(),
    };

    // Another seller may not touch it.
    let err = deletion_requests::edit(
        &pool,
        &other,
        &request.id,
        UpdateDeletionRequestRequest {
            reasons: update.reasons.clone(),
            description: update.description.clone(),
        },
    )
    .await
    .expect_err("other seller must be rejected");
    assert!(matches!(err, AppError::Forbidden(_)));

    // Just inside the window: allowed.
    backdate_request(&pool, &request.id, Duration::minutes(5) - Duration::milliseconds(500)).await;
    let edited = deletion_requests::edit(
        &pool,
        &requester,
        &request.id,
        UpdateDeletionRequestRequest {
            reasons: update.reasons.clone(),
            description: update.description.clone(),
        },
    )
    .await
    .expect("edit inside the window must succeed");
    assert_eq!(edited.reason_list().len(), 2);
    assert_eq!(edited.description, "Amended");

    // Just past the window: expired.
    backdate_request(&pool, &request.id, Duration::minutes(5) + Duration::milliseconds(1)).await;
    let err = deletion_requests::edit(&pool, &requester, &request.id, update)
        .await
        .expect_err("edit past the window must fail");
    assert!(matches!(err, AppError::EditWindowExpired));
}

#[tokio::test]
async fn approval_restores_stock_and_removes_the_sale() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let seller = seed_user(&pool, "seller1").await;
    let admin = seed_user(&pool, "admin1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;

    let sale = committed_sale(&pool, &seller, &product.id, 4).await;
    assert_eq!(product_quantity(&pool, &product.id).await, 6);

    let request = deletion_requests::create(&pool, &notifier, &seller, create_req(&sale))
        .await
        .unwrap();

    let approved = deletion_requests::approve(&pool, &notifier, &admin, &request.id, None)
        .await
        .unwrap();
    assert_eq!(approved.status, DeletionRequestStatus::Approved);
    assert_eq!(approved.sale_id, None, "FK must be detached on approval");
    assert!(approved.admin_response_at.is_some());

    // Stock credited back, sale unfindable.
    assert_eq!(product_quantity(&pool, &product.id).await, 10);
    assert!(matches!(
        sales::get_sale(&pool, &sale.id).await,
        Err(AppError::NotFound(_))
    ));

    // Terminal state: approving twice is a conflict.
    let err = deletion_requests::approve(&pool, &notifier, &admin, &request.id, None)
        .await
        .expect_err("second approval must fail");
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(product_quantity(&pool, &product.id).await, 10);
}

#[tokio::test]
async fn approval_detaches_every_request_for_the_sale() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let seller = seed_user(&pool, "seller1").await;
    let admin = seed_user(&pool, "admin1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;
    let sale = committed_sale(&pool, &seller, &product.id, 1).await;

    // A rejected request keeps pointing at the sale until an approval
    // detaches it.
    let first = deletion_requests::create(&pool, &notifier, &seller, create_req(&sale))
        .await
        .unwrap();
    deletion_requests::reject(
        &pool,
        &notifier,
        &admin,
        &first.id,
        Some("Not justified".to_string()),
    )
    .await
    .unwrap();

    let second = deletion_requests::create(&pool, &notifier, &seller, create_req(&sale))
        .await
        .unwrap();
    deletion_requests::approve(&pool, &notifier, &admin, &second.id, None)
        .await
        .unwrap();

    let first = deletion_requests::get(&pool, &first.id).await.unwrap();
    assert_eq!(first.sale_id, None, "rejected request must be detached too");
    assert_eq!(first.status, DeletionRequestStatus::Rejected);
}

#[tokio::test]
async fn rejection_requires_a_reason_and_keeps_stock() {
    let pool = setup_pool().await;
    let notifier = notifier();
    let seller = seed_user(&pool, "seller1").await;
    let admin = seed_user(&pool, "admin1").await;
    let product = seed_product(&pool, "Cola", "COLA-1", 10, 2).await;
    let sale = committed_sale(&pool, &seller, &product.id, 3).await;

    let request = deletion_requests::create(&pool, &notifier, &seller, create_req(&sale))
        .await
        .unwrap();

    let err = deletion_requests::reject(&pool, &notifier, &admin, &request.id, None)
        .await
        .expect_err("rejection without a reason must fail");
    assert!(matches!(err, AppError::ValidationError(_)));

    let err = deletion_requests::reject(
        &pool,
        &notifier,
        &admin,
        &request.id,
        Some("   ".to_string()),
    )
    .await
    .expect_err("blank reason must fail");
    assert!(matches!(err, AppError::ValidationError(_)));

    let rejected = deletion_requests::reject(
        &pool,
        &notifier,
        &admin,
        &request.id,
        Some("Sale looks legitimate".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(rejected.status, DeletionRequestStatus::Rejected);

    // No stock movement on rejection; the sale survives.
    assert_eq!(product_quantity(&pool, &product.id).await, 7);
    assert!(sales::get_sale(&pool, &sale.id).await.is_ok());

    // Processed is terminal for edits as well.
    let err = deletion_requests::edit(
        &pool,
        &seller,
        &request.id,
        UpdateDeletionRequestRequest {
            reasons: vec!["Other".to_string()],
            description: String::new(),
        },
    )
    .await
    .expect_err("editing a processed request must fail");
    assert!(matches!(err, AppError::Conflict(_)));
}
