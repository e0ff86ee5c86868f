#![allow(dead_code)]

use std::sync::Arc;

use sqlx::SqlitePool;

use stocklite_backend::database;
use stocklite_backend::dtos::product::CreateProductRequest;
use stocklite_backend::dtos::sale::{CreateSaleRequest, SaleItemRequest};
use stocklite_backend::dtos::user::CreateUserRequest;
use stocklite_backend::middleware::auth::AuthContext;
use stocklite_backend::models::product::Product;
use stocklite_backend::services::{products, users};
use stocklite_backend::sync::{MemorySyncQueue, Notifier};

pub async fn setup_pool() -> SqlitePool {
    database::create_pool("sqlite::memory:")
        .await
        .expect("failed to create in-memory pool")
}

pub fn queue() -> Arc<MemorySyncQueue> {
    Arc::new(MemorySyncQueue::new())
}

pub fn notifier() -> Notifier {
    Notifier::new()
}

pub async fn seed_user(pool: &SqlitePool, username: &str) -> AuthContext {
    let user = users::create(
        pool,
        CreateUserRequest {
            username: username.to_string(),
            password: "secret".to_string(),
            full_name: Some("Test Seller".to_string()),
            role: Some("seller".to_string()),
        },
    )
    .await
    .expect("failed to seed user");

    AuthContext {
        user_id: user.id,
        role: user.role,
        username: user.username,
    }
}

pub async fn seed_product(
    pool: &SqlitePool,
    name: &str,
    sku: &str,
    quantity: i64,
    min_stock: i64,
) -> Product {
    products::create(
        pool,
        CreateProductRequest {
            name: name.to_string(),
            description: None,
            sku: sku.to_string(),
            barcode: None,
            price: 100.0,
            cost_price: Some(60.0),
            quantity: Some(quantity),
            min_stock: Some(min_stock),
            category: None,
        },
    )
    .await
    .expect("failed to seed product")
}

/// Builds a sale request over (product_id, quantity, unit_price) triples.
pub fn sale_request(items: &[(&str, i64, f64)]) -> CreateSaleRequest {
    CreateSaleRequest {
        items: items
            .iter()
            .map(|(product_id, quantity, unit_price)| SaleItemRequest {
                product_id: product_id.to_string(),
                quantity: *quantity,
                unit_price: *unit_price,
                discount: None,
            })
            .collect(),
        payment_method: None,
        discount: None,
        tax: None,
        customer_name: None,
        customer_phone: None,
        notes: None,
        client_sale_id: None,
    }
}

pub async fn product_quantity(pool: &SqlitePool, id: &str) -> i64 {
    sqlx::query_scalar("SELECT quantity FROM products WHERE id = ?1")
        .bind(id)
        .fetch_one(pool)
        .await
        .expect("failed to read product quantity")
}
