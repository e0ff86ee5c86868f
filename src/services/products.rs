//! Product collaborator: the thin persistence wrapper the stock ledger
//! reads from. Quantity is never written here; that is the stock store's
//! job.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::dtos::product::CreateProductRequest;
use crate::error::{is_unique_violation, AppError};
use crate::models::product::Product;

pub async fn create(pool: &SqlitePool, req: CreateProductRequest) -> Result<Product, AppError> {
    if req.price < 0.0 {
        return Err(AppError::validation("Price cannot be negative"));
    }
    let quantity = req.quantity.unwrap_or(0);
    if quantity < 0 {
        return Err(AppError::validation("Quantity cannot be negative"));
    }

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        description: req.description,
        sku: req.sku,
        barcode: req.barcode,
        price: req.price,
        cost_price: req.cost_price,
        quantity,
        min_stock: req.min_stock.unwrap_or(10),
        category: req.category,
        is_active: true,
        created_at: now,
        updated_at: now,
    };

    let inserted = sqlx::query(
        r#"INSERT INTO products (
            id, name, description, sku, barcode, price, cost_price,
            quantity, min_stock, category, is_active, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.sku)
    .bind(&product.barcode)
    .bind(product.price)
    .bind(product.cost_price)
    .bind(product.quantity)
    .bind(product.min_stock)
    .bind(&product.category)
    .bind(product.is_active)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(pool)
    .await;

    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AppError::conflict("A product with this SKU already exists"));
        }
        return Err(err.into());
    }

    Ok(product)
}

pub async fn get(pool: &SqlitePool, id: &str) -> Result<Product, AppError> {
    let product: Option<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = ?1 AND is_active = 1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    product.ok_or_else(|| AppError::not_found("Product not found"))
}

pub async fn list(
    pool: &SqlitePool,
    search: Option<&str>,
    category: Option<&str>,
) -> Result<Vec<Product>, AppError> {
    if let Some(search) = search {
        let pattern = format!("%{}%", search);
        let products = sqlx::query_as(
            r#"SELECT * FROM products
               WHERE name LIKE ?1 OR sku LIKE ?1 OR barcode LIKE ?1
               ORDER BY name"#,
        )
        .bind(&pattern)
        .fetch_all(pool)
        .await?;
        return Ok(products);
    }

    let products = match category {
        Some(category) => {
            sqlx::query_as("SELECT * FROM products WHERE category = ?1 ORDER BY name")
                .bind(category)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM products ORDER BY name")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(products)
}

pub async fn low_stock(pool: &SqlitePool) -> Result<Vec<Product>, AppError> {
    let products = sqlx::query_as(
        "SELECT * FROM products WHERE is_active = 1 AND quantity <= min_stock ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(products)
}
