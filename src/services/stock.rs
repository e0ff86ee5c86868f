//! The stock store: the only code allowed to write `products.quantity`.
//!
//! `adjust` applies a signed delta with a non-negative floor; the read,
//! check and write happen in a single conditional UPDATE so two
//! concurrent movements against the same product cannot both pass a
//! stale validation. `set_absolute` is the reconciliation correction:
//! it bypasses the delta floor but still rejects negative values.

use serde::Serialize;
use sqlx::SqliteConnection;
use chrono::Utc;

use crate::error::AppError;

/// Outcome of a stock mutation. The low-stock alert, if any, is handed
/// back to the caller so it can broadcast after its transaction commits;
/// a failed notification must never fail the mutation itself.
#[derive(Debug, Clone)]
pub struct StockChange {
    pub product_id: String,
    pub new_quantity: i64,
    pub low_stock: Option<LowStockAlert>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LowStockAlert {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub min_stock: i64,
}

/// Applies `delta` to the product's quantity, failing with
/// `InsufficientStock` if the result would be negative.
pub async fn adjust(
    conn: &mut SqliteConnection,
    product_id: &str,
    delta: i64,
) -> Result<StockChange, AppError> {
    let now = Utc::now();

    let row: Option<(i64, i64, String)> = sqlx::query_as(
        r#"UPDATE products
           SET quantity = quantity + ?2, updated_at = ?3
           WHERE id = ?1 AND is_active = 1 AND quantity + ?2 >= 0
           RETURNING quantity, min_stock, name"#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some((quantity, min_stock, name)) => Ok(StockChange {
            product_id: product_id.to_string(),
            new_quantity: quantity,
            low_stock: low_stock_alert(product_id, &name, quantity, min_stock),
        }),
        None => {
            // The guarded update matched nothing: either the product is
            // unknown, or the delta would drive the quantity negative.
            let current: Option<(i64, String)> = sqlx::query_as(
                "SELECT quantity, name FROM products WHERE id = ?1 AND is_active = 1",
            )
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

            match current {
                Some((available, name)) => Err(AppError::InsufficientStock {
                    product: name,
                    available,
                    requested: -delta,
                }),
                None => Err(AppError::not_found("Product not found")),
            }
        }
    }
}

/// Overwrites the product's quantity with an absolute value. Used only by
/// inventory completion and stock-sync delivery; this is a correction,
/// not a movement, so the delta floor does not apply.
pub async fn set_absolute(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> Result<StockChange, AppError> {
    if quantity < 0 {
        return Err(AppError::validation("Stock quantity cannot be negative"));
    }

    let now = Utc::now();

    let row: Option<(i64, i64, String)> = sqlx::query_as(
        r#"UPDATE products
           SET quantity = ?2, updated_at = ?3
           WHERE id = ?1 AND is_active = 1
           RETURNING quantity, min_stock, name"#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some((quantity, min_stock, name)) => Ok(StockChange {
            product_id: product_id.to_string(),
            new_quantity: quantity,
            low_stock: low_stock_alert(product_id, &name, quantity, min_stock),
        }),
        None => Err(AppError::not_found("Product not found")),
    }
}

fn low_stock_alert(
    product_id: &str,
    name: &str,
    quantity: i64,
    min_stock: i64,
) -> Option<LowStockAlert> {
    if quantity <= min_stock {
        Some(LowStockAlert {
            product_id: product_id.to_string(),
            product_name: name.to_string(),
            quantity,
            min_stock,
        })
    } else {
        None
    }
}
