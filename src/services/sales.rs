//! Sale workflow: creation (draft or committed), draft completion,
//! deletion with stock reversal.
//!
//! A committed sale debits stock exactly once and is all-or-nothing:
//! every item is validated against current stock before any debit is
//! applied, and the whole operation runs inside one transaction so a
//! late failure rolls back cleanly with no partial debit.

use chrono::Utc;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::audit::{self, AuditEntry};
use crate::dtos::sale::{CreateSaleRequest, SaleListItem};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::sale::{PaymentMethod, Sale, SaleItem, SaleStatus};
use crate::services::{sequence, stock};
use crate::sync::{Notifier, SyncKind, SyncQueue, SyncQueueItem};

#[derive(Debug, Default)]
pub struct SaleFilters {
    pub seller_id: Option<String>,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
    pub status: Option<SaleStatus>,
}

/// Creates a sale. Drafts skip stock validation and debits entirely;
/// committed sales validate every item first and then debit every item,
/// all inside a single transaction.
pub async fn create_sale(
    pool: &SqlitePool,
    queue: &dyn SyncQueue,
    notifier: &Notifier,
    auth: &AuthContext,
    req: CreateSaleRequest,
    as_draft: bool,
) -> Result<(Sale, Vec<SaleItem>), AppError> {
    if req.items.is_empty() {
        return Err(AppError::validation("Sale must contain at least one item"));
    }

    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let sale_id = Uuid::new_v4().to_string();
    let sale_number =
        sequence::next_number(&mut *tx, sequence::SALE_TAG, now.date_naive()).await?;

    // First pass: validate everything and snapshot product details.
    let mut subtotal = 0.0;
    let mut items: Vec<SaleItem> = Vec::with_capacity(req.items.len());

    for item in &req.items {
        if item.quantity <= 0 {
            return Err(AppError::validation("Quantity must be greater than 0"));
        }
        if item.unit_price < 0.0 {
            return Err(AppError::validation("Unit price cannot be negative"));
        }
        let item_discount = item.discount.unwrap_or(0.0);
        if item_discount < 0.0 {
            return Err(AppError::validation("Item discount cannot be negative"));
        }

        let product: Option<(String, String, i64)> = sqlx::query_as(
            "SELECT name, sku, quantity FROM products WHERE id = ?1 AND is_active = 1",
        )
        .bind(&item.product_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (name, sku, available) = product.ok_or_else(|| {
            AppError::not_found(format!("Product {} not found", item.product_id))
        })?;

        if !as_draft && available < item.quantity {
            return Err(AppError::InsufficientStock {
                product: name,
                available,
                requested: item.quantity,
            });
        }

        let item_subtotal = item.quantity as f64 * item.unit_price - item_discount;
        subtotal += item_subtotal;

        items.push(SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.clone(),
            product_id: item.product_id.clone(),
            product_name: name,
            product_sku: sku,
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount: item_discount,
            subtotal: item_subtotal,
        });
    }

    // Second pass: apply every debit. The conditional update inside
    // `adjust` re-checks the floor, so a concurrent debit between the
    // two passes surfaces as InsufficientStock and rolls everything back.
    let mut alerts = Vec::new();
    if !as_draft {
        for item in &items {
            let change = stock::adjust(&mut *tx, &item.product_id, -item.quantity).await?;
            alerts.extend(change.low_stock);
        }
    }

    let discount = req.discount.unwrap_or(0.0);
    let tax = req.tax.unwrap_or(0.0);
    let total = subtotal - discount + tax;
    let status = if as_draft {
        SaleStatus::Draft
    } else {
        SaleStatus::Completed
    };

    let sale = Sale {
        id: sale_id,
        sale_number,
        seller_id: auth.user_id.clone(),
        status,
        subtotal,
        discount,
        tax,
        total,
        payment_method: req.payment_method.unwrap_or(PaymentMethod::Cash),
        customer_name: req.customer_name,
        customer_phone: req.customer_phone,
        notes: req.notes,
        synced: false,
        client_sale_id: req.client_sale_id,
        created_at: now,
        updated_at: now,
    };

    insert_sale(&mut *tx, &sale).await?;
    for item in &items {
        insert_sale_item(&mut *tx, item).await?;
    }

    tx.commit().await?;

    // Side effects only after the commit: subscribers must never observe
    // a mutation that could still roll back.
    for alert in &alerts {
        notifier.low_stock_alert(alert);
    }
    if sale.status == SaleStatus::Completed {
        enqueue_sale(queue, &sale);
    }
    audit::record(
        pool,
        AuditEntry {
            user_id: &auth.user_id,
            username: &auth.username,
            role: &auth.role,
            action: "sale",
            module: "sales",
            subject: Some(format!(
                "Sale {} - {} item(s)",
                sale.sale_number,
                items.len()
            )),
            details: Some(json!({
                "sale_id": sale.id,
                "sale_number": sale.sale_number,
                "total": sale.total,
                "status": sale.status,
            })),
        },
    )
    .await;

    Ok((sale, items))
}

/// Transitions a draft to completed, re-validating stock first since it
/// may have moved since the draft was created.
pub async fn complete_draft(
    pool: &SqlitePool,
    queue: &dyn SyncQueue,
    notifier: &Notifier,
    id: &str,
) -> Result<(Sale, Vec<SaleItem>), AppError> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    let sale: Option<Sale> =
        sqlx::query_as("SELECT * FROM sales WHERE id = ?1 AND status = 'draft'")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
    let mut sale = sale.ok_or_else(|| AppError::not_found("Draft sale not found"))?;
    let items = fetch_items(&mut *tx, id).await?;

    for item in &items {
        let available: Option<(String, i64)> = sqlx::query_as(
            "SELECT name, quantity FROM products WHERE id = ?1 AND is_active = 1",
        )
        .bind(&item.product_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (name, available) = available.ok_or_else(|| {
            AppError::not_found(format!("Product {} not found", item.product_id))
        })?;
        if available < item.quantity {
            return Err(AppError::InsufficientStock {
                product: name,
                available,
                requested: item.quantity,
            });
        }
    }

    let mut alerts = Vec::new();
    for item in &items {
        let change = stock::adjust(&mut *tx, &item.product_id, -item.quantity).await?;
        alerts.extend(change.low_stock);
    }

    let updated = sqlx::query(
        "UPDATE sales SET status = 'completed', updated_at = ?2 WHERE id = ?1 AND status = 'draft'",
    )
    .bind(id)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(AppError::not_found("Draft sale not found"));
    }

    tx.commit().await?;

    sale.status = SaleStatus::Completed;
    sale.updated_at = now;

    for alert in &alerts {
        notifier.low_stock_alert(alert);
    }
    enqueue_sale(queue, &sale);

    Ok((sale, items))
}

/// Deletes a sale, crediting stock back first when it was completed.
pub async fn delete_sale(
    pool: &SqlitePool,
    notifier: &Notifier,
    auth: &AuthContext,
    id: &str,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let (sale, changes) = remove_sale_restoring_stock(&mut *tx, id).await?;
    tx.commit().await?;

    for change in &changes {
        if let Some(alert) = &change.low_stock {
            notifier.low_stock_alert(alert);
        }
    }
    audit::record(
        pool,
        AuditEntry {
            user_id: &auth.user_id,
            username: &auth.username,
            role: &auth.role,
            action: "delete",
            module: "sales",
            subject: Some(format!("Sale {} deleted", sale.sale_number)),
            details: Some(json!({ "sale_id": sale.id, "total": sale.total })),
        },
    )
    .await;

    Ok(())
}

/// The reversal primitive shared with the deletion-request workflow:
/// credits stock back for a completed sale, then removes its rows. Runs
/// on the caller's connection so it joins the caller's transaction.
pub async fn remove_sale_restoring_stock(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<(Sale, Vec<stock::StockChange>), AppError> {
    let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let sale = sale.ok_or_else(|| AppError::not_found("Sale not found"))?;
    let items = fetch_items(conn, id).await?;

    let mut changes = Vec::new();
    if sale.status == SaleStatus::Completed {
        for item in &items {
            changes.push(stock::adjust(conn, &item.product_id, item.quantity).await?);
        }
    }

    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok((sale, changes))
}

/// Deletes a draft. No stock ever moved for a draft, so this is a plain
/// removal.
pub async fn delete_draft(pool: &SqlitePool, id: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM sales WHERE id = ?1 AND status = 'draft'")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::not_found("Draft sale not found"));
    }
    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

pub async fn get_sale(pool: &SqlitePool, id: &str) -> Result<(Sale, Vec<SaleItem>), AppError> {
    let sale: Option<Sale> = sqlx::query_as("SELECT * FROM sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let sale = sale.ok_or_else(|| AppError::not_found("Sale not found"))?;

    let mut conn = pool.acquire().await?;
    let items = fetch_items(&mut *conn, id).await?;
    Ok((sale, items))
}

pub async fn list_sales(
    pool: &SqlitePool,
    filters: SaleFilters,
) -> Result<Vec<SaleListItem>, AppError> {
    let mut sql = String::from(
        r#"SELECT
            s.id, s.sale_number, s.seller_id, s.status, s.total,
            s.payment_method, s.synced, COUNT(si.id) AS total_items, s.created_at
           FROM sales s
           LEFT JOIN sale_items si ON si.sale_id = s.id
           WHERE 1=1"#,
    );

    if filters.seller_id.is_some() {
        sql.push_str(" AND s.seller_id = ?");
    }
    if filters.status.is_some() {
        sql.push_str(" AND s.status = ?");
    }
    if filters.start_date.is_some() {
        sql.push_str(" AND s.created_at >= ?");
    }
    if filters.end_date.is_some() {
        sql.push_str(" AND s.created_at <= ?");
    }
    sql.push_str(" GROUP BY s.id ORDER BY s.created_at DESC");

    let mut query = sqlx::query_as::<_, SaleListItem>(&sql);
    if let Some(seller_id) = &filters.seller_id {
        query = query.bind(seller_id);
    }
    if let Some(status) = filters.status {
        query = query.bind(status);
    }
    if let Some(start) = filters.start_date {
        query = query.bind(start.and_hms_opt(0, 0, 0).map(|d| d.and_utc()));
    }
    if let Some(end) = filters.end_date {
        query = query.bind(end.and_hms_milli_opt(23, 59, 59, 999).map(|d| d.and_utc()));
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn list_drafts(
    pool: &SqlitePool,
    seller_id: &str,
) -> Result<Vec<SaleListItem>, AppError> {
    list_sales(
        pool,
        SaleFilters {
            seller_id: Some(seller_id.to_string()),
            status: Some(SaleStatus::Draft),
            ..Default::default()
        },
    )
    .await
}

/// Completed sales not yet confirmed by the shared view, oldest first.
pub async fn list_unsynced(pool: &SqlitePool) -> Result<Vec<(Sale, Vec<SaleItem>)>, AppError> {
    let sales: Vec<Sale> = sqlx::query_as(
        "SELECT * FROM sales WHERE synced = 0 AND status = 'completed' ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await?;

    let mut conn = pool.acquire().await?;
    let mut result = Vec::with_capacity(sales.len());
    for sale in sales {
        let items = fetch_items(&mut *conn, &sale.id).await?;
        result.push((sale, items));
    }
    Ok(result)
}

/// Bulk idempotent sync confirmation.
pub async fn mark_synced(pool: &SqlitePool, ids: &[String]) -> Result<u64, AppError> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "UPDATE sales SET synced = 1, updated_at = ? WHERE id IN ({})",
        placeholders
    );

    let mut query = sqlx::query(&sql).bind(Utc::now());
    for id in ids {
        query = query.bind(id);
    }

    Ok(query.execute(pool).await?.rows_affected())
}

fn enqueue_sale(queue: &dyn SyncQueue, sale: &Sale) {
    queue.enqueue(SyncQueueItem::new(
        sale.id.clone(),
        SyncKind::Sale,
        json!({
            "sale_id": sale.id,
            "client_sale_id": sale.client_sale_id,
        }),
    ));
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> Result<Vec<SaleItem>, AppError> {
    let items: Vec<SaleItem> =
        sqlx::query_as("SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY rowid")
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;
    Ok(items)
}

async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO sales (
            id, sale_number, seller_id, status, subtotal, discount, tax, total,
            payment_method, customer_name, customer_phone, notes, synced,
            client_sale_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"#,
    )
    .bind(&sale.id)
    .bind(&sale.sale_number)
    .bind(&sale.seller_id)
    .bind(sale.status)
    .bind(sale.subtotal)
    .bind(sale.discount)
    .bind(sale.tax)
    .bind(sale.total)
    .bind(sale.payment_method)
    .bind(&sale.customer_name)
    .bind(&sale.customer_phone)
    .bind(&sale.notes)
    .bind(sale.synced)
    .bind(&sale.client_sale_id)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_sale_item(conn: &mut SqliteConnection, item: &SaleItem) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO sale_items (
            id, sale_id, product_id, product_name, product_sku,
            quantity, unit_price, discount, subtotal
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.product_name)
    .bind(&item.product_sku)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.discount)
    .bind(item.subtotal)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
