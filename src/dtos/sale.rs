use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::sale::{PaymentMethod, Sale, SaleItem, SaleStatus};

#[derive(Deserialize)]
pub struct CreateSaleRequest {
    pub items: Vec<SaleItemRequest>,
    pub payment_method: Option<PaymentMethod>,
    pub discount: Option<f64>,
    pub tax: Option<f64>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    /// Client-generated id used to reconcile offline-created sales.
    pub client_sale_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SaleItemRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub discount: Option<f64>,
}

#[derive(Serialize)]
pub struct SaleResponse {
    pub id: String,
    pub sale_number: String,
    pub seller_id: String,
    pub status: SaleStatus,
    pub subtotal: f64,
    pub discount: f64,
    pub tax: f64,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub notes: Option<String>,
    pub synced: bool,
    pub client_sale_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<SaleItem>,
}

impl SaleResponse {
    pub fn from_parts(sale: Sale, items: Vec<SaleItem>) -> Self {
        SaleResponse {
            id: sale.id,
            sale_number: sale.sale_number,
            seller_id: sale.seller_id,
            status: sale.status,
            subtotal: sale.subtotal,
            discount: sale.discount,
            tax: sale.tax,
            total: sale.total,
            payment_method: sale.payment_method,
            customer_name: sale.customer_name,
            customer_phone: sale.customer_phone,
            notes: sale.notes,
            synced: sale.synced,
            client_sale_id: sale.client_sale_id,
            created_at: sale.created_at,
            updated_at: sale.updated_at,
            items,
        }
    }
}

#[derive(Serialize, FromRow)]
pub struct SaleListItem {
    pub id: String,
    pub sale_number: String,
    pub seller_id: String,
    pub status: SaleStatus,
    pub total: f64,
    pub payment_method: PaymentMethod,
    pub synced: bool,
    pub total_items: i64,
    pub created_at: DateTime<Utc>,
}
