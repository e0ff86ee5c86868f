use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub price: f64,
    pub cost_price: Option<f64>,
    pub quantity: Option<i64>,
    pub min_stock: Option<i64>,
    pub category: Option<String>,
}
