use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Product, StockItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct StockInput {
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub discount_start: Option<chrono::DateTime<chrono::Utc>>,
    pub discount_end: Option<chrono::DateTime<chrono::Utc>>,
    pub image_url: Option<String>,
    pub stocks: Vec<StockInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<i64>,
    pub discount_price: Option<i64>,
    pub discount_start: Option<chrono::DateTime<chrono::Utc>>,
    pub discount_end: Option<chrono::DateTime<chrono::Utc>>,
    pub image_url: Option<String>,
    /// When present, replaces the whole per-size stock set.
    pub stocks: Option<Vec<StockInput>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub store_name: String,
    pub stocks: Vec<StockItem>,
}
