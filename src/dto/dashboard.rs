use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DashboardQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummary {
    pub sales_count: i64,
    pub total_revenue: i64,
    /// Percentage change versus the preceding window of equal length.
    pub sales_count_change: Option<f64>,
    pub revenue_change: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub units_sold: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PriceRangeRevenue {
    pub range: String,
    pub revenue: i64,
    pub percentage: f64,
}
