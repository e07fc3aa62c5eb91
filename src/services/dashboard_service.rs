use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::dashboard::{DashboardQuery, PriceRangeRevenue, SalesSummary, TopProduct},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    response::ApiResponse,
    state::AppState,
};

const DEFAULT_WINDOW_DAYS: i64 = 30;

struct PriceRange {
    label: &'static str,
    min: i64,
    max: Option<i64>,
}

const PRICE_RANGES: [PriceRange; 5] = [
    PriceRange { label: "~ 10,000", min: 0, max: Some(10_000) },
    PriceRange { label: "10,000 ~ 30,000", min: 10_001, max: Some(30_000) },
    PriceRange { label: "30,000 ~ 50,000", min: 30_001, max: Some(50_000) },
    PriceRange { label: "50,000 ~ 100,000", min: 50_001, max: Some(100_000) },
    PriceRange { label: "100,000 ~", min: 100_001, max: None },
];

fn bucket_index(unit_price: i64) -> usize {
    PRICE_RANGES
        .iter()
        .position(|r| unit_price >= r.min && r.max.is_none_or(|max| unit_price <= max))
        .unwrap_or(0)
}

/// Resolve the query window, defaulting to the trailing 30 days. Both bounds
/// are inclusive dates; the returned end is exclusive.
fn resolve_window(query: &DashboardQuery) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = Utc::now().date_naive();
    let end_date = query.end_date.unwrap_or(today);
    let start_date = query
        .start_date
        .unwrap_or(end_date - Duration::days(DEFAULT_WINDOW_DAYS));
    (day_start(start_date), day_start(end_date) + Duration::days(1))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn change_percent(current: i64, previous: i64) -> Option<f64> {
    if previous == 0 {
        return None;
    }
    let raw = (current - previous) as f64 / previous as f64 * 100.0;
    Some((raw * 100.0).round() / 100.0)
}

pub async fn sales_summary(
    state: &AppState,
    user: &AuthUser,
    query: DashboardQuery,
) -> AppResult<ApiResponse<SalesSummary>> {
    ensure_seller(user)?;
    let store_id = store_of_seller(state, user.user_id).await?;
    let (start, end) = resolve_window(&query);

    let (sales_count, total_revenue) = window_totals(state, store_id, start, end).await?;

    // Immediately preceding window of equal length for the trend figures.
    let span = end - start;
    let (prev_count, prev_revenue) = window_totals(state, store_id, start - span, start).await?;

    let summary = SalesSummary {
        sales_count,
        total_revenue,
        sales_count_change: change_percent(sales_count, prev_count),
        revenue_change: change_percent(total_revenue, prev_revenue),
    };
    Ok(ApiResponse::success("OK", summary, None))
}

async fn window_totals(
    state: &AppState,
    store_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<(i64, i64)> {
    let row: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT o.id), COALESCE(SUM(oi.price * oi.quantity), 0)::BIGINT
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN products p ON p.id = oi.product_id
        WHERE p.store_id = $1
          AND o.status = 'paid'
          AND o.payment_date >= $2
          AND o.payment_date < $3
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_one(&state.pool)
    .await?;
    Ok(row)
}

#[derive(FromRow)]
struct TopProductRow {
    product_id: Uuid,
    name: String,
    price: i64,
    image_url: Option<String>,
    units_sold: i64,
}

pub async fn top_products(
    state: &AppState,
    user: &AuthUser,
    query: DashboardQuery,
) -> AppResult<ApiResponse<Vec<TopProduct>>> {
    ensure_seller(user)?;
    let store_id = store_of_seller(state, user.user_id).await?;
    let (start, end) = resolve_window(&query);

    let rows = sqlx::query_as::<_, TopProductRow>(
        r#"
        SELECT p.id AS product_id, p.name, p.price, p.image_url,
               COALESCE(SUM(oi.quantity), 0)::BIGINT AS units_sold
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN products p ON p.id = oi.product_id
        WHERE p.store_id = $1
          AND o.status = 'paid'
          AND o.payment_date >= $2
          AND o.payment_date < $3
        GROUP BY p.id, p.name, p.price, p.image_url
        ORDER BY units_sold DESC
        LIMIT 5
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    let items = rows
        .into_iter()
        .map(|row| TopProduct {
            product_id: row.product_id,
            name: row.name,
            price: row.price,
            image_url: row.image_url,
            units_sold: row.units_sold,
        })
        .collect();

    Ok(ApiResponse::success("OK", items, None))
}

#[derive(FromRow)]
struct SoldItemRow {
    price: i64,
    quantity: i32,
}

pub async fn sales_by_price_range(
    state: &AppState,
    user: &AuthUser,
    query: DashboardQuery,
) -> AppResult<ApiResponse<Vec<PriceRangeRevenue>>> {
    ensure_seller(user)?;
    let store_id = store_of_seller(state, user.user_id).await?;
    let (start, end) = resolve_window(&query);

    let rows = sqlx::query_as::<_, SoldItemRow>(
        r#"
        SELECT oi.price, oi.quantity
        FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        JOIN products p ON p.id = oi.product_id
        WHERE p.store_id = $1
          AND o.status = 'paid'
          AND o.payment_date >= $2
          AND o.payment_date < $3
        "#,
    )
    .bind(store_id)
    .bind(start)
    .bind(end)
    .fetch_all(&state.pool)
    .await?;

    let result = bucket_revenues(&rows.iter().map(|r| (r.price, r.quantity)).collect::<Vec<_>>());
    Ok(ApiResponse::success("OK", result, None))
}

/// Fold (unit price, quantity) pairs into the fixed price buckets.
fn bucket_revenues(items: &[(i64, i32)]) -> Vec<PriceRangeRevenue> {
    let mut revenues = [0i64; PRICE_RANGES.len()];
    let mut total: i64 = 0;

    for (price, quantity) in items {
        let revenue = price * *quantity as i64;
        revenues[bucket_index(*price)] += revenue;
        total += revenue;
    }

    PRICE_RANGES
        .iter()
        .zip(revenues)
        .map(|(range, revenue)| {
            let percentage = if total == 0 {
                0.0
            } else {
                (revenue as f64 / total as f64 * 10_000.0).round() / 100.0
            };
            PriceRangeRevenue {
                range: range.label.to_string(),
                revenue,
                percentage,
            }
        })
        .collect()
}

async fn store_of_seller(state: &AppState, seller_id: Uuid) -> AppResult<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM stores WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_optional(&state.pool)
        .await?;
    row.map(|(id,)| id).ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_boundaries() {
        assert_eq!(bucket_index(0), 0);
        assert_eq!(bucket_index(10_000), 0);
        assert_eq!(bucket_index(10_001), 1);
        assert_eq!(bucket_index(30_000), 1);
        assert_eq!(bucket_index(50_000), 2);
        assert_eq!(bucket_index(100_000), 3);
        assert_eq!(bucket_index(100_001), 4);
        assert_eq!(bucket_index(5_000_000), 4);
    }

    #[test]
    fn percentages_sum_to_about_one_hundred() {
        let items = vec![(5_000, 2), (20_000, 1), (120_000, 1)];
        let result = bucket_revenues(&items);
        let sum: f64 = result.iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 0.1, "sum was {sum}");
        assert_eq!(result[0].revenue, 10_000);
        assert_eq!(result[1].revenue, 20_000);
        assert_eq!(result[4].revenue, 120_000);
    }

    #[test]
    fn empty_window_yields_zeroed_buckets() {
        let result = bucket_revenues(&[]);
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|r| r.revenue == 0 && r.percentage == 0.0));
    }

    #[test]
    fn change_percent_is_none_without_a_baseline() {
        assert_eq!(change_percent(10, 0), None);
        assert_eq!(change_percent(150, 100), Some(50.0));
        assert_eq!(change_percent(50, 100), Some(-50.0));
        assert_eq!(change_percent(100, 300), Some(-66.67));
    }
}
