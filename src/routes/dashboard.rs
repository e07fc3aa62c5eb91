use axum::{
    Json, Router,
    extract::{Query, State},
};

use crate::{
    dto::dashboard::{DashboardQuery, PriceRangeRevenue, SalesSummary, TopProduct},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", axum::routing::get(sales_summary))
        .route("/top-products", axum::routing::get(top_products))
        .route("/price-ranges", axum::routing::get(sales_by_price_range))
}

#[utoipa::path(
    get,
    path = "/dashboard/summary",
    params(
        ("start_date" = Option<String>, Query, description = "Window start (YYYY-MM-DD), default 30 days back"),
        ("end_date" = Option<String>, Query, description = "Window end (YYYY-MM-DD), default today"),
    ),
    responses(
        (status = 200, description = "Sales totals with period-over-period change", body = ApiResponse<SalesSummary>),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn sales_summary(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<ApiResponse<SalesSummary>>> {
    Ok(Json(dashboard_service::sales_summary(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/dashboard/top-products",
    params(
        ("start_date" = Option<String>, Query, description = "Window start (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Window end (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Top five products by units sold", body = ApiResponse<Vec<TopProduct>>),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn top_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<ApiResponse<Vec<TopProduct>>>> {
    Ok(Json(dashboard_service::top_products(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/dashboard/price-ranges",
    params(
        ("start_date" = Option<String>, Query, description = "Window start (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Window end (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Revenue split across fixed price buckets", body = ApiResponse<Vec<PriceRangeRevenue>>),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn sales_by_price_range(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<ApiResponse<Vec<PriceRangeRevenue>>>> {
    Ok(Json(dashboard_service::sales_by_price_range(&state, &user, query).await?))
}
