use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    dto::purchase::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::Pagination,
    services::purchase_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_order))
        .route("/", axum::routing::get(list_purchases))
        .route("/{id}", axum::routing::get(get_purchase))
        .route("/{id}", axum::routing::patch(update_purchase))
        .route("/{id}/cancel", axum::routing::post(cancel_purchase))
}

#[utoipa::path(
    post,
    path = "/api/purchase",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed, stock and points settled", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Point redemption exceeds balance or subtotal"),
        (status = 409, description = "A line is out of stock"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(purchase_service::create_order(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/api/purchase",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "The caller's orders, newest first", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase"
)]
pub async fn list_purchases(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(purchase_service::list_purchases(&state, &user, pagination).await?))
}

#[utoipa::path(
    get,
    path = "/api/purchase/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with line items", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase"
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(purchase_service::get_purchase(&state, &user, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/purchase/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Recipient details updated", body = ApiResponse<Order>),
        (status = 409, description = "Order is no longer editable"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase"
)]
pub async fn update_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(purchase_service::update_purchase(&state, &user, id, payload).await?))
}

#[utoipa::path(
    post,
    path = "/api/purchase/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order canceled, stock and points restored", body = ApiResponse<Order>),
        (status = 409, description = "Order already canceled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Purchase"
)]
pub async fn cancel_purchase(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(purchase_service::cancel_purchase(&state, &user, id).await?))
}
