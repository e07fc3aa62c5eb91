use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    dto::{
        inquiries::{CreateInquiryRequest, InquiryList},
        products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
        reviews::ReviewList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Inquiry, Product},
    response::ApiResponse,
    routes::params::{InquiryQuery, Pagination, ProductQuery},
    services::{inquiry_service, product_service, review_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(list_products))
        .route("/", axum::routing::post(create_product))
        .route("/{id}", axum::routing::get(get_product))
        .route("/{id}", axum::routing::patch(update_product))
        .route("/{id}", axum::routing::delete(delete_product))
        .route("/{id}/reviews", axum::routing::get(list_product_reviews))
        .route("/{id}/inquiries", axum::routing::get(list_product_inquiries))
        .route("/{id}/inquiries", axum::routing::post(create_inquiry))
}

#[utoipa::path(
    get,
    path = "/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Name search"),
        ("category" = Option<String>, Query, description = "Category filter"),
        ("store_id" = Option<Uuid>, Query, description = "Store filter"),
        ("min_price" = Option<i64>, Query, description = "Lower price bound"),
        ("max_price" = Option<i64>, Query, description = "Upper price bound"),
        ("sort_by" = Option<String>, Query, description = "created_at | price | name | total_sales"),
        ("sort_order" = Option<String>, Query, description = "asc | desc"),
    ),
    responses(
        (status = 200, description = "Product catalog page", body = ApiResponse<ProductList>),
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(product_service::list_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with stock per size", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    Ok(Json(product_service::get_product(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = ApiResponse<Product>),
        (status = 403, description = "Caller is not a seller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::create_product(&state, &user, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<Product>),
        (status = 403, description = "Product belongs to another store"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(product_service::update_product(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 403, description = "Product belongs to another store"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(product_service::delete_product(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/products/{id}/reviews",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reviews with average rating", body = ApiResponse<ReviewList>),
    ),
    tag = "Reviews"
)]
pub async fn list_product_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    Ok(Json(review_service::list_product_reviews(&state, id, pagination).await?))
}

#[utoipa::path(
    get,
    path = "/products/{id}/inquiries",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Inquiries, secret ones masked for strangers", body = ApiResponse<InquiryList>),
    ),
    tag = "Inquiries"
)]
pub async fn list_product_inquiries(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<InquiryQuery>,
) -> AppResult<Json<ApiResponse<InquiryList>>> {
    Ok(Json(
        inquiry_service::list_product_inquiries(&state, viewer.as_ref(), id, query).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/products/{id}/inquiries",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = CreateInquiryRequest,
    responses(
        (status = 200, description = "Inquiry created", body = ApiResponse<Inquiry>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn create_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateInquiryRequest>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    Ok(Json(inquiry_service::create_inquiry(&state, &user, id, payload).await?))
}
