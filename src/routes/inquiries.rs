use axum::{
    Json, Router,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::{
    dto::inquiries::{InquiryList, ReplyRequest, UpdateInquiryRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Inquiry,
    response::ApiResponse,
    routes::params::InquiryQuery,
    services::inquiry_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(list_my_inquiries))
        .route("/{id}", axum::routing::get(get_inquiry))
        .route("/{id}", axum::routing::patch(update_inquiry))
        .route("/{id}", axum::routing::delete(delete_inquiry))
        .route("/{id}/replies", axum::routing::post(create_reply))
        .route("/{id}/replies", axum::routing::patch(update_reply))
}

#[utoipa::path(
    get,
    path = "/inquiries",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "waiting | answered"),
    ),
    responses(
        (status = 200, description = "Buyer: own inquiries; seller: inquiries on the store's products", body = ApiResponse<InquiryList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn list_my_inquiries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<InquiryQuery>,
) -> AppResult<Json<ApiResponse<InquiryList>>> {
    Ok(Json(inquiry_service::list_my_inquiries(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/inquiries/{id}",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry with reply", body = ApiResponse<Inquiry>),
        (status = 403, description = "Secret inquiry and the viewer is neither author nor seller"),
    ),
    tag = "Inquiries"
)]
pub async fn get_inquiry(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    Ok(Json(inquiry_service::get_inquiry(&state, viewer.as_ref(), id).await?))
}

#[utoipa::path(
    patch,
    path = "/inquiries/{id}",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    request_body = UpdateInquiryRequest,
    responses(
        (status = 200, description = "Inquiry updated", body = ApiResponse<Inquiry>),
        (status = 409, description = "Inquiry already answered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn update_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInquiryRequest>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    Ok(Json(inquiry_service::update_inquiry(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/inquiries/{id}",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    responses(
        (status = 200, description = "Inquiry deleted"),
        (status = 409, description = "Inquiry already answered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn delete_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    Ok(Json(inquiry_service::delete_inquiry(&state, &user, id).await?))
}

#[utoipa::path(
    post,
    path = "/inquiries/{id}/replies",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Reply posted, inquiry answered, author notified", body = ApiResponse<Inquiry>),
        (status = 403, description = "Caller does not sell this product"),
        (status = 409, description = "Inquiry already has a reply"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn create_reply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplyRequest>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    Ok(Json(inquiry_service::create_reply(&state, &user, id, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/inquiries/{id}/replies",
    params(("id" = Uuid, Path, description = "Inquiry ID")),
    request_body = ReplyRequest,
    responses(
        (status = 200, description = "Reply updated", body = ApiResponse<Inquiry>),
        (status = 404, description = "No reply yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn update_reply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplyRequest>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    Ok(Json(inquiry_service::update_reply(&state, &user, id, payload).await?))
}
