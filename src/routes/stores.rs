use axum::{
    Json, Router,
    extract::{Path, State},
};
use uuid::Uuid;

use crate::{
    dto::stores::{CreateStoreRequest, UpdateStoreRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Store,
    response::ApiResponse,
    services::store_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(create_store))
        .route("/me", axum::routing::get(get_my_store))
        .route("/me", axum::routing::patch(update_my_store))
        .route("/{id}", axum::routing::get(get_store))
}

#[utoipa::path(
    post,
    path = "/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 200, description = "Store created", body = ApiResponse<Store>),
        (status = 409, description = "Seller already owns a store"),
    ),
    security(("bearer_auth" = [])),
    tag = "Stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateStoreRequest>,
) -> AppResult<Json<ApiResponse<Store>>> {
    Ok(Json(store_service::create_store(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/stores/me",
    responses(
        (status = 200, description = "The caller's store", body = ApiResponse<Store>),
        (status = 404, description = "No store yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Stores"
)]
pub async fn get_my_store(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Store>>> {
    Ok(Json(store_service::get_my_store(&state, &user).await?))
}

#[utoipa::path(
    patch,
    path = "/stores/me",
    request_body = UpdateStoreRequest,
    responses(
        (status = 200, description = "Store updated", body = ApiResponse<Store>),
    ),
    security(("bearer_auth" = [])),
    tag = "Stores"
)]
pub async fn update_my_store(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateStoreRequest>,
) -> AppResult<Json<ApiResponse<Store>>> {
    Ok(Json(store_service::update_my_store(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/stores/{id}",
    params(("id" = Uuid, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store", body = ApiResponse<Store>),
        (status = 404, description = "Store not found"),
    ),
    tag = "Stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Store>>> {
    Ok(Json(store_service::get_store(&state, id).await?))
}
