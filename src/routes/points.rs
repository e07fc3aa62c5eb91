use axum::{Json, Router, extract::State};

use crate::{
    dto::points::PointSummary,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::point_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/me", axum::routing::get(get_my_point_info))
}

#[utoipa::path(
    get,
    path = "/points/me",
    responses(
        (status = 200, description = "Point balance and grade progress", body = ApiResponse<PointSummary>),
    ),
    security(("bearer_auth" = [])),
    tag = "Points"
)]
pub async fn get_my_point_info(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PointSummary>>> {
    Ok(Json(point_service::get_my_point_info(&state, &user).await?))
}
