use axum::{Json, Router, extract::State};

use crate::{
    dto::auth::UserSummary,
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/me", axum::routing::get(me))
}

#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user with point summary", body = ApiResponse<UserSummary>),
        (status = 401, description = "Not authenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserSummary>>> {
    Ok(Json(auth_service::get_me(&state, &user).await?))
}
