use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt, stream};
use uuid::Uuid;

use crate::{
    dto::notifications::NotificationList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Notification,
    response::ApiResponse,
    routes::params::NotificationQuery,
    services::notification_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(list_notifications))
        .route("/sse", axum::routing::get(notification_stream))
        .route("/{id}/read", axum::routing::patch(mark_as_read))
}

#[utoipa::path(
    get,
    path = "/notifications",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("filter" = Option<String>, Query, description = "all | unread | read"),
        ("sort" = Option<String>, Query, description = "recent | old"),
    ),
    responses(
        (status = 200, description = "The caller's notifications", body = ApiResponse<NotificationList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    Ok(Json(notification_service::list_notifications(&state, &user, query).await?))
}

#[utoipa::path(
    patch,
    path = "/notifications/{id}/read",
    params(("id" = Uuid, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read", body = ApiResponse<Notification>),
        (status = 404, description = "Notification not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_as_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    Ok(Json(notification_service::mark_as_read(&state, &user, id).await?))
}

/// Long-lived per-user event stream. The registry entry is removed when the
/// client disconnects and the stream is dropped.
#[utoipa::path(
    get,
    path = "/notifications/sse",
    responses(
        (status = 200, description = "text/event-stream of notification payloads"),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn notification_stream(
    State(state): State<AppState>,
    user: AuthUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (rx, guard) = state.sse.subscribe(user.user_id);

    let hello = Event::default().event("connected").data("{}");
    let events = stream::once(async move { Ok(hello) }).chain(stream::unfold(
        (rx, guard),
        |(mut rx, guard)| async move {
            let event = rx.recv().await?;
            Some((Ok(event), (rx, guard)))
        },
    ));

    Sse::new(events).keep_alive(KeepAlive::default())
}
