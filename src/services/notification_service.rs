use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::notifications::{NotificationFilter, NotificationList, NotificationSort},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        notifications::{
            ActiveModel as NotificationActive, Column as NotifCol, Entity as Notifications,
            Model as NotificationModel,
        },
        products::Entity as Products,
        stores::Entity as Stores,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::NotificationQuery,
    sse::SseRegistry,
    state::AppState,
};

pub const KIND_ORDER_COMPLETED: &str = "ORDER_COMPLETED";
pub const KIND_SOLD_OUT: &str = "SOLD_OUT";
pub const KIND_INQUIRY_REPLY: &str = "INQUIRY_REPLY";

/// Persist a notification and push it to any open SSE connections of the
/// recipient. The push is best effort; delivery failures are only logged.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    sse: &SseRegistry,
    user_id: Uuid,
    kind: &str,
    message: String,
) -> AppResult<NotificationModel> {
    let notification = NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        message: Set(message),
        kind: Set(kind.to_string()),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    let payload = serde_json::json!(notification_from_entity(notification.clone()));
    sse.publish(user_id, &payload);

    Ok(notification)
}

/// A stock row just hit zero: tell the seller and every other user who still
/// has that product/size sitting in a cart.
pub async fn notify_sold_out<C: ConnectionTrait>(
    conn: &C,
    sse: &SseRegistry,
    product_id: Uuid,
    size: &str,
    exclude_user: Uuid,
) -> AppResult<()> {
    let Some(product) = Products::find_by_id(product_id).one(conn).await? else {
        return Err(AppError::NotFound);
    };
    let Some(store) = Stores::find_by_id(product.store_id).one(conn).await? else {
        return Err(AppError::NotFound);
    };

    let message = format!("Product [{}] (size {}) is sold out.", product.name, size);
    notify(conn, sse, store.seller_id, KIND_SOLD_OUT, message.clone()).await?;

    let holders: Vec<Uuid> = CartItems::find()
        .select_only()
        .column(CartCol::UserId)
        .filter(
            Condition::all()
                .add(CartCol::ProductId.eq(product_id))
                .add(CartCol::Size.eq(size))
                .add(CartCol::UserId.ne(exclude_user)),
        )
        .into_tuple()
        .all(conn)
        .await?;

    for user_id in holders {
        notify(conn, sse, user_id, KIND_SOLD_OUT, message.clone()).await?;
    }

    Ok(())
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    query: NotificationQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all().add(NotifCol::UserId.eq(user.user_id));
    match query.filter {
        Some(NotificationFilter::Read) => condition = condition.add(NotifCol::IsRead.eq(true)),
        Some(NotificationFilter::Unread) => condition = condition.add(NotifCol::IsRead.eq(false)),
        Some(NotificationFilter::All) | None => {}
    }

    let mut finder = Notifications::find().filter(condition);
    finder = match query.sort.unwrap_or(NotificationSort::Recent) {
        NotificationSort::Recent => finder.order_by_desc(NotifCol::CreatedAt),
        NotificationSort::Old => finder.order_by_asc(NotifCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(notification_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "OK",
        NotificationList { items },
        Some(meta),
    ))
}

pub async fn mark_as_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if notification.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let mut active: NotificationActive = notification.into();
    active.is_read = Set(true);
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Notification read",
        notification_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub fn notification_from_entity(model: NotificationModel) -> Notification {
    Notification {
        id: model.id,
        user_id: model.user_id,
        content: model.message,
        kind: model.kind,
        is_checked: model.is_read,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
