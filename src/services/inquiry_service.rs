use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::inquiries::{
        CreateInquiryRequest, InquiryList, ReplyRequest, UpdateInquiryRequest,
    },
    entity::{
        inquiries::{
            ActiveModel as InquiryActive, Column as InquiryCol, Entity as Inquiries,
            Model as InquiryModel,
        },
        inquiry_replies::{
            ActiveModel as ReplyActive, Column as ReplyCol, Entity as InquiryReplies,
            Model as ReplyModel,
        },
        products::{Column as ProductCol, Entity as Products},
        stores::{Column as StoreCol, Entity as Stores},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::{Inquiry, InquiryReply},
    response::{ApiResponse, Meta},
    routes::params::InquiryQuery,
    services::notification_service,
    state::AppState,
};

pub const STATUS_WAITING: &str = "waiting";
pub const STATUS_ANSWERED: &str = "answered";

pub async fn create_inquiry(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: CreateInquiryRequest,
) -> AppResult<ApiResponse<Inquiry>> {
    let product = Products::find_by_id(product_id).one(&state.orm).await?;
    if product.is_none() {
        return Err(AppError::NotFound);
    }

    let inquiry = InquiryActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        title: Set(payload.title),
        content: Set(payload.content),
        is_secret: Set(payload.is_secret),
        status: Set(STATUS_WAITING.into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Inquiry created",
        inquiry_from_entity(inquiry, None, false),
        None,
    ))
}

/// Public per-product listing; secret rows are masked unless the viewer is
/// the author or the product's seller.
pub async fn list_product_inquiries(
    state: &AppState,
    viewer: Option<&AuthUser>,
    product_id: Uuid,
    query: InquiryQuery,
) -> AppResult<ApiResponse<InquiryList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let seller_id = seller_of_product(state, product_id).await?;

    let finder = Inquiries::find()
        .filter(InquiryCol::ProductId.eq(product_id))
        .order_by_desc(InquiryCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let inquiries = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = attach_replies(state, inquiries, |inquiry| {
        let visible = match viewer {
            Some(v) => !inquiry.is_secret || v.user_id == inquiry.user_id || v.user_id == seller_id,
            None => !inquiry.is_secret,
        };
        !visible
    })
    .await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", InquiryList { items }, Some(meta)))
}

/// Buyers see their own inquiries; sellers see inquiries on their store's
/// products.
pub async fn list_my_inquiries(
    state: &AppState,
    user: &AuthUser,
    query: InquiryQuery,
) -> AppResult<ApiResponse<InquiryList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if user.role == "seller" {
        let store = Stores::find()
            .filter(StoreCol::SellerId.eq(user.user_id))
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        let product_ids: Vec<Uuid> = Products::find()
            .select_only()
            .column(ProductCol::Id)
            .filter(ProductCol::StoreId.eq(store.id))
            .into_tuple()
            .all(&state.orm)
            .await?;
        condition = condition.add(InquiryCol::ProductId.is_in(product_ids));
    } else {
        condition = condition.add(InquiryCol::UserId.eq(user.user_id));
    }

    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(InquiryCol::Status.eq(status.clone()));
    }

    let finder = Inquiries::find()
        .filter(condition)
        .order_by_desc(InquiryCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let inquiries = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = attach_replies(state, inquiries, |_| false).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", InquiryList { items }, Some(meta)))
}

pub async fn get_inquiry(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Inquiry>> {
    let inquiry = Inquiries::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if inquiry.is_secret {
        let seller_id = seller_of_product(state, inquiry.product_id).await?;
        let allowed = viewer
            .map(|v| v.user_id == inquiry.user_id || v.user_id == seller_id)
            .unwrap_or(false);
        if !allowed {
            return Err(AppError::Forbidden);
        }
    }

    let reply = InquiryReplies::find()
        .filter(ReplyCol::InquiryId.eq(inquiry.id))
        .one(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "OK",
        inquiry_from_entity(inquiry, reply, false),
        None,
    ))
}

pub async fn update_inquiry(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateInquiryRequest,
) -> AppResult<ApiResponse<Inquiry>> {
    let inquiry = owned_waiting_inquiry(state, user, id).await?;

    let mut active: InquiryActive = inquiry.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    if let Some(is_secret) = payload.is_secret {
        active.is_secret = Set(is_secret);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Inquiry updated",
        inquiry_from_entity(updated, None, false),
        Some(Meta::empty()),
    ))
}

pub async fn delete_inquiry(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    owned_waiting_inquiry(state, user, id).await?;

    Inquiries::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Inquiry deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Single reply per inquiry, written by the product's seller. Flips the
/// inquiry to answered and notifies its author.
pub async fn create_reply(
    state: &AppState,
    user: &AuthUser,
    inquiry_id: Uuid,
    payload: ReplyRequest,
) -> AppResult<ApiResponse<Inquiry>> {
    ensure_seller(user)?;

    let inquiry = Inquiries::find_by_id(inquiry_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let product = Products::find_by_id(inquiry.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let seller_id = seller_of_product(state, inquiry.product_id).await?;
    if seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let existing = InquiryReplies::find()
        .filter(ReplyCol::InquiryId.eq(inquiry.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "This inquiry already has a reply".into(),
        ));
    }

    let reply = ReplyActive {
        id: Set(Uuid::new_v4()),
        inquiry_id: Set(inquiry.id),
        user_id: Set(user.user_id),
        content: Set(payload.content),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let mut active: InquiryActive = inquiry.clone().into();
    active.status = Set(STATUS_ANSWERED.into());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    if let Err(err) = notification_service::notify(
        &state.orm,
        &state.sse,
        inquiry.user_id,
        notification_service::KIND_INQUIRY_REPLY,
        format!(
            "Your inquiry about [{}] has received a reply.",
            product.name
        ),
    )
    .await
    {
        tracing::warn!(error = %err, "inquiry reply notification failed");
    }

    Ok(ApiResponse::success(
        "Reply created",
        inquiry_from_entity(updated, Some(reply), false),
        None,
    ))
}

pub async fn update_reply(
    state: &AppState,
    user: &AuthUser,
    inquiry_id: Uuid,
    payload: ReplyRequest,
) -> AppResult<ApiResponse<Inquiry>> {
    let inquiry = Inquiries::find_by_id(inquiry_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let reply = InquiryReplies::find()
        .filter(ReplyCol::InquiryId.eq(inquiry.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if reply.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let mut active: ReplyActive = reply.into();
    active.content = Set(payload.content);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Reply updated",
        inquiry_from_entity(inquiry, Some(updated), false),
        Some(Meta::empty()),
    ))
}

async fn owned_waiting_inquiry(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<InquiryModel> {
    let inquiry = Inquiries::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if inquiry.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if inquiry.status != STATUS_WAITING {
        return Err(AppError::Conflict(
            "Answered inquiries can no longer be edited".into(),
        ));
    }
    Ok(inquiry)
}

async fn seller_of_product(state: &AppState, product_id: Uuid) -> AppResult<Uuid> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let store = Stores::find_by_id(product.store_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(store.seller_id)
}

async fn attach_replies<F>(
    state: &AppState,
    inquiries: Vec<InquiryModel>,
    mask: F,
) -> AppResult<Vec<Inquiry>>
where
    F: Fn(&InquiryModel) -> bool,
{
    let ids: Vec<Uuid> = inquiries.iter().map(|i| i.id).collect();
    let mut replies: std::collections::HashMap<Uuid, ReplyModel> = InquiryReplies::find()
        .filter(ReplyCol::InquiryId.is_in(ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|r| (r.inquiry_id, r))
        .collect();

    Ok(inquiries
        .into_iter()
        .map(|inquiry| {
            let masked = mask(&inquiry);
            let reply = replies.remove(&inquiry.id);
            inquiry_from_entity(inquiry, reply, masked)
        })
        .collect())
}

pub fn inquiry_from_entity(
    model: InquiryModel,
    reply: Option<ReplyModel>,
    masked: bool,
) -> Inquiry {
    let (title, content, reply) = if masked {
        ("Secret inquiry".to_string(), String::new(), None)
    } else {
        (model.title, model.content, reply.map(reply_from_entity))
    };
    Inquiry {
        id: model.id,
        user_id: model.user_id,
        product_id: model.product_id,
        title,
        content,
        is_secret: model.is_secret,
        status: model.status,
        reply,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn reply_from_entity(model: ReplyModel) -> InquiryReply {
    InquiryReply {
        id: model.id,
        inquiry_id: model.inquiry_id,
        user_id: model.user_id,
        content: model.content,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
