use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
    entity::{
        order_items::Entity as OrderItems,
        orders::Entity as Orders,
        reviews::{
            ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews,
            Model as ReviewModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }

    let order_item = OrderItems::find_by_id(payload.order_item_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = Orders::find_by_id(order_item.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    // Shipping and delivered orders stay reviewable; only a canceled
    // purchase is off the table.
    if order.status == super::purchase_service::STATUS_CANCELED {
        return Err(AppError::BadRequest(
            "Canceled orders cannot be reviewed".into(),
        ));
    }

    let existing = Reviews::find()
        .filter(ReviewCol::OrderItemId.eq(order_item.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict(
            "This order item has already been reviewed".into(),
        ));
    }

    let review = ReviewActive {
        id: Set(Uuid::new_v4()),
        order_item_id: Set(order_item.id),
        user_id: Set(user.user_id),
        product_id: Set(order_item.product_id),
        rating: Set(payload.rating),
        content: Set(payload.content),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Review created",
        review_from_entity(review),
        None,
    ))
}

pub async fn list_product_reviews(
    state: &AppState,
    product_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .order_by_desc(ReviewCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    // Average over all reviews of the product, not just the current page.
    let ratings: Vec<i32> = Reviews::find()
        .select_only()
        .column(ReviewCol::Rating)
        .filter(ReviewCol::ProductId.eq(product_id))
        .into_tuple()
        .all(&state.orm)
        .await?;
    let average_rating = if ratings.is_empty() {
        0.0
    } else {
        ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64
    };

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(review_from_entity)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "OK",
        ReviewList {
            items,
            average_rating,
        },
        Some(meta),
    ))
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let review = owned_review(state, user, id).await?;

    let mut active: ReviewActive = review.into();
    if let Some(rating) = payload.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
        }
        active.rating = Set(rating);
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Review updated",
        review_from_entity(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    owned_review(state, user, id).await?;

    Reviews::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Review deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn owned_review(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ReviewModel> {
    let review = Reviews::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if review.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(review)
}

pub fn review_from_entity(model: ReviewModel) -> Review {
    Review {
        id: model.id,
        order_item_id: model.order_item_id,
        user_id: model.user_id,
        product_id: model.product_id,
        rating: model.rating,
        content: model.content,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}
