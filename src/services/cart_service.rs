use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    entity::{
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        product_stocks::{Column as StockCol, Entity as ProductStocks},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    size: String,
    quantity: i32,
    product_id: Uuid,
    store_id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    price: i64,
    discount_price: Option<i64>,
    discount_start: Option<DateTime<Utc>>,
    discount_end: Option<DateTime<Utc>>,
    image_url: Option<String>,
    total_sales: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.size, ci.quantity,
               p.id AS product_id, p.store_id, p.name, p.description, p.category,
               p.price, p.discount_price, p.discount_start, p.discount_end,
               p.image_url, p.total_sales, p.created_at, p.updated_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(&state.pool)
        .await?;

    let now = Utc::now();
    let items = rows
        .into_iter()
        .map(|row| {
            let list_price = row.price;
            let effective = match (row.discount_price, row.discount_start, row.discount_end) {
                (Some(discounted), Some(start), Some(end)) if now >= start && now <= end => {
                    discounted
                }
                _ => list_price,
            };
            let (discount_price, discount_rate) = if effective < list_price {
                let rate = ((list_price - effective) as f64 / list_price as f64 * 100.0).round()
                    as i64;
                (Some(effective), Some(rate))
            } else {
                (None, None)
            };
            CartItemDto {
                id: row.cart_id,
                product: Product {
                    id: row.product_id,
                    store_id: row.store_id,
                    name: row.name,
                    description: row.description,
                    category: row.category,
                    price: row.price,
                    discount_price,
                    discount_rate,
                    image_url: row.image_url,
                    total_sales: row.total_sales,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                },
                size: row.size,
                quantity: row.quantity,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

/// Upsert on (user, product, size): an existing row gains the quantity,
/// otherwise a new row is inserted.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<crate::dto::cart::CartItemDto>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    // The product must carry the requested size at all.
    let stock = ProductStocks::find()
        .filter(
            Condition::all()
                .add(StockCol::ProductId.eq(payload.product_id))
                .add(StockCol::Size.eq(payload.size.clone())),
        )
        .one(&state.orm)
        .await?;
    if stock.is_none() {
        return Err(AppError::BadRequest("product or size not found".to_string()));
    }

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(user.user_id))
                .add(CartCol::ProductId.eq(payload.product_id))
                .add(CartCol::Size.eq(payload.size.clone())),
        )
        .one(&state.orm)
        .await?;

    let cart_item = match existing {
        Some(item) => {
            let quantity = item.quantity + payload.quantity;
            let mut active: CartActive = item.into();
            active.quantity = Set(quantity);
            active.update(&state.orm).await?
        }
        None => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                size: Set(payload.size),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    let dto = cart_item_dto(state, cart_item).await?;
    Ok(ApiResponse::success("OK", dto, None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<crate::dto::cart::CartItemDto>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let item = CartItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if item.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    let updated = active.update(&state.orm).await?;

    let dto = cart_item_dto(state, updated).await?;
    Ok(ApiResponse::success("OK", dto, None))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let item = CartItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if item.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    CartItems::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn cart_item_dto(
    state: &AppState,
    item: crate::entity::cart_items::Model,
) -> AppResult<CartItemDto> {
    use crate::entity::products::Entity as Products;

    let product = Products::find_by_id(item.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let now = Utc::now();
    Ok(CartItemDto {
        id: item.id,
        product: crate::services::product_service::product_from_entity(product, now),
        size: item.size,
        quantity: item.quantity,
    })
}
