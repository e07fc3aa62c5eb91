use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    entity::{
        product_stocks::{ActiveModel as StockActive, Column as StockCol, Entity as ProductStocks},
        products::{
            ActiveModel as ProductActive, Column as ProductCol, Entity as Products,
            Model as ProductModel,
        },
        stores::{Column as StoreCol, Entity as Stores},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_seller},
    models::{Product, StockItem},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

/// Unit price with the discount applied while its window is open.
pub fn effective_price(product: &ProductModel, now: DateTime<Utc>) -> i64 {
    match (
        product.discount_price,
        product.discount_start,
        product.discount_end,
    ) {
        (Some(discounted), Some(start), Some(end))
            if now >= start.with_timezone(&Utc) && now <= end.with_timezone(&Utc) =>
        {
            discounted
        }
        _ => product.price,
    }
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProductCol::Name).ilike(pattern.clone()))
                .add(Expr::col(ProductCol::Description).ilike(pattern)),
        );
    }

    if let Some(category) = query.category.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(ProductCol::Category.eq(category.clone()));
    }
    if let Some(store_id) = query.store_id {
        condition = condition.add(ProductCol::StoreId.eq(store_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(ProductCol::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(ProductCol::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => ProductCol::CreatedAt,
        ProductSortBy::Price => ProductCol::Price,
        ProductSortBy::Name => ProductCol::Name,
        ProductSortBy::TotalSales => ProductCol::TotalSales,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let now = Utc::now();
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| product_from_entity(p, now))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let store = Stores::find_by_id(product.store_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let stocks = ProductStocks::find()
        .filter(StockCol::ProductId.eq(id))
        .order_by_asc(StockCol::Size)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|s| StockItem {
            id: s.id,
            size: s.size,
            quantity: s.quantity,
        })
        .collect();

    let detail = ProductDetail {
        product: product_from_entity(product, Utc::now()),
        store_name: store.name,
        stocks,
    };
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_seller(user)?;

    let store = Stores::find()
        .filter(StoreCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Create a store first".into()))?;

    if payload.price <= 0 {
        return Err(AppError::BadRequest("price must be greater than 0".into()));
    }

    let txn = state.orm.begin().await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        store_id: Set(store.id),
        name: Set(payload.name),
        description: Set(payload.description),
        category: Set(payload.category),
        price: Set(payload.price),
        discount_price: Set(payload.discount_price),
        discount_start: Set(payload.discount_start.map(Into::into)),
        discount_end: Set(payload.discount_end.map(Into::into)),
        image_url: Set(payload.image_url),
        total_sales: Set(0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for stock in payload.stocks {
        if stock.quantity < 0 {
            return Err(AppError::BadRequest("stock quantity must not be negative".into()));
        }
        StockActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            size: Set(stock.size),
            quantity: Set(stock.quantity),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product, Utc::now()),
        None,
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let product = owned_product(state, user, id).await?;

    let txn = state.orm.begin().await?;

    let mut active: ProductActive = product.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(price) = payload.price {
        if price <= 0 {
            return Err(AppError::BadRequest("price must be greater than 0".into()));
        }
        active.price = Set(price);
    }
    if payload.discount_price.is_some() {
        active.discount_price = Set(payload.discount_price);
    }
    if payload.discount_start.is_some() {
        active.discount_start = Set(payload.discount_start.map(Into::into));
    }
    if payload.discount_end.is_some() {
        active.discount_end = Set(payload.discount_end.map(Into::into));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    if let Some(stocks) = payload.stocks {
        ProductStocks::delete_many()
            .filter(StockCol::ProductId.eq(id))
            .exec(&txn)
            .await?;
        for stock in stocks {
            if stock.quantity < 0 {
                return Err(AppError::BadRequest("stock quantity must not be negative".into()));
            }
            StockActive {
                id: Set(Uuid::new_v4()),
                product_id: Set(id),
                size: Set(stock.size),
                quantity: Set(stock.quantity),
            }
            .insert(&txn)
            .await?;
        }
    }

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Product updated",
        product_from_entity(updated, Utc::now()),
        None,
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    owned_product(state, user, id).await?;

    Products::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Resolve the product and check it belongs to the seller's store.
async fn owned_product(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ProductModel> {
    ensure_seller(user)?;

    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let store = Stores::find_by_id(product.store_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if store.seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    Ok(product)
}

pub fn product_from_entity(model: ProductModel, now: DateTime<Utc>) -> Product {
    let effective = effective_price(&model, now);
    let (discount_price, discount_rate) = if effective < model.price {
        let rate = ((model.price - effective) as f64 / model.price as f64 * 100.0).round() as i64;
        (Some(effective), Some(rate))
    } else {
        (None, None)
    };

    Product {
        id: model.id,
        store_id: model.store_id,
        name: model.name,
        description: model.description,
        category: model.category,
        price: model.price,
        discount_price,
        discount_rate,
        image_url: model.image_url,
        total_sales: model.total_sales,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_product(price: i64) -> ProductModel {
        let now = Utc::now();
        ProductModel {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            name: "Tee".into(),
            description: None,
            category: "tops".into(),
            price,
            discount_price: None,
            discount_start: None,
            discount_end: None,
            image_url: None,
            total_sales: 0,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn price_without_discount_window_is_the_list_price() {
        let product = sample_product(10_000);
        assert_eq!(effective_price(&product, Utc::now()), 10_000);
    }

    #[test]
    fn discount_applies_only_inside_the_window() {
        let now = Utc::now();
        let mut product = sample_product(10_000);
        product.discount_price = Some(8_000);
        product.discount_start = Some((now - Duration::hours(1)).into());
        product.discount_end = Some((now + Duration::hours(1)).into());
        assert_eq!(effective_price(&product, now), 8_000);

        // Expired window falls back to the list price.
        assert_eq!(
            effective_price(&product, now + Duration::hours(2)),
            10_000
        );
    }

    #[test]
    fn discount_rate_is_rounded_percent() {
        let now = Utc::now();
        let mut product = sample_product(10_000);
        product.discount_price = Some(7_500);
        product.discount_start = Some((now - Duration::hours(1)).into());
        product.discount_end = Some((now + Duration::hours(1)).into());
        let dto = product_from_entity(product, now);
        assert_eq!(dto.discount_price, Some(7_500));
        assert_eq!(dto.discount_rate, Some(25));
    }
}
