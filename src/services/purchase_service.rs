use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::purchase::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        product_stocks::{
            ActiveModel as StockActive, Column as StockCol, Entity as ProductStocks,
        },
        products::{ActiveModel as ProductActive, Entity as Products},
        user_points::{ActiveModel as PointActive, Column as PointCol, Entity as UserPoints},
    },
    error::{AppError, AppResult},
    grade::{accrue_points, policy_for},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{notification_service, product_service::effective_price},
    state::AppState,
};

pub const STATUS_PAID: &str = "paid";
pub const STATUS_CANCELED: &str = "canceled";

/// Order placement: stock decrement, price snapshot, point redemption and
/// accrual, grade recalculation and cart clearing, all in one transaction.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("No items to order".into()));
    }
    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".into(),
        ));
    }
    if payload.use_points < 0 {
        return Err(AppError::BadRequest("use_points must not be negative".into()));
    }

    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let mut subtotal: i64 = 0;
    // (product id, size, quantity, unit price snapshot)
    let mut lines: Vec<(Uuid, String, i32, i64)> = Vec::with_capacity(payload.items.len());

    for item in &payload.items {
        let stock = ProductStocks::find()
            .filter(
                Condition::all()
                    .add(StockCol::ProductId.eq(item.product_id))
                    .add(StockCol::Size.eq(item.size.clone())),
            )
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        let stock = match stock {
            Some(s) if s.quantity >= item.quantity => s,
            _ => {
                return Err(AppError::Conflict(format!(
                    "Out of stock: product {} (size {})",
                    item.product_id, item.size
                )));
            }
        };

        let product = Products::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::BadRequest("product not found".into()))?;

        let unit_price = effective_price(&product, now);
        subtotal += unit_price * item.quantity as i64;

        let remaining = stock.quantity - item.quantity;
        let mut stock_active: StockActive = stock.into();
        stock_active.quantity = Set(remaining);
        stock_active.update(&txn).await?;

        if remaining == 0 {
            notification_service::notify_sold_out(
                &txn,
                &state.sse,
                item.product_id,
                &item.size,
                user.user_id,
            )
            .await?;
        }

        let mut product_active: ProductActive = product.clone().into();
        product_active.total_sales = Set(product.total_sales + item.quantity as i64);
        product_active.updated_at = Set(now.into());
        product_active.update(&txn).await?;

        lines.push((item.product_id, item.size.clone(), item.quantity, unit_price));
    }

    // Point ledger row, locked for the redemption check and the update below.
    let point_row = UserPoints::find()
        .filter(PointCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let point_row = match point_row {
        Some(p) => p,
        None => default_point_row(user.user_id).insert(&txn).await?,
    };

    if payload.use_points > point_row.points {
        return Err(AppError::BadRequest("Not enough points".into()));
    }
    if payload.use_points > subtotal {
        return Err(AppError::BadRequest(
            "Points may not exceed the order subtotal".into(),
        ));
    }

    let final_amount = subtotal - payload.use_points;

    // Accrue at the rate in effect when the order is placed and stamp the
    // amount on the order row, so cancellation can revoke exactly it no
    // matter how the grade moves afterwards.
    let earned = accrue_points(final_amount, point_row.point_rate);

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        order_number: Set(build_order_number(order_id)),
        status: Set(STATUS_PAID.into()),
        total_amount: Set(final_amount),
        used_points: Set(payload.use_points),
        earned_points: Set(earned),
        recipient_name: Set(payload.recipient_name),
        recipient_phone: Set(payload.recipient_phone),
        delivery_address: Set(payload.delivery_address),
        payment_date: Set(now.into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(lines.len());
    for (product_id, size, quantity, unit_price) in lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product_id),
            size: Set(size),
            quantity: Set(quantity),
            price: Set(unit_price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        order_items.push(order_item_from_entity(item));
    }

    // Redeem, add the accrual, then re-derive the grade from the new
    // lifetime spend.
    let new_accumulated = point_row.accumulated_amount + final_amount;
    let policy = policy_for(new_accumulated);

    let mut point_active: PointActive = point_row.clone().into();
    point_active.points = Set(point_row.points - payload.use_points + earned);
    point_active.accumulated_amount = Set(new_accumulated);
    point_active.grade = Set(policy.grade.as_str().into());
    point_active.point_rate = Set(policy.point_rate);
    point_active.updated_at = Set(now.into());
    point_active.update(&txn).await?;

    // The whole cart is cleared, not just the ordered rows.
    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = notification_service::notify(
        &state.orm,
        &state.sse,
        user.user_id,
        notification_service::KIND_ORDER_COMPLETED,
        format!("Your order {} has been placed.", order.order_number),
    )
    .await
    {
        tracing::warn!(error = %err, "order notification failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_purchases(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .all(&state.orm)
        .await?
    {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(order_item_from_entity(item));
    }

    let items = orders
        .into_iter()
        .map(|order| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems {
                order: order_from_entity(order),
                items,
            }
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", OrderList { items }, Some(meta)))
}

pub async fn get_purchase(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Recipient fields may be edited only while the order has not shipped.
pub async fn update_purchase(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.recipient_name.is_none()
        && payload.recipient_phone.is_none()
        && payload.delivery_address.is_none()
    {
        return Err(AppError::BadRequest("Nothing to update".into()));
    }

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if order.status != STATUS_PAID {
        return Err(AppError::Conflict(
            "Orders that have shipped or been canceled cannot be modified".into(),
        ));
    }

    let mut active: OrderActive = order.into();
    if let Some(name) = payload.recipient_name {
        active.recipient_name = Set(name);
    }
    if let Some(phone) = payload.recipient_phone {
        active.recipient_phone = Set(phone);
    }
    if let Some(address) = payload.delivery_address {
        active.delivery_address = Set(address);
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Order updated",
        order_from_entity(updated),
        Some(Meta::empty()),
    ))
}

/// Cancellation restores stock, refunds redeemed points, revokes the points
/// the order earned and reverses the lifetime spend it added, re-deriving
/// the grade (which may go down).
pub async fn cancel_purchase(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if order.status == STATUS_CANCELED {
        return Err(AppError::Conflict("Order is already canceled".into()));
    }
    if order.status != STATUS_PAID {
        return Err(AppError::Conflict(
            "Orders that have shipped cannot be canceled".into(),
        ));
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&txn)
        .await?;

    for item in &items {
        let stock = ProductStocks::find()
            .filter(
                Condition::all()
                    .add(StockCol::ProductId.eq(item.product_id))
                    .add(StockCol::Size.eq(item.size.clone())),
            )
            .lock(LockType::Update)
            .one(&txn)
            .await?;

        match stock {
            Some(stock) => {
                let restored = stock.quantity + item.quantity;
                let mut active: StockActive = stock.into();
                active.quantity = Set(restored);
                active.update(&txn).await?;
            }
            // The seller removed the size in the meantime; re-create the row
            // so the inventory is not silently lost.
            None => {
                StockActive {
                    id: Set(Uuid::new_v4()),
                    product_id: Set(item.product_id),
                    size: Set(item.size.clone()),
                    quantity: Set(item.quantity),
                }
                .insert(&txn)
                .await?;
            }
        }

        if let Some(product) = Products::find_by_id(item.product_id).one(&txn).await? {
            let mut active: ProductActive = product.clone().into();
            active.total_sales = Set((product.total_sales - item.quantity as i64).max(0));
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }
    }

    let point_row = UserPoints::find()
        .filter(PointCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let point_row = match point_row {
        Some(p) => p,
        None => default_point_row(user.user_id).insert(&txn).await?,
    };

    // Revoke the exact accrual stamped on the order; later orders may have
    // moved the grade, so the rate cannot be re-derived from current spend.
    let accumulated_before = (point_row.accumulated_amount - order.total_amount).max(0);
    let policy = policy_for(accumulated_before);

    let mut point_active: PointActive = point_row.clone().into();
    point_active.points = Set((point_row.points + order.used_points - order.earned_points).max(0));
    point_active.accumulated_amount = Set(accumulated_before);
    point_active.grade = Set(policy.grade.as_str().into());
    point_active.point_rate = Set(policy.point_rate);
    point_active.updated_at = Set(now.into());
    point_active.update(&txn).await?;

    let mut order_active: OrderActive = order.into();
    order_active.status = Set(STATUS_CANCELED.into());
    order_active.updated_at = Set(now.into());
    let canceled = order_active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Order canceled",
        order_from_entity(canceled),
        Some(Meta::empty()),
    ))
}

fn default_point_row(user_id: Uuid) -> PointActive {
    let policy = policy_for(0);
    PointActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        points: Set(0),
        accumulated_amount: Set(0),
        grade: Set(policy.grade.as_str().into()),
        point_rate: Set(policy.point_rate),
        updated_at: NotSet,
    }
}

pub fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        order_number: model.order_number,
        status: model.status,
        total_amount: model.total_amount,
        used_points: model.used_points,
        earned_points: model.earned_points,
        recipient_name: model.recipient_name,
        recipient_phone: model.recipient_phone,
        delivery_address: model.delivery_address,
        payment_date: model.payment_date.with_timezone(&Utc),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        size: model.size,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_order_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = order_id.to_string();
    let short = &suffix[..8];
    format!("ORD-{}-{}", date, short)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::Grade;

    #[test]
    fn order_number_shape() {
        let id = Uuid::new_v4();
        let number = build_order_number(id);
        assert!(number.starts_with("ORD-"));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2], &id.to_string()[..8]);
    }

    #[test]
    fn accrual_example_from_the_lowest_tier() {
        // 2 x 10,000 at Green (1%): 200 points, spend lands at 20,000.
        let rate = policy_for(0).point_rate;
        assert_eq!(accrue_points(20_000, rate), 200);
        assert_eq!(policy_for(20_000).grade, Grade::Green);
    }

    #[test]
    fn revocation_uses_the_stamped_accrual() {
        // 150,000 spent at Green earns 1,500. Once a later 100,000 order has
        // moved the buyer to Orange, re-deriving the rate from current spend
        // would revoke 3,000, which is why the earned amount is stamped on
        // the order row at placement.
        let stamped = accrue_points(150_000, policy_for(0).point_rate);
        assert_eq!(stamped, 1_500);

        let rederived = accrue_points(150_000, policy_for(250_000 - 150_000).point_rate);
        assert_eq!(rederived, 3_000);
        assert_ne!(stamped, rederived);
    }
}
