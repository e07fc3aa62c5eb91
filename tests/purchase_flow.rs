use axum_marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        cart::AddToCartRequest,
        inquiries::CreateInquiryRequest,
        purchase::{CreateOrderRequest, PurchaseLineItem, UpdateOrderRequest},
        reviews::CreateReviewRequest,
    },
    entity::{
        cart_items::Entity as CartItems,
        notifications::{Column as NotifCol, Entity as Notifications},
        product_stocks::{ActiveModel as StockActive, Column as StockCol, Entity as ProductStocks},
        products::ActiveModel as ProductActive,
        stores::ActiveModel as StoreActive,
        user_points::{Column as PointCol, Entity as UserPoints},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{InquiryQuery, Pagination},
    services::{cart_service, inquiry_service, notification_service, purchase_service, review_service},
    sse::SseRegistry,
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set, Statement,
};
use uuid::Uuid;

// Full purchase lifecycle: checkout decrements stock, clears the cart and
// settles points; bad orders roll back; cancellation restores everything and
// revokes the accrual stamped on the order; recipient amendments and reviews
// obey the status gates; the last unit sold fans out a sold-out notification;
// secret inquiries stay masked for strangers.
#[tokio::test]
async fn purchase_lifecycle_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let buyer_id = create_user(&state, "buyer", "buyer@example.com").await?;
    let seller_id = create_user(&state, "seller", "seller@example.com").await?;

    let store = StoreActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller_id),
        name: Set("Test Store".into()),
        address: Set("1 Test Street".into()),
        phone_number: Set("010-1234-5678".into()),
        image_url: NotSet,
        description: NotSet,
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        store_id: Set(store.id),
        name: Set("Test Hoodie".into()),
        description: Set(Some("A hoodie for testing".into())),
        category: Set("tops".into()),
        price: Set(10_000),
        discount_price: NotSet,
        discount_start: NotSet,
        discount_end: NotSet,
        image_url: NotSet,
        total_sales: Set(0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    StockActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product.id),
        size: Set("M".into()),
        quantity: Set(5),
    }
    .insert(&state.orm)
    .await?;

    let buyer = AuthUser {
        user_id: buyer_id,
        role: "buyer".into(),
    };

    // Something in the cart, so checkout can prove it clears it.
    cart_service::add_to_cart(
        &state,
        &buyer,
        AddToCartRequest {
            product_id: product.id,
            size: "M".into(),
            quantity: 1,
        },
    )
    .await?;

    // First order: 2 x 10,000 at the Green rate.
    let resp = purchase_service::create_order(&state, &buyer, order_request(product.id, 2, 0)).await?;
    let placed = resp.data.expect("order data");
    assert_eq!(placed.order.total_amount, 20_000);
    assert_eq!(placed.order.status, "paid");
    assert_eq!(placed.order.earned_points, 200);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].price, 10_000);

    assert_eq!(stock_quantity(&state, product.id, "M").await?, 3);

    let points = point_row(&state, buyer_id).await?;
    assert_eq!(points.points, 200);
    assert_eq!(points.accumulated_amount, 20_000);
    assert_eq!(points.grade, "Green");

    let cart_count = CartItems::find().count(&state.orm).await?;
    assert_eq!(cart_count, 0, "checkout must clear the whole cart");

    // Recipient details may change while the order is merely paid...
    let resp = purchase_service::update_purchase(
        &state,
        &buyer,
        placed.order.id,
        recipient_change("Test Buyer (moved)"),
    )
    .await?;
    assert_eq!(
        resp.data.expect("order data").recipient_name,
        "Test Buyer (moved)"
    );

    // ...and only by the buyer who placed it.
    let seller = AuthUser {
        user_id: seller_id,
        role: "seller".into(),
    };
    let err = purchase_service::update_purchase(
        &state,
        &seller,
        placed.order.id,
        recipient_change("Someone Else"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden), "got {err:?}");

    // A rejected order must not touch stock.
    let err = purchase_service::create_order(&state, &buyer, order_request(product.id, 99, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    assert_eq!(stock_quantity(&state, product.id, "M").await?, 3);

    // Redeeming more points than the balance is refused.
    let err = purchase_service::create_order(&state, &buyer, order_request(product.id, 1, 10_000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "got {err:?}");

    // Second order redeems 100 points: 10,000 - 100 charged, 99 earned.
    let resp =
        purchase_service::create_order(&state, &buyer, order_request(product.id, 1, 100)).await?;
    let second_placed = resp.data.expect("order data");
    let second_item_id = second_placed.items[0].id;
    let second = second_placed.order;
    assert_eq!(second.total_amount, 9_900);
    assert_eq!(second.used_points, 100);

    let points = point_row(&state, buyer_id).await?;
    assert_eq!(points.points, 200 - 100 + 99);
    assert_eq!(points.accumulated_amount, 29_900);

    // Cancel the second order: stock, points and lifetime spend all revert.
    let resp = purchase_service::cancel_purchase(&state, &buyer, second.id).await?;
    assert_eq!(resp.data.expect("order data").status, "canceled");

    assert_eq!(stock_quantity(&state, product.id, "M").await?, 3);
    let points = point_row(&state, buyer_id).await?;
    assert_eq!(points.points, 200);
    assert_eq!(points.accumulated_amount, 20_000);

    // Canceling twice is a conflict.
    let err = purchase_service::cancel_purchase(&state, &buyer, second.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    // A canceled order is no longer amendable either.
    let err = purchase_service::update_purchase(
        &state,
        &buyer,
        second.id,
        recipient_change("Too Late"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    // Reviews stay open for live order items but not canceled ones.
    let err = review_service::create_review(
        &state,
        &buyer,
        CreateReviewRequest {
            order_item_id: second_item_id,
            rating: 5,
            content: "Never arrived, obviously".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)), "got {err:?}");

    let resp = review_service::create_review(
        &state,
        &buyer,
        CreateReviewRequest {
            order_item_id: placed.items[0].id,
            rating: 4,
            content: "Fits well".into(),
        },
    )
    .await?;
    assert_eq!(resp.data.expect("review").rating, 4);

    // Buying out the size notifies the seller, in the row store and over SSE.
    let (mut seller_rx, _guard) = state.sse.subscribe(seller_id);
    purchase_service::create_order(&state, &buyer, order_request(product.id, 3, 0)).await?;
    assert_eq!(stock_quantity(&state, product.id, "M").await?, 0);

    let sold_out = Notifications::find()
        .filter(
            Condition::all()
                .add(NotifCol::UserId.eq(seller_id))
                .add(NotifCol::Kind.eq(notification_service::KIND_SOLD_OUT)),
        )
        .count(&state.orm)
        .await?;
    assert_eq!(sold_out, 1);
    assert!(seller_rx.try_recv().is_ok(), "seller should get an SSE event");

    // The purchasing buyer is not told the size they just emptied sold out.
    let buyer_sold_out = Notifications::find()
        .filter(
            Condition::all()
                .add(NotifCol::UserId.eq(buyer_id))
                .add(NotifCol::Kind.eq(notification_service::KIND_SOLD_OUT)),
        )
        .count(&state.orm)
        .await?;
    assert_eq!(buyer_sold_out, 0);

    // A pricier order pushes the buyer over the next grade threshold. When a
    // later order has already moved the grade, cancellation must hand back
    // the amount the order actually earned, not one re-derived from the
    // current rate.
    let pricey = ProductActive {
        id: Set(Uuid::new_v4()),
        store_id: Set(store.id),
        name: Set("Test Coat".into()),
        description: NotSet,
        category: Set("outer".into()),
        price: Set(50_000),
        discount_price: NotSet,
        discount_start: NotSet,
        discount_end: NotSet,
        image_url: NotSet,
        total_sales: Set(0),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    StockActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(pricey.id),
        size: Set("M".into()),
        quantity: Set(10),
    }
    .insert(&state.orm)
    .await?;

    // Spend so far: 50,000 at Green (1%). 2 x 50,000 lands at 150,000.
    let resp = purchase_service::create_order(&state, &buyer, order_request(pricey.id, 2, 0)).await?;
    let big = resp.data.expect("order data").order;
    assert_eq!(big.total_amount, 100_000);
    assert_eq!(big.earned_points, 1_000);

    let points = point_row(&state, buyer_id).await?;
    assert_eq!(points.accumulated_amount, 150_000);
    assert_eq!(points.grade, "Orange");

    // The follow-up order accrues at the new 2% rate.
    let resp = purchase_service::create_order(&state, &buyer, order_request(pricey.id, 1, 0)).await?;
    assert_eq!(resp.data.expect("order data").order.earned_points, 1_000);

    let before = point_row(&state, buyer_id).await?;
    purchase_service::cancel_purchase(&state, &buyer, big.id).await?;
    let after = point_row(&state, buyer_id).await?;
    assert_eq!(
        before.points - after.points,
        big.earned_points,
        "cancellation must revoke exactly what the order earned"
    );
    assert_eq!(after.accumulated_amount, before.accumulated_amount - big.total_amount);

    // A secret inquiry is readable only by its author and the seller.
    let resp = inquiry_service::create_inquiry(
        &state,
        &buyer,
        product.id,
        CreateInquiryRequest {
            title: "Will this shrink?".into(),
            content: "Asking before the first wash.".into(),
            is_secret: true,
        },
    )
    .await?;
    let inquiry_id = resp.data.expect("inquiry").id;

    let listed =
        inquiry_service::list_product_inquiries(&state, None, product.id, inquiry_query()).await?;
    let items = listed.data.expect("inquiries").items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "Secret inquiry");
    assert!(items[0].content.is_empty());

    let listed =
        inquiry_service::list_product_inquiries(&state, Some(&seller), product.id, inquiry_query())
            .await?;
    assert_eq!(
        listed.data.expect("inquiries").items[0].title,
        "Will this shrink?"
    );

    let err = inquiry_service::get_inquiry(&state, None, inquiry_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden), "got {err:?}");

    let resp = inquiry_service::get_inquiry(&state, Some(&buyer), inquiry_id).await?;
    assert_eq!(
        resp.data.expect("inquiry").content,
        "Asking before the first wash."
    );

    Ok(())
}

fn recipient_change(name: &str) -> UpdateOrderRequest {
    UpdateOrderRequest {
        recipient_name: Some(name.into()),
        recipient_phone: None,
        delivery_address: None,
    }
}

fn inquiry_query() -> InquiryQuery {
    InquiryQuery {
        pagination: Pagination {
            page: None,
            per_page: None,
        },
        status: None,
    }
}

fn order_request(product_id: Uuid, quantity: i32, use_points: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        items: vec![PurchaseLineItem {
            product_id,
            size: "M".into(),
            quantity,
        }],
        use_points,
        recipient_name: "Test Buyer".into(),
        recipient_phone: "010-0000-0000".into(),
        delivery_address: "1 Test Street".into(),
    }
}

async fn stock_quantity(state: &AppState, product_id: Uuid, size: &str) -> anyhow::Result<i32> {
    let stock = ProductStocks::find()
        .filter(
            Condition::all()
                .add(StockCol::ProductId.eq(product_id))
                .add(StockCol::Size.eq(size)),
        )
        .one(&state.orm)
        .await?
        .expect("stock row");
    Ok(stock.quantity)
}

async fn point_row(
    state: &AppState,
    user_id: Uuid,
) -> anyhow::Result<axum_marketplace_api::entity::user_points::Model> {
    Ok(UserPoints::find()
        .filter(PointCol::UserId.eq(user_id))
        .one(&state.orm)
        .await?
        .expect("point row"))
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE inquiry_replies, inquiries, reviews, notifications, order_items, orders, \
         cart_items, product_stocks, products, stores, user_points, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState {
        pool,
        orm,
        sse: SseRegistry::new(),
        config: test_config(database_url),
    })
}

fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-access-secret".into(),
        refresh_secret: "test-refresh-secret".into(),
        frontend_origin: "http://localhost:3000".into(),
        upload_dir: "uploads".into(),
    }
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        name: Set(format!("Test {role}")),
        role: Set(role.into()),
        image_url: NotSet,
        refresh_token: NotSet,
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}
