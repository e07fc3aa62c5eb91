use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest, UserSummary},
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        dashboard::{PriceRangeRevenue, SalesSummary, TopProduct},
        inquiries::{CreateInquiryRequest, InquiryList, ReplyRequest, UpdateInquiryRequest},
        notifications::{NotificationFilter, NotificationList, NotificationSort},
        points::PointSummary,
        products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
        purchase::{CreateOrderRequest, OrderList, OrderWithItems, UpdateOrderRequest},
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewRequest},
        stores::{CreateStoreRequest, UpdateStoreRequest},
    },
    models::{
        Inquiry, InquiryReply, Notification, Order, OrderItem, Product, Review, StockItem, Store,
        User,
    },
    response::{ApiResponse, Meta},
    routes::{
        auth, cart, dashboard, health, inquiries, metadata, notifications, params, points,
        products, purchase, reviews, stores, uploads, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        users::me,
        metadata::list_grades,
        stores::create_store,
        stores::get_my_store,
        stores::update_my_store,
        stores::get_store,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_product_reviews,
        products::list_product_inquiries,
        products::create_inquiry,
        cart::list_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        purchase::create_order,
        purchase::list_purchases,
        purchase::get_purchase,
        purchase::update_purchase,
        purchase::cancel_purchase,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        inquiries::list_my_inquiries,
        inquiries::get_inquiry,
        inquiries::update_inquiry,
        inquiries::delete_inquiry,
        inquiries::create_reply,
        inquiries::update_reply,
        notifications::list_notifications,
        notifications::mark_as_read,
        notifications::notification_stream,
        points::get_my_point_info,
        dashboard::sales_summary,
        dashboard::top_products,
        dashboard::sales_by_price_range,
        uploads::upload_image,
    ),
    components(
        schemas(
            User,
            Store,
            Product,
            StockItem,
            Order,
            OrderItem,
            Review,
            Inquiry,
            InquiryReply,
            Notification,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            RefreshRequest,
            RefreshResponse,
            UserSummary,
            CreateStoreRequest,
            UpdateStoreRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductDetail,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderWithItems,
            OrderList,
            CreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            CreateInquiryRequest,
            UpdateInquiryRequest,
            ReplyRequest,
            InquiryList,
            NotificationFilter,
            NotificationSort,
            NotificationList,
            PointSummary,
            SalesSummary,
            TopProduct,
            PriceRangeRevenue,
            metadata::GradeInfo,
            uploads::UploadedFile,
            params::Pagination,
            params::ProductQuery,
            params::InquiryQuery,
            params::NotificationQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<LoginResponse>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CartList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<ReviewList>,
            ApiResponse<InquiryList>,
            ApiResponse<PointSummary>,
            ApiResponse<SalesSummary>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and token refresh"),
        (name = "Users", description = "Account endpoints"),
        (name = "Metadata", description = "Static reference data"),
        (name = "Stores", description = "Seller store endpoints"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Purchase", description = "Checkout and order endpoints"),
        (name = "Reviews", description = "Review endpoints"),
        (name = "Inquiries", description = "Product inquiry endpoints"),
        (name = "Notifications", description = "Notification list and live stream"),
        (name = "Points", description = "Point balance and grade progress"),
        (name = "Dashboard", description = "Seller sales analytics"),
        (name = "Uploads", description = "Image upload"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
