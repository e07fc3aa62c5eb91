pub mod auth_service;
pub mod cart_service;
pub mod dashboard_service;
pub mod inquiry_service;
pub mod notification_service;
pub mod point_service;
pub mod product_service;
pub mod purchase_service;
pub mod review_service;
pub mod store_service;
