use axum::Router;

use crate::{config::AppConfig, state::AppState};

pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod inquiries;
pub mod metadata;
pub mod notifications;
pub mod params;
pub mod points;
pub mod products;
pub mod purchase;
pub mod reviews;
pub mod stores;
pub mod uploads;
pub mod users;

// Build the API router without binding state; it is provided at the top level.
// Cart and purchase keep their historical /api prefix so existing clients do
// not break.
pub fn create_api_router(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/metadata", metadata::router())
        .nest("/stores", stores::router())
        .nest("/products", products::router())
        .nest("/reviews", reviews::router())
        .nest("/inquiries", inquiries::router())
        .nest("/notifications", notifications::router())
        .nest("/points", points::router())
        .nest("/dashboard", dashboard::router())
        .nest("/uploads", uploads::router(config))
        .nest("/api/cart", cart::router())
        .nest("/api/purchase", purchase::router())
}
