pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod inquiries;
pub mod notifications;
pub mod points;
pub mod products;
pub mod purchase;
pub mod reviews;
pub mod stores;
