pub mod cart_items;
pub mod inquiries;
pub mod inquiry_replies;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod product_stocks;
pub mod products;
pub mod reviews;
pub mod stores;
pub mod user_points;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use inquiries::Entity as Inquiries;
pub use inquiry_replies::Entity as InquiryReplies;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_stocks::Entity as ProductStocks;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use stores::Entity as Stores;
pub use user_points::Entity as UserPoints;
pub use users::Entity as Users;
