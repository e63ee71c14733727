pub mod audit_logs;
pub mod cart_items;
pub mod comments;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod ratings;
pub mod replies;
pub mod seller_requests;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use comments::Entity as Comments;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use ratings::Entity as Ratings;
pub use replies::Entity as Replies;
pub use seller_requests::Entity as SellerRequests;
pub use users::Entity as Users;
