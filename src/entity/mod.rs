pub mod audit_logs;
pub mod cart_items;
pub mod notifications;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use notifications::Entity as Notifications;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use promotions::Entity as Promotions;
pub use users::Entity as Users;
