pub mod audit_logs;
pub mod cart_items;
pub mod consumption_records;
pub mod orders;
pub mod products;
pub mod reports;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use cart_items::Entity as CartItems;
pub use consumption_records::Entity as ConsumptionRecords;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use reports::Entity as Reports;
pub use users::Entity as Users;
