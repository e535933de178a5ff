use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{AuditEntry, ConsumptionRecord, Product, Report, User};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordConsumptionRequest {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConsumptionResult {
    pub record: ConsumptionRecord,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedUser {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct OrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct ConsumptionTotal {
    pub product_id: Uuid,
    pub product_name: String,
    pub user_id: Uuid,
    pub username: String,
    pub total_consumed: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub current_month: String,
    pub pending_users: Vec<User>,
    pub users: Vec<User>,
    pub orders: Vec<OrderSummary>,
    pub products: Vec<Product>,
    pub reports: Vec<Report>,
    pub consumption_records: Vec<ConsumptionRecord>,
    pub consumption_totals: Vec<ConsumptionTotal>,
    pub recent_activity: Vec<AuditEntry>,
}
