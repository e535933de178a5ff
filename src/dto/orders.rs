use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{entity::orders::OrderStatus, models::Order};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResult {
    pub orders: Vec<Order>,
}

/// Outcome of an approve/reject request. `applied` is false when the order
/// had already left `pending` and nothing changed.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDecision {
    pub order: Order,
    pub applied: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}
