use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{CartItem, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartRequest {
    pub lines: Vec<CartLineUpdate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CartLineUpdate {
    pub line_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartList {
    pub items: Vec<CartItemDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemDto {
    pub id: Uuid,
    pub product: Product,
    pub quantity: i32,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct CartUpdateSummary {
    pub updated: Vec<CartItem>,
    pub removed: Vec<Uuid>,
    pub rejected: Vec<LineRejection>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LineRejection {
    pub line_id: Uuid,
    pub requested: i32,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RemovedLine {
    pub line_id: Uuid,
}
