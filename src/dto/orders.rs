use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemInput {
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub delivery_date: NaiveDate,
    pub contractor_id: Uuid,
    pub items: Vec<OrderItemInput>,
}

/// Full replacement of an order's editable fields and item set.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    pub delivery_date: NaiveDate,
    pub contractor_id: Uuid,
    pub items: Vec<OrderItemInput>,
    /// Keeps the stored flag when omitted.
    #[serde(default)]
    pub is_delivered: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedOrder {
    pub id: Uuid,
    pub deleted_items: u64,
}
