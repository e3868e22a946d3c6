use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    contractors::Model as ContractorModel, order_items::Model as OrderItemModel,
    orders::Model as OrderModel, users::Model as UserModel,
};

/// Public view of a user; never carries the password hash or one-time tokens.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Contractor {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub contractor_id: Uuid,
    pub delivery_date: NaiveDate,
    pub is_delivered: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub total: Decimal,
}

/// Amount in minor units to a two-digit decimal.
pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

impl From<UserModel> for User {
    fn from(model: UserModel) -> Self {
        Self {
            id: model.id,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            is_admin: model.is_admin,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<ContractorModel> for Contractor {
    fn from(model: ContractorModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<OrderModel> for Order {
    fn from(model: OrderModel) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            contractor_id: model.contractor_id,
            delivery_date: model.delivery_date,
            is_delivered: model.is_delivered,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<OrderItemModel> for OrderItem {
    fn from(model: OrderItemModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            name: model.name,
            quantity: model.quantity,
            price: cents_to_decimal(model.price_cents),
            total: cents_to_decimal(model.total_cents),
        }
    }
}
