//! Business rules an order must satisfy before anything touches the store.

use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use uuid::Uuid;

use crate::{
    dto::orders::OrderItemInput,
    error::{AppError, AppResult},
};

/// Largest accepted gap between an item's total and quantity * price, in minor units.
pub const TOTAL_TOLERANCE_CENTS: u64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub position: i32,
    pub name: String,
    pub quantity: i32,
    pub price_cents: i64,
    pub total_cents: i64,
}

/// An order payload that passed every business rule. Only this type can
/// reach the write path, so an item set is never replaced by an invalid one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub delivery_date: NaiveDate,
    pub contractor_id: Uuid,
    pub items: Vec<NewOrderItem>,
}

pub fn validate_order(
    delivery_date: NaiveDate,
    contractor_id: Uuid,
    items: &[OrderItemInput],
    today: NaiveDate,
) -> AppResult<ValidatedOrder> {
    if delivery_date < today {
        return Err(AppError::Validation(
            "Delivery date cannot be in the past".into(),
        ));
    }
    if items.is_empty() {
        return Err(AppError::Validation(
            "Order must contain at least one item".into(),
        ));
    }

    let items = items
        .iter()
        .enumerate()
        .map(|(index, item)| validate_item(index, item))
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ValidatedOrder {
        delivery_date,
        contractor_id,
        items,
    })
}

fn validate_item(index: usize, item: &OrderItemInput) -> AppResult<NewOrderItem> {
    let invalid = |reason: &str| AppError::Validation(format!("Item {}: {reason}", index + 1));

    let name = item.name.trim();
    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if item.quantity <= 0 {
        return Err(invalid("quantity must be positive"));
    }
    if item.price < Decimal::ZERO {
        return Err(invalid("price must not be negative"));
    }

    let price_cents =
        to_cents(item.price).ok_or_else(|| invalid("price must have at most two decimal places"))?;
    let total_cents =
        to_cents(item.total).ok_or_else(|| invalid("total must have at most two decimal places"))?;

    if total_cents < 0 {
        return Err(invalid("total must not be negative"));
    }

    let expected = price_cents
        .checked_mul(i64::from(item.quantity))
        .ok_or_else(|| invalid("quantity * price is out of range"))?;
    if total_cents.abs_diff(expected) > TOTAL_TOLERANCE_CENTS {
        return Err(invalid("total does not match quantity * price"));
    }

    let position =
        i32::try_from(index).map_err(|_| AppError::Validation("Too many items".into()))?;

    Ok(NewOrderItem {
        position,
        name: name.to_string(),
        quantity: item.quantity,
        price_cents,
        total_cents,
    })
}

/// Converts an amount to minor units; `None` if it has sub-cent digits or
/// does not fit.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    let scaled = amount.checked_mul(Decimal::ONE_HUNDRED)?;
    if !scaled.fract().is_zero() {
        return None;
    }
    scaled.to_i64()
}
