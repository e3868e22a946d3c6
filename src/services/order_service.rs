use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    db::classify_write_error,
    dto::orders::{CreateOrderRequest, DeletedOrder, OrderList, OrderWithItems, UpdateOrderRequest},
    entity::{
        contractors::Entity as Contractors,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, OrderAction, authorize_order_access, order_visibility},
    models::{Order, OrderItem, cents_to_decimal},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::{
        invoice::{InvoiceLine, InvoiceSnapshot},
        order_validation::{NewOrderItem, validate_order},
    },
    state::AppState,
};

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let today = Utc::now().date_naive();
    let validated = validate_order(
        payload.delivery_date,
        payload.contractor_id,
        &payload.items,
        today,
    )?;

    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        contractor_id: Set(validated.contractor_id),
        delivery_date: Set(validated.delivery_date),
        is_delivered: Set(false),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&txn)
    .await
    .map_err(classify_write_error)?;

    let items = insert_items(&txn, order.id, validated.items).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, items = items.len(), "order created");
    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Replaces the order's fields and its whole item set. The payload is
/// validated before the transaction starts, so a rejected update never
/// touches the stored items.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let today = Utc::now().date_naive();
    let validated = validate_order(
        payload.delivery_date,
        payload.contractor_id,
        &payload.items,
        today,
    )?;

    let txn = state.orm.begin().await?;

    let order = find_locked(&txn, id).await?;
    authorize_order_access(user, &order, OrderAction::Update)?;

    let mut active: OrderActive = order.into();
    active.delivery_date = Set(validated.delivery_date);
    active.contractor_id = Set(validated.contractor_id);
    if let Some(is_delivered) = payload.is_delivered {
        active.is_delivered = Set(is_delivered);
    }
    let order = active.update(&txn).await.map_err(classify_write_error)?;

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    let items = insert_items(&txn, order.id, validated.items).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, items = items.len(), "order updated");
    Ok(ApiResponse::success(
        "Order updated",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Items go first, explicitly, in the same transaction as the order row.
pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedOrder>> {
    let txn = state.orm.begin().await?;

    let order = find_locked(&txn, id).await?;
    authorize_order_access(user, &order, OrderAction::Delete)?;

    let removed = OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(order.id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, "order deleted");
    Ok(ApiResponse::success(
        "Order deleted",
        DeletedOrder {
            id: order.id,
            deleted_items: removed.rows_affected,
        },
        None,
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    authorize_order_access(user, &order, OrderAction::Read)?;

    let items = load_items(&state.orm, order.id)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (skip, limit) = query.normalize();

    let mut condition = order_visibility(user);
    if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
        if from > to {
            return Err(AppError::Validation(
                "date_from must not be after date_to".into(),
            ));
        }
    }
    if let Some(from) = query.date_from {
        condition = condition.add(OrderCol::CreatedAt.gte(start_of_day(from)));
    }
    // date_to covers its whole day.
    if let Some(next_day) = query.date_to.and_then(|to| to.succ_opt()) {
        condition = condition.add(OrderCol::CreatedAt.lt(start_of_day(next_day)));
    }
    if let Some(is_delivered) = query.is_delivered {
        condition = condition.add(OrderCol::IsDelivered.eq(is_delivered));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_asc(OrderCol::CreatedAt)
        .order_by_asc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await?;

    let orders = finder
        .offset(skip)
        .limit(limit)
        .all(&state.orm)
        .await?;

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    if !orders.is_empty() {
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(ids))
            .order_by_asc(OrderItemCol::Position)
            .all(&state.orm)
            .await?;
        for item in items {
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItem::from(item));
        }
    }

    let items = orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            order: Order::from(order),
        })
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(skip, limit, total)),
    ))
}

/// Reads the finished order and renders it on the blocking pool. Any
/// rendering failure surfaces as an internal error.
pub async fn render_order_invoice(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<Vec<u8>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    authorize_order_access(user, &order, OrderAction::Read)?;

    let contractor = Contractors::find_by_id(order.contractor_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "order {} references missing contractor {}",
                order.id,
                order.contractor_id
            ))
        })?;

    let items = load_items(&state.orm, order.id)
        .await?
        .into_iter()
        .map(|item| InvoiceLine {
            name: item.name,
            quantity: item.quantity,
            price: cents_to_decimal(item.price_cents),
            total: cents_to_decimal(item.total_cents),
        })
        .collect();

    let snapshot = InvoiceSnapshot {
        order_id: order.id,
        created_at: order.created_at.with_timezone(&Utc),
        delivery_date: order.delivery_date,
        contractor_name: contractor.name,
        items,
    };

    let renderer = Arc::clone(&state.renderer);
    let bytes = tokio::task::spawn_blocking(move || renderer.render(&snapshot))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invoice rendering task failed: {e}")))??;

    tracing::debug!(order_id = %order.id, bytes = bytes.len(), "invoice rendered");
    Ok(bytes)
}

async fn find_locked<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound("Order"))
}

async fn load_items<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?;
    Ok(items)
}

async fn insert_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    items: Vec<NewOrderItem>,
) -> AppResult<Vec<OrderItem>> {
    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let model = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            position: Set(item.position),
            name: Set(item.name),
            quantity: Set(item.quantity),
            price_cents: Set(item.price_cents),
            total_cents: Set(item.total_cents),
        }
        .insert(conn)
        .await
        .map_err(classify_write_error)?;
        inserted.push(OrderItem::from(model));
    }
    Ok(inserted)
}

fn start_of_day(date: NaiveDate) -> DateTime<FixedOffset> {
    date.and_time(NaiveTime::MIN).and_utc().fixed_offset()
}
