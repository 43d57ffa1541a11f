use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::record_audit,
    dto::orders::{
        OrderList, OrderWithItems, PlaceOrderRequest, UpdateOrderStatusRequest, UpdatePaymentRequest,
    },
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel, ShippingAddress},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::{
        access::{Action, Resource, can, ensure_capability, ensure_owner_or},
        auth::AuthUser,
    },
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::address_service,
    state::AppState,
    status::{OrderStatus, PaymentStatus},
};

/// Frozen copy of a cart line at the moment the order is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub price: i64,
    pub quantity: i32,
}

pub fn order_total(items: &[ItemSnapshot]) -> AppResult<i64> {
    items.iter().try_fold(0i64, |total, item| {
        item.price
            .checked_mul(i64::from(item.quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))
    })
}

fn missing_checkout_details() -> AppError {
    AppError::BadRequest("Shipping address and payment method are required".into())
}

fn stored_order_status(order: &OrderModel) -> AppResult<OrderStatus> {
    order.order_status.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unknown status {}",
            order.id,
            order.order_status
        ))
    })
}

fn stored_payment_status(order: &OrderModel) -> AppResult<PaymentStatus> {
    order.payment_status.parse().map_err(|_| {
        AppError::Internal(anyhow::anyhow!(
            "order {} has unknown payment status {}",
            order.id,
            order.payment_status
        ))
    })
}

async fn resolve_shipping_address<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    inline: Option<ShippingAddress>,
    address_id: Option<Uuid>,
) -> AppResult<ShippingAddress> {
    if let Some(address) = inline {
        return Ok(address);
    }
    if let Some(id) = address_id {
        let saved = address_service::find_owned(db, user_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("Address"))?;
        return Ok(ShippingAddress::from(&saved));
    }
    address_service::find_default(db, user_id)
        .await?
        .map(|saved| ShippingAddress::from(&saved))
        .ok_or_else(missing_checkout_details)
}

async fn items_of<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<Vec<OrderItem>> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(db)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(items)
}

async fn find_order<C: ConnectionTrait>(db: &C, id: Uuid, lock: bool) -> AppResult<OrderModel> {
    let mut finder = Orders::find_by_id(id);
    if lock {
        finder = finder.lock(LockType::Update);
    }
    finder
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let payment_method = payload.payment_method.ok_or_else(missing_checkout_details)?;

    let txn = state.db().begin().await?;

    let shipping_address = resolve_shipping_address(
        &txn,
        user.user_id,
        payload.shipping_address,
        payload.address_id,
    )
    .await?;

    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let mut snapshots = Vec::with_capacity(lines.len());
    for line in &lines {
        let product = products.get(&line.product_id).ok_or_else(|| {
            AppError::BadRequest(format!("Product {} is no longer available", line.product_id))
        })?;
        if product.stock < line.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
        snapshots.push(ItemSnapshot {
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            quantity: line.quantity,
        });
    }

    let total_amount = order_total(&snapshots)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        shipping_address: Set(shipping_address),
        payment_method: Set(payment_method.to_string()),
        // Every new order starts unpaid; a payment update records the outcome.
        payment_status: Set(PaymentStatus::Pending.to_string()),
        order_status: Set(OrderStatus::Pending.to_string()),
        total_amount: Set(total_amount),
        transaction_id: Set(None),
        tracking_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(snapshot.product_id),
            name: Set(snapshot.name),
            image: Set(snapshot.image),
            price: Set(snapshot.price),
            quantity: Set(snapshot.quantity),
        }
        .insert(&txn)
        .await?;

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(&txn)
            .await?;

        items.push(OrderItem::from(item));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, total_amount, "order placed");
    record_audit(
        state.db(),
        user.user_id,
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed successfully",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

async fn list_with(
    state: &AppState,
    scope: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = scope {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse()?;
        condition = condition.add(OrderCol::OrderStatus.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(state.db()).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.db())
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    list_with(state, Some(user.user_id), query).await
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_capability(user, Resource::Orders, Action::ListAll)?;
    list_with(state, None, query).await
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = find_order(state.db(), id, false).await?;
    // Someone else's order reads as missing unless the caller may read any order.
    if order.user_id != user.user_id && !can(user, Resource::Orders, Action::ReadAny) {
        return Err(AppError::not_found("Order"));
    }

    let items = items_of(state.db(), order.id).await?;
    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_capability(user, Resource::Orders, Action::UpdateStatus)?;
    let requested: OrderStatus = payload.status.parse()?;

    let txn = state.db().begin().await?;
    let order = find_order(&txn, id, true).await?;
    let current = stored_order_status(&order)?;
    let next = current.transition(requested)?;

    let mut active: OrderActive = order.into();
    active.order_status = Set(next.to_string());
    if let Some(tracking_id) = payload.tracking_id {
        active.tracking_id = Set(Some(tracking_id));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    if next == OrderStatus::Cancelled {
        restock(&txn, order.id).await?;
    }
    let items = items_of(&txn, order.id).await?;
    txn.commit().await?;

    record_audit(
        state.db(),
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current.as_str(), "to": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated successfully",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdatePaymentRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_capability(user, Resource::Orders, Action::UpdatePayment)?;
    let requested: PaymentStatus = payload.payment_status.parse()?;

    let txn = state.db().begin().await?;
    let order = find_order(&txn, id, true).await?;
    let current = stored_payment_status(&order)?;
    let next = current.transition(requested)?;

    let mut active: OrderActive = order.into();
    active.payment_status = Set(next.to_string());
    if let Some(transaction_id) = payload.transaction_id {
        active.transaction_id = Set(Some(transaction_id));
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    let items = items_of(&txn, order.id).await?;
    txn.commit().await?;

    record_audit(
        state.db(),
        user.user_id,
        "order_payment_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current.as_str(), "to": next.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment status updated successfully",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.db().begin().await?;
    let order = find_order(&txn, id, true).await?;
    ensure_owner_or(user, order.user_id, Resource::Orders, Action::CancelAny)?;

    let current = stored_order_status(&order)?;
    if !current.is_cancellable() {
        return Err(AppError::BadRequest(
            "Cannot cancel an order that has already been shipped or delivered".into(),
        ));
    }
    let next = current.transition(OrderStatus::Cancelled)?;

    let mut active: OrderActive = order.into();
    active.order_status = Set(next.to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    restock(&txn, order.id).await?;
    let items = items_of(&txn, order.id).await?;
    txn.commit().await?;

    record_audit(
        state.db(),
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Returns the quantities of a cancelled order to stock. Deleted products are skipped.
async fn restock<C: ConnectionTrait>(db: &C, order_id: Uuid) -> AppResult<()> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(db)
        .await?;
    for item in items {
        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(item.quantity))
            .filter(ProdCol::Id.eq(item.product_id))
            .exec(db)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: i64, quantity: i32) -> ItemSnapshot {
        ItemSnapshot {
            product_id: Uuid::new_v4(),
            name: "Sample".into(),
            image: String::new(),
            price,
            quantity,
        }
    }

    #[test]
    fn total_is_sum_of_price_times_quantity() {
        assert_eq!(order_total(&[snapshot(10, 2), snapshot(5, 1)]).unwrap(), 25);
        assert_eq!(order_total(&[]).unwrap(), 0);
    }

    #[test]
    fn overflowing_totals_are_rejected() {
        let err = order_total(&[snapshot(i64::MAX, 2)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Order total is too large"));

        let err = order_total(&[snapshot(i64::MAX, 1), snapshot(1, 1)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
