use std::collections::HashMap;

use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{StockLine, check_checkout},
    dto::orders::{CheckoutResult, OrderList, OrderListQuery},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::Caller,
    models::Order,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    caller: &Caller,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let user = caller.require_approved_user()?;
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let orders: Vec<Order> = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::total(orders.len() as i64);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let user = caller.require_approved_user()?;
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "OK",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

/// Turns every cart line into a pending order, or none of them.
/// Stock is only checked here; it is decremented when an order is approved.
pub async fn checkout(state: &AppState, caller: &Caller) -> AppResult<ApiResponse<CheckoutResult>> {
    let user = caller.require_approved_user()?;
    let txn = state.orm.begin().await?;

    let lines = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    let product_ids: Vec<Uuid> = lines.iter().map(|line| line.product_id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|product| (product.id, product))
        .collect();

    let stock_lines: Vec<StockLine<'_>> = lines
        .iter()
        .filter_map(|line| {
            products.get(&line.product_id).map(|product| StockLine {
                product: &product.name,
                requested: line.quantity,
                available: product.quantity,
            })
        })
        .collect();

    if let Err(err) = check_checkout(&stock_lines) {
        tracing::info!(user_id = %user.user_id, error = %err, "checkout refused");
        return Err(err);
    }

    let mut orders = Vec::with_capacity(lines.len());
    for line in &lines {
        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.user_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            status: Set(OrderStatus::Pending),
            created_at: NotSet,
            approved_at: Set(None),
        }
        .insert(&txn)
        .await?;
        orders.push(Order::from(order));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    tracing::info!(user_id = %user.user_id, orders = orders.len(), "checkout completed");
    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_ids": order_ids }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order submitted; awaiting administrator approval",
        CheckoutResult { orders },
        Some(Meta::empty()),
    ))
}
