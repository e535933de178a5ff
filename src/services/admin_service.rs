use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Decision, Transition, order_transition, report_month},
    dto::admin::{
        ConsumptionResult, ConsumptionTotal, Dashboard, OrderSummary, RecordConsumptionRequest,
        RejectedUser,
    },
    dto::orders::{OrderDecision, OrderList, OrderListQuery},
    entity::{
        ConsumptionRecords, Reports, Users,
        consumption_records::{
            ActiveModel as ConsumptionActive, Column as ConsumptionCol,
            Model as ConsumptionModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
        reports::{ActiveModel as ReportActive, Column as ReportCol},
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::Caller,
    models::{ConsumptionRecord, Order, Product, Report, User},
    notifier::Notification,
    response::{ApiResponse, Meta},
    state::AppState,
};

const RECENT_ACTIVITY_LIMIT: u64 = 50;

pub async fn approve_user(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    let admin = caller.require_admin()?;
    let existing = Users::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: UserActive = existing.into();
    active.is_approved = Set(true);
    active.is_active = Set(true);
    let user = active.update(&state.orm).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user approved");
    audit::record(
        &state.pool,
        Some(admin.user_id),
        "user_approve",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;
    state.notifier.notify(Notification::UserApproved {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    });

    Ok(ApiResponse::success(
        format!("User {} approved", user.username),
        User::from(user),
        Some(Meta::empty()),
    ))
}

/// Rejection deletes the account outright, together with everything it owns.
pub async fn reject_user(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<RejectedUser>> {
    caller.require_admin()?;
    let existing = Users::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    if existing.is_admin {
        return Err(AppError::Forbidden(
            "Administrator accounts cannot be rejected".into(),
        ));
    }

    Users::delete_by_id(existing.id).exec(&state.orm).await?;

    tracing::info!(user_id = %existing.id, username = %existing.username, "user rejected and deleted");
    state.notifier.notify(Notification::UserRejected {
        username: existing.username.clone(),
        email: existing.email,
    });

    Ok(ApiResponse::success(
        format!("User {} rejected and removed", existing.username),
        RejectedUser {
            id: existing.id,
            username: existing.username,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    caller: &Caller,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    caller.require_admin()?;

    let mut condition = Condition::all();
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
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    caller.require_admin()?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Order::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order found", order, Some(Meta::empty())))
}

/// Approves a pending order in one transaction: conditional stock decrement,
/// status change, monthly report upsert and a consumption record.
pub async fn approve_order(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDecision>> {
    let admin = caller.require_admin()?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, id).await?;
    let status = match order_transition(order.status, Decision::Approve) {
        Transition::Apply(status) => status,
        Transition::AlreadyFinal(current) => return Ok(unchanged(order, current)),
    };

    let product = decrement_stock(&txn, order.product_id, order.quantity).await?;

    let now = Utc::now();
    let mut active: OrderActive = order.into();
    active.status = Set(status);
    active.approved_at = Set(Some(now.into()));
    let order = active.update(&txn).await?;

    // A second approval for the same user and product in one month accumulates.
    let report = ReportActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(order.user_id),
        month: Set(report_month(now)),
        product_id: Set(order.product_id),
        consumed: Set(order.quantity),
        remaining: Set(product.quantity),
        created_at: NotSet,
    };
    Reports::insert(report)
        .on_conflict(
            OnConflict::columns([ReportCol::UserId, ReportCol::Month, ReportCol::ProductId])
                .value(
                    ReportCol::Consumed,
                    Expr::col((Reports, ReportCol::Consumed)).add(order.quantity),
                )
                .update_column(ReportCol::Remaining)
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;

    insert_consumption(&txn, order.user_id, order.product_id, order.quantity).await?;

    let owner = Users::find_by_id(order.user_id).one(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        product_id = %product.id,
        quantity = order.quantity,
        remaining = product.quantity,
        "order approved"
    );
    audit::record(
        &state.pool,
        Some(admin.user_id),
        "order_approve",
        "orders",
        serde_json::json!({ "order_id": order.id, "quantity": order.quantity }),
    )
    .await;
    if let Some(owner) = owner {
        state.notifier.notify(Notification::OrderApproved {
            order_id: order.id,
            username: owner.username,
            email: owner.email,
            product_name: product.name,
            quantity: order.quantity,
        });
    }

    Ok(ApiResponse::success(
        format!("Order {} approved", order.id),
        OrderDecision {
            order: Order::from(order),
            applied: true,
        },
        Some(Meta::empty()),
    ))
}

pub async fn reject_order(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDecision>> {
    let admin = caller.require_admin()?;
    let txn = state.orm.begin().await?;

    let order = lock_order(&txn, id).await?;
    let status = match order_transition(order.status, Decision::Reject) {
        Transition::Apply(status) => status,
        Transition::AlreadyFinal(current) => return Ok(unchanged(order, current)),
    };

    let mut active: OrderActive = order.into();
    active.status = Set(status);
    let order = active.update(&txn).await?;

    let owner = Users::find_by_id(order.user_id).one(&txn).await?;
    let product = Products::find_by_id(order.product_id).one(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order rejected");
    audit::record(
        &state.pool,
        Some(admin.user_id),
        "order_reject",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;
    if let (Some(owner), Some(product)) = (owner, product) {
        state.notifier.notify(Notification::OrderRejected {
            order_id: order.id,
            username: owner.username,
            email: owner.email,
            product_name: product.name,
            quantity: order.quantity,
        });
    }

    Ok(ApiResponse::success(
        format!("Order {} rejected", order.id),
        OrderDecision {
            order: Order::from(order),
            applied: true,
        },
        Some(Meta::empty()),
    ))
}

/// Manual consumption entry: takes stock out and logs it without touching reports.
pub async fn record_consumption(
    state: &AppState,
    caller: &Caller,
    payload: RecordConsumptionRequest,
) -> AppResult<ApiResponse<ConsumptionResult>> {
    let admin = caller.require_admin()?;
    if payload.quantity <= 0 {
        return Err(AppError::field(
            "quantity",
            "Quantity must be greater than 0",
        ));
    }

    let txn = state.orm.begin().await?;
    let consumer = Users::find_by_id(payload.user_id).one(&txn).await?;
    if consumer.is_none() {
        return Err(AppError::NotFound);
    }

    let product = decrement_stock(&txn, payload.product_id, payload.quantity).await?;
    let record =
        insert_consumption(&txn, payload.user_id, payload.product_id, payload.quantity).await?;

    txn.commit().await?;

    tracing::info!(
        user_id = %payload.user_id,
        product_id = %payload.product_id,
        quantity = payload.quantity,
        remaining = product.quantity,
        "consumption recorded"
    );
    audit::record(
        &state.pool,
        Some(admin.user_id),
        "consumption_record",
        "consumption_records",
        serde_json::json!({ "record_id": record.id, "quantity": record.quantity }),
    )
    .await;

    Ok(ApiResponse::success(
        "Consumption recorded",
        ConsumptionResult {
            record: ConsumptionRecord::from(record),
            product: Product::from(product),
        },
        Some(Meta::empty()),
    ))
}

pub async fn dashboard(state: &AppState, caller: &Caller) -> AppResult<ApiResponse<Dashboard>> {
    caller.require_admin()?;

    let users: Vec<User> = Users::find()
        .filter(UserCol::IsAdmin.eq(false))
        .order_by_asc(UserCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    let pending_users = users.iter().filter(|u| !u.is_approved).cloned().collect();

    let orders = sqlx::query_as::<_, OrderSummary>(
        r#"
        SELECT o.id, o.user_id, u.username, o.product_id, p.name AS product_name,
               o.quantity, o.status, o.created_at, o.approved_at
        FROM orders o
        JOIN users u ON u.id = o.user_id
        JOIN products p ON p.id = o.product_id
        ORDER BY o.created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let products = Products::find()
        .order_by_asc(ProdCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let reports = Reports::find()
        .order_by_desc(ReportCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Report::from)
        .collect();

    let consumption_records = ConsumptionRecords::find()
        .order_by_desc(ConsumptionCol::ConsumedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ConsumptionRecord::from)
        .collect();

    let consumption_totals = sqlx::query_as::<_, ConsumptionTotal>(
        r#"
        SELECT p.id AS product_id, p.name AS product_name,
               u.id AS user_id, u.username,
               SUM(c.quantity)::BIGINT AS total_consumed
        FROM consumption_records c
        JOIN products p ON p.id = c.product_id
        JOIN users u ON u.id = c.user_id
        GROUP BY p.id, p.name, u.id, u.username
        ORDER BY total_consumed DESC, p.name, u.username
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let recent_activity = audit::recent(&state.orm, RECENT_ACTIVITY_LIMIT).await?;

    let data = Dashboard {
        current_month: Utc::now().format("%B %Y").to_string(),
        pending_users,
        users,
        orders,
        products,
        reports,
        consumption_records,
        consumption_totals,
        recent_activity,
    };
    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}

async fn lock_order(txn: &DatabaseTransaction, id: Uuid) -> AppResult<OrderModel> {
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)
}

fn unchanged(order: OrderModel, current: OrderStatus) -> ApiResponse<OrderDecision> {
    tracing::warn!(order_id = %order.id, status = %current, "order is not pending; nothing changed");
    ApiResponse::success(
        format!("Order {} is not pending (status: {current})", order.id),
        OrderDecision {
            order: Order::from(order),
            applied: false,
        },
        Some(Meta::empty()),
    )
}

/// `quantity = quantity - n WHERE quantity >= n`, so stock can never go negative
/// even when two approvals race for the same product.
async fn decrement_stock(
    txn: &DatabaseTransaction,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<ProductModel> {
    let result = Products::update_many()
        .col_expr(ProdCol::Quantity, Expr::col(ProdCol::Quantity).sub(quantity))
        .filter(ProdCol::Id.eq(product_id))
        .filter(ProdCol::Quantity.gte(quantity))
        .exec(txn)
        .await?;

    let product = Products::find_by_id(product_id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if result.rows_affected == 0 {
        tracing::warn!(
            product_id = %product_id,
            requested = quantity,
            available = product.quantity,
            "stock decrement refused"
        );
        return Err(AppError::InsufficientStock {
            product: product.name,
            requested: quantity,
            available: product.quantity,
        });
    }

    Ok(product)
}

async fn insert_consumption(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<ConsumptionModel> {
    let record = ConsumptionActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        consumed_at: NotSet,
    }
    .insert(txn)
    .await?;
    Ok(record)
}
