use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{ConsumptionResult, Dashboard, RecordConsumptionRequest, RejectedUser},
        orders::{OrderDecision, OrderList, OrderListQuery},
    },
    error::AppResult,
    middleware::auth::Caller,
    models::{Order, User},
    response::ApiResponse,
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users/{id}/approve", post(approve_user))
        .route("/users/{id}/reject", post(reject_user))
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/approve", post(approve_order))
        .route("/orders/{id}/reject", post(reject_order))
        .route("/consumption", post(record_consumption))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Users, orders, stock, reports and recent activity", body = ApiResponse<Dashboard>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<ApiResponse<Dashboard>>> {
    let resp = admin_service::dashboard(&state, &caller).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User approved and activated", body = ApiResponse<User>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn approve_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::approve_user(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<RejectedUser>),
        (status = 403, description = "Administrator accounts cannot be rejected"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reject_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RejectedUser>>> {
    let resp = admin_service::reject_user(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("status" = Option<String>, Query, description = "pending, approved or rejected")
    ),
    responses(
        (status = 200, description = "All orders, newest first", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &caller, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order detail", body = ApiResponse<Order>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = admin_service::get_order_admin(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order approved, or unchanged when no longer pending", body = ApiResponse<OrderDecision>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Insufficient stock; the order stays pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn approve_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDecision>>> {
    let resp = admin_service::approve_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/orders/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order rejected, or unchanged when no longer pending", body = ApiResponse<OrderDecision>),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reject_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDecision>>> {
    let resp = admin_service::reject_order(&state, &caller, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/consumption",
    request_body = RecordConsumptionRequest,
    responses(
        (status = 201, description = "Consumption recorded and stock decremented", body = ApiResponse<ConsumptionResult>),
        (status = 404, description = "User or product not found"),
        (status = 409, description = "Insufficient stock"),
        (status = 422, description = "Invalid quantity")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn record_consumption(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<RecordConsumptionRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ConsumptionResult>>)> {
    let resp = admin_service::record_consumption(&state, &caller, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
