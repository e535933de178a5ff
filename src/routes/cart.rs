use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::cart::{
        AddToCartRequest, CartList, CartUpdateSummary, RemovedLine, UpdateCartRequest,
    },
    error::AppResult,
    middleware::auth::Caller,
    models::CartItem,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart).patch(update_cart))
        .route("/{line_id}", delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines of the current user", body = ApiResponse<CartList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let resp = cart_service::list_cart(&state, &caller).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Line created or quantity accumulated", body = ApiResponse<CartItem>),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Invalid quantity"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::add_to_cart(&state, &caller, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/cart",
    request_body = UpdateCartRequest,
    responses(
        (status = 200, description = "Per-line outcome of the update", body = ApiResponse<CartUpdateSummary>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart(
    State(state): State<AppState>,
    caller: Caller,
    Json(payload): Json<UpdateCartRequest>,
) -> AppResult<Json<ApiResponse<CartUpdateSummary>>> {
    let resp = cart_service::update_cart(&state, &caller, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{line_id}",
    params(
        ("line_id" = Uuid, Path, description = "Cart line ID")
    ),
    responses(
        (status = 200, description = "OK", body = ApiResponse<RemovedLine>),
        (status = 404, description = "Cart line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    caller: Caller,
    Path(line_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RemovedLine>>> {
    let resp = cart_service::remove_line(&state, &caller, line_id).await?;
    Ok(Json(resp))
}
