use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    domain::{LineUpdate, check_add_quantity, last_quantity_per_line, plan_line_update},
    dto::cart::{
        AddToCartRequest, CartItemDto, CartList, CartUpdateSummary, LineRejection, RemovedLine,
        UpdateCartRequest,
    },
    entity::{
        Products,
        cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
    },
    error::{AppError, AppResult},
    middleware::auth::Caller,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: Option<String>,
    stock: i32,
    image: Option<String>,
    category: String,
    created_at: DateTime<Utc>,
}

pub async fn list_cart(state: &AppState, caller: &Caller) -> AppResult<ApiResponse<CartList>> {
    let user = caller.require_approved_user()?;
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.name, p.description, p.quantity AS stock,
               p.image, p.category, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at ASC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<CartItemDto> = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.cart_id,
            product: Product {
                id: row.product_id,
                name: row.name,
                description: row.description,
                quantity: row.stock,
                image: row.image,
                category: row.category,
                created_at: row.created_at,
            },
            quantity: row.quantity,
        })
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

/// Adds to the caller's line for the product, creating it on first add.
pub async fn add_to_cart(
    state: &AppState,
    caller: &Caller,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    let user = caller.require_approved_user()?;

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    check_add_quantity(payload.quantity, product.quantity)?;

    let cart_item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (id, user_id, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
        RETURNING id, user_id, product_id, quantity, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .fetch_one(&state.pool)
    .await?;

    tracing::debug!(
        user_id = %user.user_id,
        product_id = %payload.product_id,
        added = payload.quantity,
        line_quantity = cart_item.quantity,
        "cart line merged"
    );
    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Added {} to cart", product.name),
        cart_item,
        Some(Meta::empty()),
    ))
}

/// Applies each requested quantity independently; rejected lines stay unchanged.
/// A line listed more than once takes its last quantity.
pub async fn update_cart(
    state: &AppState,
    caller: &Caller,
    payload: UpdateCartRequest,
) -> AppResult<ApiResponse<CartUpdateSummary>> {
    let user = caller.require_approved_user()?;
    let txn = state.orm.begin().await?;

    let mut lines: HashMap<Uuid, _> = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .find_also_related(Products)
        .all(&txn)
        .await?
        .into_iter()
        .map(|(line, product)| (line.id, (line, product)))
        .collect();

    let requested: Vec<(Uuid, i32)> = payload
        .lines
        .iter()
        .map(|update| (update.line_id, update.quantity))
        .collect();

    let mut summary = CartUpdateSummary::default();
    for (line_id, quantity) in last_quantity_per_line(&requested) {
        let Some((line, Some(product))) = lines.remove(&line_id) else {
            summary.rejected.push(LineRejection {
                line_id,
                requested: quantity,
                reason: "Cart line not found".into(),
            });
            continue;
        };

        match plan_line_update(quantity, product.quantity) {
            LineUpdate::Set(quantity) => {
                let mut active: CartActive = line.into();
                active.quantity = Set(quantity);
                let updated = active.update(&txn).await?;
                summary.updated.push(CartItem::from(updated));
            }
            LineUpdate::Remove => {
                CartItems::delete_by_id(line.id).exec(&txn).await?;
                summary.removed.push(line.id);
            }
            LineUpdate::Reject { available } => {
                summary.rejected.push(LineRejection {
                    line_id: line.id,
                    requested: quantity,
                    reason: format!(
                        "Requested quantity for {} is not available ({} available)",
                        product.name, available
                    ),
                });
            }
        }
    }

    txn.commit().await?;

    let message = if summary.rejected.is_empty() {
        "Cart updated"
    } else {
        tracing::info!(
            user_id = %user.user_id,
            rejected = summary.rejected.len(),
            "cart update partially rejected"
        );
        "Cart updated with errors"
    };

    Ok(ApiResponse::success(message, summary, Some(Meta::empty())))
}

pub async fn remove_line(
    state: &AppState,
    caller: &Caller,
    line_id: Uuid,
) -> AppResult<ApiResponse<RemovedLine>> {
    let user = caller.require_approved_user()?;
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(line_id)
        .bind(user.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "line_id": line_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        RemovedLine { line_id },
        Some(Meta::empty()),
    ))
}
