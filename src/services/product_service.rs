use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    domain::{DEFAULT_CATEGORY, category_filter, name_search_pattern, validate_product_fields},
    dto::products::{
        CatalogQuery, CreateProductRequest, DeletedProduct, ProductList, UpdateProductRequest,
    },
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::Caller,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    caller: &Caller,
    query: CatalogQuery,
) -> AppResult<ApiResponse<ProductList>> {
    caller.require_member()?;
    let mut condition = Condition::all();

    if let Some(category) = category_filter(query.category.as_deref()) {
        condition = condition.add(Column::Category.eq(category));
    }

    if let Some(pattern) = query.q.as_deref().and_then(name_search_pattern) {
        condition = condition.add(Expr::col(Column::Name).ilike(pattern));
    }

    let items: Vec<Product> = Products::find()
        .filter(condition)
        .order_by_asc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    caller.require_member()?;
    let result = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from);
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success("Product", result, None))
}

pub async fn create_product(
    state: &AppState,
    caller: &Caller,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let admin = caller.require_admin()?;
    validate_product_fields(
        Some(&payload.name),
        Some(payload.quantity),
        payload.category.as_deref(),
    )?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(non_blank(payload.description)),
        quantity: Set(payload.quantity),
        image: Set(non_blank(payload.image)),
        category: Set(payload
            .category
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string())),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    tracing::info!(product_id = %product.id, name = %product.name, "product created");
    audit::record(
        &state.pool,
        Some(admin.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let admin = caller.require_admin()?;
    validate_product_fields(
        payload.name.as_deref(),
        payload.quantity,
        payload.category.as_deref(),
    )?;

    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if payload.description.is_some() {
        active.description = Set(non_blank(payload.description));
    }
    if let Some(quantity) = payload.quantity {
        active.quantity = Set(quantity);
    }
    if payload.image.is_some() {
        active.image = Set(non_blank(payload.image));
    }
    if let Some(category) = payload.category {
        active.category = Set(category.trim().to_string());
    }

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(admin.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Cart lines, orders, reports and consumption records of the product go with it.
pub async fn delete_product(
    state: &AppState,
    caller: &Caller,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedProduct>> {
    let admin = caller.require_admin()?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(product_id = %id, "product deleted");
    audit::record(
        &state.pool,
        Some(admin.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        DeletedProduct { id },
        Some(Meta::empty()),
    ))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
