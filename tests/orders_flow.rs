//! Database-backed flows. Each test creates its own uniquely named users and
//! products, so the tests can share one database and run concurrently.

use std::sync::{Arc, Mutex};

use inventory_orders_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        admin::RecordConsumptionRequest,
        auth::{LoginRequest, RegisterRequest},
        cart::{AddToCartRequest, CartLineUpdate, UpdateCartRequest},
        orders::OrderListQuery,
        products::{CatalogQuery, CreateProductRequest, UpdateProductRequest},
    },
    entity::{
        CartItems, ConsumptionRecords, Orders, Products, Reports, Users,
        cart_items::Column as CartCol,
        consumption_records::Column as ConsumptionCol,
        orders::{Column as OrderCol, OrderStatus},
        products::{self, ActiveModel as ProductActive},
        reports::Column as ReportCol,
        users::{self, ActiveModel as UserActive, Column as UserCol},
    },
    error::AppError,
    middleware::auth::Caller,
    notifier::{Notification, Notifier},
    services::{admin_service, auth_service, cart_service, order_service, product_service},
    state::{AppState, AuthSettings},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}

impl RecordingNotifier {
    fn subjects(&self) -> Vec<&'static str> {
        self.sent.lock().unwrap().iter().map(|n| n.subject()).collect()
    }
}

fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(database_url: &str, notifier: Arc<RecordingNotifier>) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(&pool);
    let auth = AuthSettings {
        jwt_secret: Arc::from("flow-test-secret"),
        token_ttl_hours: 1,
    };
    Ok(AppState::new(pool, orm, auth, notifier))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn create_user(
    state: &AppState,
    approved: bool,
    admin: bool,
) -> anyhow::Result<(users::Model, Caller)> {
    let username = unique("user");
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{username}@example.com")),
        username: Set(username),
        password_hash: Set(auth_service::hash_password("secret123")?),
        is_admin: Set(admin),
        is_approved: Set(approved),
        is_active: Set(approved),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    let caller = Caller::resolve(Some(&user));
    Ok((user, caller))
}

async fn create_product(state: &AppState, quantity: i32) -> anyhow::Result<products::Model> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(unique("Bandage")),
        description: Set(Some("Elastic bandage".into())),
        quantity: Set(quantity),
        image: Set(None),
        category: Set("medical_tools".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product)
}

async fn stock_of(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    Ok(product.quantity)
}

async fn order_one(
    state: &AppState,
    caller: &Caller,
    product_id: Uuid,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    cart_service::add_to_cart(state, caller, AddToCartRequest { product_id, quantity }).await?;
    let result = order_service::checkout(state, caller).await?;
    let orders = result.data.expect("checkout data").orders;
    assert_eq!(orders.len(), 1);
    Ok(orders[0].id)
}

#[tokio::test]
async fn second_approval_fails_when_stock_ran_out() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let notifier = Arc::new(RecordingNotifier::default());
    let state = setup_state(&url, notifier.clone()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (_, alice) = create_user(&state, true, false).await?;
    let (_, bob) = create_user(&state, true, false).await?;
    let product = create_product(&state, 10).await?;

    let order_a = order_one(&state, &alice, product.id, 6).await?;
    let order_b = order_one(&state, &bob, product.id, 6).await?;

    // Checkout only validates stock; nothing is reserved yet.
    assert_eq!(stock_of(&state, product.id).await?, 10);

    let approved = admin_service::approve_order(&state, &admin, order_a).await?;
    let decision = approved.data.expect("decision");
    assert!(decision.applied);
    assert_eq!(decision.order.status, OrderStatus::Approved);
    assert!(decision.order.approved_at.is_some());
    assert_eq!(stock_of(&state, product.id).await?, 4);

    match admin_service::approve_order(&state, &admin, order_b).await {
        Err(err @ AppError::InsufficientStock { .. }) => {
            assert!(err.to_string().contains("quantity 6 > available 4"), "{err}");
        }
        other => panic!("expected insufficient stock, got {other:?}"),
    }
    assert_eq!(stock_of(&state, product.id).await?, 4);

    let still_pending = admin_service::get_order_admin(&state, &admin, order_b).await?;
    assert_eq!(still_pending.data.expect("order").status, OrderStatus::Pending);

    assert_eq!(notifier.subjects(), vec!["Your order has been approved"]);
    Ok(())
}

#[tokio::test]
async fn decisions_on_final_orders_change_nothing() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (_, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 5).await?;

    let order_id = order_one(&state, &user, product.id, 3).await?;
    admin_service::reject_order(&state, &admin, order_id).await?;

    let again = admin_service::approve_order(&state, &admin, order_id).await?;
    let decision = again.data.expect("decision");
    assert!(!decision.applied);
    assert_eq!(decision.order.status, OrderStatus::Rejected);
    assert_eq!(stock_of(&state, product.id).await?, 5);

    let listed = order_service::list_orders(
        &state,
        &user,
        OrderListQuery {
            status: Some(OrderStatus::Rejected),
        },
    )
    .await?;
    assert_eq!(listed.data.expect("orders").items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn approvals_accumulate_into_monthly_report() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (user_model, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 20).await?;

    let first = order_one(&state, &user, product.id, 2).await?;
    let second = order_one(&state, &user, product.id, 3).await?;
    admin_service::approve_order(&state, &admin, first).await?;
    admin_service::approve_order(&state, &admin, second).await?;

    let reports = Reports::find()
        .filter(ReportCol::UserId.eq(user_model.id))
        .filter(ReportCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].consumed, 5);
    assert_eq!(reports[0].remaining, 15);

    let dashboard = admin_service::dashboard(&state, &admin).await?.data.expect("dashboard");
    assert!(
        dashboard
            .consumption_totals
            .iter()
            .any(|t| t.product_id == product.id && t.user_id == user_model.id && t.total_consumed == 5)
    );
    Ok(())
}

#[tokio::test]
async fn cart_merges_and_checkout_is_all_or_nothing() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, user) = create_user(&state, true, false).await?;
    let plenty = create_product(&state, 10).await?;
    let scarce = create_product(&state, 3).await?;

    match order_service::checkout(&state, &user).await {
        Err(AppError::BadRequest(msg)) => assert_eq!(msg, "Cart is empty"),
        other => panic!("expected empty cart error, got {other:?}"),
    }

    for _ in 0..2 {
        cart_service::add_to_cart(
            &state,
            &user,
            AddToCartRequest {
                product_id: plenty.id,
                quantity: 2,
            },
        )
        .await?;
    }
    let scarce_line = cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: scarce.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("line");

    let cart = cart_service::list_cart(&state, &user).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 2);
    let merged = cart.items.iter().find(|i| i.product.id == plenty.id).expect("merged line");
    assert_eq!(merged.quantity, 4);

    // Stock drops below the cart quantity before checkout.
    let mut active: ProductActive = Products::find_by_id(scarce.id)
        .one(&state.orm)
        .await?
        .expect("product")
        .into();
    active.quantity = Set(1);
    active.update(&state.orm).await?;

    assert!(matches!(
        order_service::checkout(&state, &user).await,
        Err(AppError::InsufficientStock { .. })
    ));
    let none = order_service::list_orders(&state, &user, OrderListQuery::default()).await?;
    assert!(none.data.expect("orders").items.is_empty());

    let summary = cart_service::update_cart(
        &state,
        &user,
        UpdateCartRequest {
            lines: vec![
                CartLineUpdate {
                    line_id: scarce_line.id,
                    quantity: 0,
                },
                CartLineUpdate {
                    line_id: merged.id,
                    quantity: 50,
                },
            ],
        },
    )
    .await?;
    assert_eq!(summary.message, "Cart updated with errors");
    let summary = summary.data.expect("summary");
    assert_eq!(summary.removed, vec![scarce_line.id]);
    assert_eq!(summary.rejected.len(), 1);

    let placed = order_service::checkout(&state, &user).await?.data.expect("orders");
    assert_eq!(placed.orders.len(), 1);
    assert_eq!(placed.orders[0].quantity, 4);
    assert_eq!(placed.orders[0].status, OrderStatus::Pending);

    let empty = cart_service::list_cart(&state, &user).await?.data.expect("cart");
    assert!(empty.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn registration_approval_and_rejection() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let notifier = Arc::new(RecordingNotifier::default());
    let state = setup_state(&url, notifier.clone()).await?;
    let (_, admin) = create_user(&state, true, true).await?;

    let username = unique("nurse");
    let register = |username: &str, email: &str| RegisterRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: "longenough1".into(),
        confirm_password: "longenough1".into(),
    };

    let email = format!("{username}@example.com");
    let created = auth_service::register_user(&state, register(username.as_str(), email.as_str()))
        .await?
        .data
        .expect("user");
    assert!(!created.is_approved);

    match auth_service::register_user(&state, register(username.as_str(), "other@example.com")).await {
        Err(AppError::Validation(fields)) => {
            assert!(fields.iter().any(|f| f.field == "username"));
        }
        other => panic!("expected duplicate username error, got {other:?}"),
    }

    let login = || LoginRequest {
        username: username.clone(),
        password: "longenough1".into(),
    };
    assert!(matches!(
        auth_service::login_user(&state, login()).await,
        Err(AppError::Forbidden(_))
    ));

    admin_service::approve_user(&state, &admin, created.id).await?;
    let session = auth_service::login_user(&state, login()).await?.data.expect("session");
    assert!(session.token.starts_with("Bearer "));
    assert_eq!(session.redirect_to, "/api/products");

    admin_service::reject_user(&state, &admin, created.id).await?;
    assert!(matches!(
        auth_service::login_user(&state, login()).await,
        Err(AppError::Unauthorized(_))
    ));

    assert_eq!(
        notifier.subjects(),
        vec!["Your account has been approved", "Your account request was rejected"]
    );
    Ok(())
}

#[tokio::test]
async fn manual_consumption_decrements_stock() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (consumer, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 7).await?;

    let result = admin_service::record_consumption(
        &state,
        &admin,
        RecordConsumptionRequest {
            user_id: consumer.id,
            product_id: product.id,
            quantity: 5,
        },
    )
    .await?
    .data
    .expect("consumption");
    assert_eq!(result.product.quantity, 2);
    assert_eq!(result.record.quantity, 5);

    let too_much = admin_service::record_consumption(
        &state,
        &admin,
        RecordConsumptionRequest {
            user_id: consumer.id,
            product_id: product.id,
            quantity: 3,
        },
    )
    .await;
    assert!(matches!(too_much, Err(AppError::InsufficientStock { .. })));
    assert_eq!(stock_of(&state, product.id).await?, 2);

    let forbidden = admin_service::record_consumption(
        &state,
        &user,
        RecordConsumptionRequest {
            user_id: consumer.id,
            product_id: product.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_approvals_never_oversell() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (_, alice) = create_user(&state, true, false).await?;
    let (_, bob) = create_user(&state, true, false).await?;
    let product = create_product(&state, 10).await?;

    let order_a = order_one(&state, &alice, product.id, 6).await?;
    let order_b = order_one(&state, &bob, product.id, 6).await?;

    let (first, second) = tokio::join!(
        admin_service::approve_order(&state, &admin, order_a),
        admin_service::approve_order(&state, &admin, order_b),
    );

    let outcomes = [first, second];
    let approved = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(approved, 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::InsufficientStock { requested: 6, available: 4, .. })))
    );
    assert_eq!(stock_of(&state, product.id).await?, 4);

    let pending = Orders::find()
        .filter(OrderCol::ProductId.eq(product.id))
        .filter(OrderCol::Status.eq(OrderStatus::Pending))
        .count(&state.orm)
        .await?;
    assert_eq!(pending, 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_approvals_share_one_report_row() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (user_model, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 100).await?;

    let first = order_one(&state, &user, product.id, 2).await?;
    let second = order_one(&state, &user, product.id, 3).await?;

    let (a, b) = tokio::join!(
        admin_service::approve_order(&state, &admin, first),
        admin_service::approve_order(&state, &admin, second),
    );
    a?;
    b?;

    let reports = Reports::find()
        .filter(ReportCol::UserId.eq(user_model.id))
        .filter(ReportCol::ProductId.eq(product.id))
        .all(&state.orm)
        .await?;
    assert_eq!(reports.len(), 1);
    assert_eq!((reports[0].consumed, reports[0].remaining), (5, 95));
    assert_eq!(stock_of(&state, product.id).await?, 95);
    Ok(())
}

#[tokio::test]
async fn deleting_product_removes_dependent_rows() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (consumer, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 20).await?;

    let order_id = order_one(&state, &user, product.id, 2).await?;
    admin_service::approve_order(&state, &admin, order_id).await?;
    order_one(&state, &user, product.id, 1).await?;
    cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await?;
    admin_service::record_consumption(
        &state,
        &admin,
        RecordConsumptionRequest {
            user_id: consumer.id,
            product_id: product.id,
            quantity: 1,
        },
    )
    .await?;

    let deleted = product_service::delete_product(&state, &admin, product.id)
        .await?
        .data
        .expect("deleted");
    assert_eq!(deleted.id, product.id);

    let cart_lines = CartItems::find()
        .filter(CartCol::ProductId.eq(product.id))
        .count(&state.orm)
        .await?;
    let orders = Orders::find()
        .filter(OrderCol::ProductId.eq(product.id))
        .count(&state.orm)
        .await?;
    let reports = Reports::find()
        .filter(ReportCol::ProductId.eq(product.id))
        .count(&state.orm)
        .await?;
    let records = ConsumptionRecords::find()
        .filter(ConsumptionCol::ProductId.eq(product.id))
        .count(&state.orm)
        .await?;
    assert_eq!((cart_lines, orders, reports, records), (0, 0, 0, 0));

    assert!(matches!(
        product_service::delete_product(&state, &admin, product.id).await,
        Err(AppError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn catalog_combines_category_and_name_search() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, admin) = create_user(&state, true, true).await?;
    let (_, user) = create_user(&state, true, false).await?;
    let token = unique("lot");
    let ward = unique("ward");
    let clinic = unique("clinic");

    for (name, category) in [
        (format!("{token} Gauze 10% pack"), ward.as_str()),
        (format!("{token} Gauze roll"), ward.as_str()),
        (format!("{token} Gauze swab"), clinic.as_str()),
    ] {
        product_service::create_product(
            &state,
            &admin,
            CreateProductRequest {
                name,
                description: None,
                quantity: 5,
                image: None,
                category: Some(category.to_string()),
            },
        )
        .await?;
    }

    let search = |category: Option<&str>, q: Option<&str>| CatalogQuery {
        category: category.map(str::to_string),
        q: q.map(str::to_string),
    };

    let cases = [
        (search(Some(ward.as_str()), Some("gauze")), 2),
        (search(Some(ward.as_str()), Some("%")), 1),
        (search(Some(clinic.as_str()), Some(token.as_str())), 1),
        (search(Some("all"), Some(token.to_uppercase().as_str())), 3),
        (search(None, Some(format!("{token} gauze r").as_str())), 1),
    ];
    for (query, expected) in cases {
        let resp = product_service::list_products(&state, &user, query).await?;
        assert_eq!(resp.meta.as_ref().and_then(|m| m.total), Some(expected));

        let body = serde_json::to_value(&resp)?;
        let items = body["data"]["items"].as_array().expect("items array");
        assert_eq!(items.len() as i64, expected);
    }
    Ok(())
}

#[tokio::test]
async fn product_writes_report_field_errors() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;
    let (_, admin) = create_user(&state, true, true).await?;
    let (_, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 4).await?;

    match product_service::create_product(
        &state,
        &admin,
        CreateProductRequest {
            name: "   ".into(),
            description: None,
            quantity: -1,
            image: None,
            category: None,
        },
    )
    .await
    {
        Err(AppError::Validation(fields)) => {
            let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, vec!["name", "quantity"]);
        }
        other => panic!("expected field errors, got {other:?}"),
    }

    match product_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            category: Some(String::new()),
            ..Default::default()
        },
    )
    .await
    {
        Err(AppError::Validation(fields)) => assert_eq!(fields[0].field, "category"),
        other => panic!("expected category error, got {other:?}"),
    }

    let renamed = product_service::update_product(
        &state,
        &admin,
        product.id,
        UpdateProductRequest {
            quantity: Some(9),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(renamed.quantity, 9);
    assert_eq!(renamed.name, product.name);

    assert!(matches!(
        product_service::update_product(
            &state,
            &user,
            product.id,
            UpdateProductRequest::default()
        )
        .await,
        Err(AppError::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn duplicate_email_is_a_field_error() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let first = unique("medic");
    let second = unique("medic");
    let email = format!("{first}@example.com");
    let register = |username: &str| RegisterRequest {
        username: username.to_string(),
        email: email.clone(),
        password: "longenough1".into(),
        confirm_password: "longenough1".into(),
    };

    auth_service::register_user(&state, register(first.as_str())).await?;
    match auth_service::register_user(&state, register(second.as_str())).await {
        Err(AppError::Validation(fields)) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "email");
        }
        other => panic!("expected duplicate email error, got {other:?}"),
    }

    let created = Users::find()
        .filter(UserCol::Username.eq(second.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(created, 0);
    Ok(())
}

#[tokio::test]
async fn repeated_cart_line_takes_last_quantity() -> anyhow::Result<()> {
    let Some(url) = database_url() else { return Ok(()) };
    let state = setup_state(&url, Arc::default()).await?;

    let (_, user) = create_user(&state, true, false).await?;
    let product = create_product(&state, 10).await?;
    let line = cart_service::add_to_cart(
        &state,
        &user,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("line");

    let resp = cart_service::update_cart(
        &state,
        &user,
        UpdateCartRequest {
            lines: vec![
                CartLineUpdate {
                    line_id: line.id,
                    quantity: 5,
                },
                CartLineUpdate {
                    line_id: line.id,
                    quantity: 3,
                },
            ],
        },
    )
    .await?;
    assert_eq!(resp.message, "Cart updated");
    let summary = resp.data.expect("summary");
    assert!(summary.rejected.is_empty());
    assert_eq!(summary.updated.len(), 1);
    assert_eq!(summary.updated[0].quantity, 3);
    Ok(())
}
