use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{ConsumptionResult, ConsumptionTotal, Dashboard, OrderSummary, RecordConsumptionRequest, RejectedUser},
        auth::{LoginRequest, LoginResponse, LogoutResponse, RegisterRequest},
        cart::{AddToCartRequest, CartItemDto, CartList, CartLineUpdate, CartUpdateSummary, LineRejection, RemovedLine, UpdateCartRequest},
        orders::{CheckoutResult, OrderDecision, OrderList},
        products::{CreateProductRequest, DeletedProduct, ProductList, UpdateProductRequest},
    },
    entity::orders::OrderStatus,
    error::FieldError,
    middleware::auth::Role,
    models::{AuditEntry, CartItem, ConsumptionRecord, Order, Product, Report, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart,
        cart::remove_from_cart,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        admin::dashboard,
        admin::approve_user,
        admin::reject_user,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::approve_order,
        admin::reject_order,
        admin::record_consumption
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            CartItem,
            Order,
            OrderStatus,
            Report,
            ConsumptionRecord,
            AuditEntry,
            FieldError,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            LogoutResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            DeletedProduct,
            AddToCartRequest,
            UpdateCartRequest,
            CartLineUpdate,
            CartList,
            CartItemDto,
            CartUpdateSummary,
            LineRejection,
            RemovedLine,
            OrderList,
            CheckoutResult,
            OrderDecision,
            RecordConsumptionRequest,
            ConsumptionResult,
            RejectedUser,
            OrderSummary,
            ConsumptionTotal,
            Dashboard,
            Meta,
            ApiResponse<User>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderList>,
            ApiResponse<OrderDecision>,
            ApiResponse<Dashboard>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and session endpoints"),
        (name = "Products", description = "Catalog and product management"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and own orders"),
        (name = "Admin", description = "Approvals, consumption entry and dashboard"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
