use std::net::{IpAddr, SocketAddr};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inventory_orders_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    notifier::build_notifier,
    routes::create_app,
    state::{AppState, AuthSettings},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,inventory_orders_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    let orm = create_orm_conn(&pool);

    let notifier = build_notifier(config.notifier);
    let auth = AuthSettings {
        jwt_secret: config.jwt_secret.as_str().into(),
        token_ttl_hours: config.token_ttl_hours,
    };
    let state = AppState::new(pool, orm, auth, notifier);
    let app = create_app(state);

    let addr = SocketAddr::from((config.host.parse::<IpAddr>()?, config.port));
    tracing::info!(%addr, notifier = ?config.notifier, "listening");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
