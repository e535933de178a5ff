use inventory_orders_api::{
    config::AppConfig,
    db::{DbPool, create_pool, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@example.com", "admin123", true).await?;
    let user_id = ensure_user(&pool, "nurse", "nurse@example.com", "nurse123", false).await?;
    seed_products(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

/// Upserts an approved, active account. Seeded accounts skip the approval queue.
async fn ensure_user(
    pool: &DbPool,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, is_admin, is_approved, is_active)
        VALUES ($1, $2, $3, $4, $5, TRUE, TRUE)
        ON CONFLICT (username) DO UPDATE
            SET is_admin = EXCLUDED.is_admin, is_approved = TRUE, is_active = TRUE
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(is_admin)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {username} (admin={is_admin})");
    Ok(user_id)
}

async fn seed_products(pool: &DbPool) -> anyhow::Result<()> {
    let products = vec![
        ("Surgical Gloves (box)", "Nitrile, powder free, size M", 120, "medical_tools"),
        ("Syringe 5ml", "Sterile single-use syringe", 400, "medical_tools"),
        ("Gauze Pads", "10x10cm sterile pads", 250, "medical_tools"),
        ("Disinfectant 1L", "Surface disinfectant concentrate", 40, "cleaning"),
        ("Paracetamol 500mg", "Pack of 20 tablets", 90, "medication"),
    ];

    for (name, desc, quantity, category) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, quantity, category)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE name = $2)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(quantity)
        .bind(category)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
