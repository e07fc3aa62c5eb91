use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum_marketplace_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let pool = create_pool(&config.database_url).await?;

    let buyer_id = ensure_user(&pool, "buyer@example.com", "buyer123", "Demo Buyer", "buyer").await?;
    let seller_id =
        ensure_user(&pool, "seller@example.com", "seller123", "Demo Seller", "seller").await?;

    let store_id = ensure_store(&pool, seller_id).await?;
    seed_products(&pool, store_id).await?;

    println!("Seed completed. Buyer ID: {buyer_id}, Seller ID: {seller_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    name: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, name, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    sqlx::query(
        r#"
        INSERT INTO user_points (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .execute(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_store(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<Uuid> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO stores (id, seller_id, name, address, phone_number, description)
        VALUES ($1, $2, 'Ferris Outfitters', '1 Crab Lane', '010-0000-0000', 'Demo store')
        ON CONFLICT (seller_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(seller_id)
    .fetch_optional(pool)
    .await?;

    let store_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM stores WHERE seller_id = $1")
                .bind(seller_id)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured store {store_id}");
    Ok(store_id)
}

async fn seed_products(pool: &sqlx::PgPool, store_id: Uuid) -> anyhow::Result<()> {
    let products: Vec<(&str, &str, &str, i64, Vec<(&str, i32)>)> = vec![
        (
            "Crustacean Hoodie",
            "Warm hoodie for Rustaceans",
            "tops",
            55_000,
            vec![("S", 10), ("M", 20), ("L", 15)],
        ),
        (
            "Ferris Tee",
            "Soft cotton tee",
            "tops",
            18_000,
            vec![("M", 30), ("L", 30), ("XL", 10)],
        ),
        (
            "Cargo Pants",
            "Pockets for all your crates",
            "bottoms",
            42_000,
            vec![("S", 5), ("M", 8)],
        ),
    ];

    for (name, desc, category, price, stocks) in products {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, store_id, name, description, category, price)
            SELECT $1, $2, $3, $4, $5, $6
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE store_id = $2 AND name = $3)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(store_id)
        .bind(name)
        .bind(desc)
        .bind(category)
        .bind(price)
        .fetch_optional(pool)
        .await?;

        let Some((product_id,)) = row else {
            continue;
        };

        for (size, quantity) in stocks {
            sqlx::query(
                r#"
                INSERT INTO product_stocks (id, product_id, size, quantity)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (product_id, size) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(size)
            .bind(quantity)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}
