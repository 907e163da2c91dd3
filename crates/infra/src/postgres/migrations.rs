//! Schema DDL. Every statement is idempotent, so this runs on every boot.

use sqlx::PgPool;
use tracing::info;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            UUID PRIMARY KEY,
        email         TEXT NOT NULL UNIQUE,
        name          TEXT NOT NULL,
        role          TEXT NOT NULL CHECK (role IN ('customer', 'admin')),
        password_hash TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        slug        TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        slug        TEXT NOT NULL UNIQUE,
        description TEXT,
        price_cents BIGINT NOT NULL CHECK (price_cents >= 0),
        stock       INTEGER NOT NULL CHECK (stock >= 0),
        category_id UUID REFERENCES categories (id) ON DELETE RESTRICT,
        image_url   TEXT,
        featured    BOOLEAN NOT NULL DEFAULT FALSE,
        active      BOOLEAN NOT NULL DEFAULT TRUE,
        created_at  TIMESTAMPTZ NOT NULL,
        updated_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS products_category_idx ON products (category_id)",
    "CREATE INDEX IF NOT EXISTS products_created_idx ON products (created_at DESC, id DESC)",
    "CREATE INDEX IF NOT EXISTS products_price_idx ON products (price_cents, id)",
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        user_id    UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
        product_id UUID NOT NULL REFERENCES products (id) ON DELETE CASCADE,
        quantity   INTEGER NOT NULL CHECK (quantity > 0),
        position   INTEGER NOT NULL,
        PRIMARY KEY (user_id, product_id)
    )
    "#,
];

pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(statements = STATEMENTS.len(), "schema migrations applied");
    Ok(())
}
