use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use storefront_catalog::{Category, Product, ProductFilter, ProductSort};
use storefront_core::{CategoryId, Page, PageRequest, ProductId};

use super::map_db_error;
use super::product_query::{PRODUCT_COLUMNS, count_query, page_query};
use crate::store::{CategoryStore, ProductStats, ProductStore, StockReservation};
use crate::{StoreError, StoreResult};

const CATEGORY_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

/// Categories and products live in one store because products reference
/// categories by foreign key.
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn product_from_row(row: &PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        price_cents: row.try_get("price_cents")?,
        stock: row.try_get("stock")?,
        category_id: row
            .try_get::<Option<Uuid>, _>("category_id")?
            .map(CategoryId::from_uuid),
        image_url: row.try_get("image_url")?,
        featured: row.try_get("featured")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn slug_conflict<'a>(kind: &'static str, slug: &'a str) -> impl FnOnce(sqlx::Error) -> StoreError + 'a {
    move |err| match map_db_error(err) {
        StoreError::Conflict(_) => StoreError::conflict(format!("{kind} slug '{slug}' is taken")),
        other => other,
    }
}

#[async_trait]
impl CategoryStore for PostgresCatalog {
    async fn insert(&self, category: Category) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, slug, description, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(slug_conflict("category", &category.slug))?;
        Ok(())
    }

    async fn update(&self, category: Category) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, slug = $3, description = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(*category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(&category.description)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(slug_conflict("category", &category.slug))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| match map_db_error(e) {
                // ON DELETE RESTRICT from products.category_id
                StoreError::InvalidReference(_) => StoreError::conflict("category still has products"),
                other => other,
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY LOWER(name) ASC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn count(&self) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        Ok(total.max(0) as u64)
    }
}

#[async_trait]
impl ProductStore for PostgresCatalog {
    async fn insert(&self, product: Product) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, slug, description, price_cents, stock,
                category_id, image_url, featured, active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.category_id.map(|id| *id.as_uuid()))
        .bind(&product.image_url)
        .bind(product.featured)
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(slug_conflict("product", &product.slug))?;
        Ok(())
    }

    async fn update(&self, product: Product) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, slug = $3, description = $4, price_cents = $5, stock = $6,
                category_id = $7, image_url = $8, featured = $9, active = $10, updated_at = $11
            WHERE id = $1
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.slug)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.category_id.map(|id| *id.as_uuid()))
        .bind(&product.image_url)
        .bind(product.featured)
        .bind(product.active)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(slug_conflict("product", &product.slug))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: ProductId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn get(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE slug = $1"))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    async fn get_many(&self, ids: &[ProductId]) -> StoreResult<HashMap<ProductId, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(uuids)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| product_from_row(row).map(|p| (p.id, p)))
            .collect()
    }

    async fn search(&self, filter: &ProductFilter, sort: ProductSort, page: PageRequest) -> StoreResult<Page<Product>> {
        let total: i64 = count_query(filter)
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        if total == 0 {
            return Ok(Page::empty(page));
        }
        let rows = page_query(filter, sort, page).build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(product_from_row).collect::<StoreResult<Vec<_>>>()?;
        debug!(total, returned = items.len(), sort = sort.as_str(), "product search");
        Ok(Page::new(items, page, total as u64))
    }

    async fn reserve_stock(&self, lines: &[StockReservation]) -> StoreResult<()> {
        // Fixed lock order keeps concurrent checkouts from deadlocking.
        let mut ordered = lines.to_vec();
        ordered.sort_by_key(|line| line.product_id);

        let mut tx = self.pool.begin().await?;
        for line in &ordered {
            let quantity = i32::try_from(line.quantity)
                .map_err(|_| StoreError::InsufficientStock(line.product_id))?;
            let result = sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - $2, updated_at = NOW()
                WHERE id = $1 AND active = TRUE AND stock >= $2
                "#,
            )
            .bind(*line.product_id.as_uuid())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(StoreError::InsufficientStock(line.product_id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn stats(&self, low_stock_threshold: i32) -> StoreResult<ProductStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS products,
                COUNT(*) FILTER (WHERE active) AS active_products,
                LEAST(
                    COALESCE(SUM(price_cents::NUMERIC * stock) FILTER (WHERE active), 0),
                    9223372036854775807
                )::BIGINT AS inventory_value_cents
            FROM products
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        let low = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE active = TRUE AND stock <= $1 ORDER BY stock ASC, id ASC"
        ))
        .bind(low_stock_threshold)
        .fetch_all(&self.pool)
        .await?;
        Ok(ProductStats {
            products: row.try_get::<i64, _>("products")?.max(0) as u64,
            active_products: row.try_get::<i64, _>("active_products")?.max(0) as u64,
            inventory_value_cents: row.try_get("inventory_value_cents")?,
            low_stock: low.iter().map(product_from_row).collect::<StoreResult<Vec<_>>>()?,
        })
    }
}
