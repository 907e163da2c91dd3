use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use storefront_cart::{Cart, CartLine};
use storefront_core::{ProductId, UserId};

use super::map_db_error;
use crate::store::CartStore;
use crate::{StoreError, StoreResult};

/// One row per cart line; `position` preserves insertion order.
pub struct PostgresCartStore {
    pool: PgPool,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for PostgresCartStore {
    async fn load(&self, user_id: UserId) -> StoreResult<Cart> {
        let rows = sqlx::query(
            "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY position ASC",
        )
        .bind(*user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut lines = Vec::with_capacity(rows.len());
        for row in &rows {
            let quantity: i32 = row.try_get("quantity")?;
            let quantity = u32::try_from(quantity)
                .map_err(|_| StoreError::Corrupt(format!("cart_items.quantity {quantity}")))?;
            lines.push(CartLine {
                product_id: ProductId::from_uuid(row.try_get::<Uuid, _>("product_id")?),
                quantity,
            });
        }
        Ok(Cart::from_lines(lines))
    }

    async fn save(&self, user_id: UserId, cart: &Cart) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(*user_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        if !cart.is_empty() {
            let mut qb: QueryBuilder<'_, Postgres> =
                QueryBuilder::new("INSERT INTO cart_items (user_id, product_id, quantity, position) ");
            qb.push_values(cart.lines().iter().enumerate(), |mut b, (position, line)| {
                b.push_bind(*user_id.as_uuid())
                    .push_bind(*line.product_id.as_uuid())
                    .push_bind(i32::try_from(line.quantity).unwrap_or(i32::MAX))
                    .push_bind(i32::try_from(position).unwrap_or(i32::MAX));
            });
            qb.build().execute(&mut *tx).await.map_err(map_db_error)?;
        }

        tx.commit().await?;
        Ok(())
    }
}
