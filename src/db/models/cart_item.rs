//! Models mapping to the `cart_item` table. One row per (user, menu item)
//! pair currently in that user's cart.
use sqlx::{query, query_as, PgExecutor};
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

/// A cart row joined with the current state of the menu item it refers to.
#[derive(sqlx::FromRow, Clone)]
pub struct CartItemRow {
    pub menu_item_id: Uuid,
    pub name: String,
    price: i64,
    discount_percent: i16,
    /// Whether the menu item is orderable right now.
    pub available: bool,
    /// Whether the offering service is listed.
    pub listed: bool,
    quantity: i32,
}

const CART_ROW_QUERY: &str = "SELECT cart_item.menu_item_id, menu_item.name, menu_item.price, \
    menu_item.discount_percent, menu_item.available, service.listed, cart_item.quantity \
    FROM cart_item \
    JOIN menu_item ON menu_item.id = cart_item.menu_item_id \
    JOIN service ON service.id = menu_item.service_id \
    WHERE cart_item.user_id = $1 \
    ORDER BY cart_item.added_at, menu_item.name";

impl CartItemRow {
    /// The current price of the item in paise.
    pub fn price(&self) -> u32 {
        u32::try_from(self.price).expect("Price value in database is out of allowed range")
    }
    /// The current discount percentage of the item.
    pub fn discount_percent(&self) -> u8 {
        u8::try_from(self.discount_percent)
            .expect("Discount value in database is out of allowed range")
    }
    /// The quantity of the item in the cart.
    pub fn quantity(&self) -> u32 {
        u32::try_from(self.quantity).expect("Cart quantity in database is out of allowed range")
    }

    /// Every row in a user's cart.
    pub async fn select_for_user(
        user_id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(CART_ROW_QUERY)
            .bind(user_id)
            .fetch_all(db_client)
            .await?)
    }

    /// Every row in a user's cart, locking the cart rows until the enclosing
    /// transaction ends.
    pub async fn select_for_user_locked<'e>(
        user_id: Uuid,
        executor: impl PgExecutor<'e>,
    ) -> Result<Vec<Self>, DatabaseError> {
        let sql = format!("{CART_ROW_QUERY} FOR UPDATE OF cart_item");
        Ok(query_as::<_, Self>(&sql)
            .bind(user_id)
            .fetch_all(executor)
            .await?)
    }
}

/// A raw `cart_item` record.
#[derive(sqlx::FromRow)]
pub struct CartItem {
    user_id: Uuid,
    menu_item_id: Uuid,
    quantity: i32,
}

impl CartItem {
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = i32::try_from(quantity).expect("Cart quantity exceeds i32 range");
    }

    /// Select one line of a user's cart.
    pub async fn select_one(
        user_id: Uuid,
        menu_item_id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "SELECT * FROM cart_item WHERE user_id = $1 AND menu_item_id = $2",
        )
        .bind(user_id)
        .bind(menu_item_id)
        .fetch_optional(db_client)
        .await?)
    }

    /// Add `quantity` of an item to a user's cart, merging with an existing
    /// line. Returns `None`, leaving the cart untouched, if the line would
    /// exceed `max_quantity`.
    pub async fn add(
        user_id: Uuid,
        menu_item_id: Uuid,
        quantity: u32,
        max_quantity: u32,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        Ok(query_as::<_, Self>(
            "INSERT INTO cart_item (user_id, menu_item_id, quantity) VALUES ($1, $2, $3) \
            ON CONFLICT (user_id, menu_item_id) \
            DO UPDATE SET quantity = cart_item.quantity + EXCLUDED.quantity \
            WHERE cart_item.quantity + EXCLUDED.quantity <= $4 \
            RETURNING *",
        )
        .bind(user_id)
        .bind(menu_item_id)
        .bind(i32::try_from(quantity).expect("Cart quantity exceeds i32 range"))
        .bind(i32::try_from(max_quantity).expect("Cart quantity exceeds i32 range"))
        .fetch_optional(db_client)
        .await?)
    }

    /// Update the corresponding database record to match this model's state.
    pub async fn update(&self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("UPDATE cart_item SET quantity = $1 WHERE user_id = $2 AND menu_item_id = $3")
            .bind(self.quantity)
            .bind(self.user_id)
            .bind(self.menu_item_id)
            .execute(db_client)
            .await?;
        Ok(())
    }

    /// Remove this line from the cart.
    pub async fn delete(self, db_client: &ConnectionPool) -> Result<(), DatabaseError> {
        query("DELETE FROM cart_item WHERE user_id = $1 AND menu_item_id = $2")
            .bind(self.user_id)
            .bind(self.menu_item_id)
            .execute(db_client)
            .await?;
        Ok(())
    }

    /// Empty a user's cart, returning how many lines were removed.
    pub async fn clear_for_user<'e>(
        user_id: Uuid,
        executor: impl PgExecutor<'e>,
    ) -> Result<u64, DatabaseError> {
        Ok(query("DELETE FROM cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?
            .rows_affected())
    }
    /// Remove the given lines from a user's cart. Lines added after the
    /// caller read the cart are left alone.
    pub async fn remove_lines<'e>(
        user_id: Uuid,
        menu_item_ids: &[Uuid],
        executor: impl PgExecutor<'e>,
    ) -> Result<u64, DatabaseError> {
        Ok(
            query("DELETE FROM cart_item WHERE user_id = $1 AND menu_item_id = ANY($2)")
                .bind(user_id)
                .bind(menu_item_ids)
                .execute(executor)
                .await?
                .rows_affected(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CartItem, CartItemRow};
    use crate::db::testing;

    #[tokio::test]
    async fn removing_read_lines_keeps_lines_added_since() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let kitchen = testing::listed_service(&pool).await;
        let dosa = testing::menu_item(&kitchen, "Masala Dosa", 9000, 0, &pool).await;
        let lassi = testing::menu_item(&kitchen, "Mango Lassi", 6000, 0, &pool).await;
        CartItem::add(user.id(), dosa.id(), 1, 99, &pool).await.unwrap();

        let mut tx = pool.begin().await.unwrap();
        let read: Vec<_> = CartItemRow::select_for_user_locked(user.id(), &mut *tx)
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.menu_item_id)
            .collect();
        // Lands outside the transaction while the read lines are locked.
        CartItem::add(user.id(), lassi.id(), 2, 99, &pool).await.unwrap();
        let removed = CartItem::remove_lines(user.id(), &read, &mut *tx).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(removed, 1);
        let left = CartItemRow::select_for_user(user.id(), &pool).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].menu_item_id, lassi.id());
        assert_eq!(left[0].quantity(), 2);
    }
}
