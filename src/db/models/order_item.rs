//! Models mapping to the `order_item` table: the per-line snapshot of a cart
//! taken when an order is placed.
use serde::Serialize;
use sqlx::{query_as, PgExecutor};
use uuid::Uuid;

use crate::db::{errors::DatabaseError, ConnectionPool};

pub struct OrderItemInsert {
    order_id: Uuid,
    menu_item_id: Uuid,
    name: String,
    unit_price: i64,
    discount_percent: i16,
    quantity: i32,
    line_total: i64,
}

#[derive(sqlx::FromRow, Serialize)]
pub struct OrderItem {
    /// `None` once the menu item has been deleted from the catalog.
    menu_item_id: Option<Uuid>,
    pub name: String,
    unit_price: i64,
    discount_percent: i16,
    quantity: i32,
    line_total: i64,
}

impl OrderItemInsert {
    pub fn new(
        order_id: Uuid,
        menu_item_id: Uuid,
        name: &str,
        unit_price: u32,
        discount_percent: u8,
        quantity: u32,
        line_total: u64,
    ) -> Self {
        Self {
            order_id,
            menu_item_id,
            name: name.to_owned(),
            unit_price: i64::from(unit_price),
            discount_percent: i16::from(discount_percent),
            quantity: i32::try_from(quantity).expect("Order quantity exceeds i32 range"),
            line_total: i64::try_from(line_total).expect("Line total exceeds i64 range"),
        }
    }
    pub async fn store<'e>(self, executor: impl PgExecutor<'e>) -> Result<OrderItem, DatabaseError> {
        Ok(query_as::<_, OrderItem>(
            "INSERT INTO order_item (order_id, menu_item_id, name, unit_price, discount_percent, \
            quantity, line_total) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(self.order_id)
        .bind(self.menu_item_id)
        .bind(self.name)
        .bind(self.unit_price)
        .bind(self.discount_percent)
        .bind(self.quantity)
        .bind(self.line_total)
        .fetch_one(executor)
        .await?)
    }
}

impl OrderItem {
    pub async fn select_all(
        order_id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        Ok(
            query_as::<_, Self>("SELECT * FROM order_item WHERE order_id = $1 ORDER BY name")
                .bind(order_id)
                .fetch_all(db_client)
                .await?,
        )
    }
}
