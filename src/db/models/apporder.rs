//! Models mapping to the apporder table. An order is an immutable snapshot
//! of a cart plus delivery and payment details; only its status changes.
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, PgExecutor};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    constants::db::DB_ENCRYPTION_KEY,
    db::{errors::DatabaseError, ConnectionPool},
};

const APPORDER_COLUMNS: &str = "id, user_id, status, payment_method, \
    pgp_sym_decrypt(delivery_address, $1) AS delivery_address, subtotal, discount, \
    delivery_fee, total, placed_at";

#[derive(sqlx::Type, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[sqlx(type_name = "app_order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppOrderStatus {
    /// Placed by the customer, awaiting confirmation.
    Placed,
    /// Accepted by the kitchen.
    Confirmed,
    /// On its way to the customer.
    OutForDelivery,
    /// Handed over to the customer.
    Delivered,
    /// Cancelled before delivery.
    Cancelled,
}

impl AppOrderStatus {
    /// Whether an order may move from this status to `next`.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Placed, Self::Confirmed)
                | (Self::Confirmed, Self::OutForDelivery)
                | (Self::OutForDelivery, Self::Delivered)
                | (
                    Self::Placed | Self::Confirmed | Self::OutForDelivery,
                    Self::Cancelled
                )
        )
    }
}

#[derive(sqlx::Type, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Upi,
    Card,
}

/// INSERT model for an order. Amounts are in paise.
pub struct AppOrderInsert {
    pub user_id: Uuid,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    pub subtotal: i64,
    pub discount: i64,
    pub delivery_fee: i64,
    pub total: i64,
}

#[derive(sqlx::FromRow, Serialize)]
pub struct AppOrder {
    id: Uuid,
    /// The customer who placed the order. `None` once their account is deleted.
    user_id: Option<Uuid>,
    status: AppOrderStatus,
    pub payment_method: PaymentMethod,
    pub delivery_address: String,
    subtotal: i64,
    discount: i64,
    delivery_fee: i64,
    total: i64,
    #[serde(with = "time::serde::rfc3339")]
    placed_at: OffsetDateTime,
}

/// Filters for searching orders.
#[derive(Deserialize, Default)]
pub struct AppOrderSearchParameters {
    pub user_id: Option<Uuid>,
    pub status: Option<AppOrderStatus>,
}

impl AppOrderInsert {
    pub async fn store<'e>(self, executor: impl PgExecutor<'e>) -> Result<AppOrder, DatabaseError> {
        let sql = format!(
            "INSERT INTO apporder (user_id, payment_method, delivery_address, subtotal, discount, \
            delivery_fee, total) VALUES ($2, $3, pgp_sym_encrypt($4, $1), $5, $6, $7, $8) \
            RETURNING {APPORDER_COLUMNS}"
        );
        Ok(query_as::<_, AppOrder>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(self.user_id)
            .bind(self.payment_method)
            .bind(self.delivery_address)
            .bind(self.subtotal)
            .bind(self.discount)
            .bind(self.delivery_fee)
            .bind(self.total)
            .fetch_one(executor)
            .await?)
    }
}

impl AppOrder {
    pub const fn id(&self) -> Uuid {
        self.id
    }
    pub const fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
    pub const fn status(&self) -> AppOrderStatus {
        self.status
    }
    pub const fn total(&self) -> i64 {
        self.total
    }
    pub async fn select_one(
        id: Uuid,
        db_client: &ConnectionPool,
    ) -> Result<Option<Self>, DatabaseError> {
        let sql = format!("SELECT {APPORDER_COLUMNS} FROM apporder WHERE id = $2");
        Ok(query_as::<_, Self>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(id)
            .fetch_optional(db_client)
            .await?)
    }
    pub async fn search(
        params: AppOrderSearchParameters,
        db_client: &ConnectionPool,
    ) -> Result<Vec<Self>, DatabaseError> {
        let sql = format!(
            "SELECT {APPORDER_COLUMNS} FROM apporder \
            WHERE ($2::uuid IS NULL OR user_id = $2) \
            AND ($3::app_order_status IS NULL OR status = $3) \
            ORDER BY placed_at DESC"
        );
        Ok(query_as::<_, Self>(&sql)
            .bind(&*DB_ENCRYPTION_KEY)
            .bind(params.user_id)
            .bind(params.status)
            .fetch_all(db_client)
            .await?)
    }
    /// Move the order to `next`, provided nobody changed its status since it
    /// was read. Returns `false` if the stored status no longer matches.
    pub async fn transition(
        &mut self,
        next: AppOrderStatus,
        db_client: &ConnectionPool,
    ) -> Result<bool, DatabaseError> {
        let updated = query("UPDATE apporder SET status = $1 WHERE id = $2 AND status = $3")
            .bind(next)
            .bind(self.id)
            .bind(self.status)
            .execute(db_client)
            .await?
            .rows_affected()
            == 1;
        if updated {
            self.status = next;
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppOrder, AppOrderInsert, AppOrderStatus::*, PaymentMethod};
    use crate::db::testing;

    #[test]
    fn orders_move_forward_one_step_at_a_time() {
        assert!(Placed.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(!Placed.can_transition_to(Delivered));
        assert!(!Delivered.can_transition_to(Placed));
    }

    #[test]
    fn only_undelivered_orders_can_be_cancelled() {
        assert!(Placed.can_transition_to(Cancelled));
        assert!(OutForDelivery.can_transition_to(Cancelled));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Cancelled));
    }

    #[tokio::test]
    async fn status_changes_based_on_stale_reads_are_refused() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let order = AppOrderInsert {
            user_id: user.id(),
            payment_method: PaymentMethod::Upi,
            delivery_address: "12 Lake Road, Pune".to_owned(),
            subtotal: 10000,
            discount: 0,
            delivery_fee: 4000,
            total: 14000,
        }
        .store(&pool)
        .await
        .unwrap();
        let mut kitchen_view = AppOrder::select_one(order.id(), &pool).await.unwrap().unwrap();
        let mut customer_view = AppOrder::select_one(order.id(), &pool).await.unwrap().unwrap();

        assert!(kitchen_view.transition(Confirmed, &pool).await.unwrap());
        assert_eq!(kitchen_view.status(), Confirmed);
        assert!(!customer_view.transition(Cancelled, &pool).await.unwrap());
        assert_eq!(customer_view.status(), Placed);

        let stored = AppOrder::select_one(order.id(), &pool).await.unwrap().unwrap();
        assert_eq!(stored.status(), Confirmed);
    }
}
