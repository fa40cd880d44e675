//! Checkout and the order lifecycle.
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::cart::{CartLine, CartSummary, PricingPolicy};
use crate::db::{
    self,
    models::{
        apporder::{
            AppOrder, AppOrderInsert, AppOrderSearchParameters, AppOrderStatus, PaymentMethod,
        },
        appuser::AppUser,
        cart_item::{CartItem, CartItemRow},
        order_item::{OrderItem, OrderItemInsert},
    },
};

#[derive(Serialize)]
pub struct AppOrderWithItems {
    #[serde(flatten)]
    pub order: AppOrder,
    pub items: Vec<OrderItem>,
}

/// Checkout details supplied by the customer.
#[derive(Deserialize)]
pub struct OrderRequest {
    pub payment_method: PaymentMethod,
    /// Defaults to the address on the customer's profile.
    pub delivery_address: Option<String>,
}

fn to_db_amount(amount: u64) -> Result<i64, errors::OrderPlacementError> {
    i64::try_from(amount).map_err(|_overflow| errors::OrderPlacementError::CostTooLarge)
}

/// Turn a user's cart into an order. The cart is locked, copied into the
/// order and emptied inside one transaction.
pub async fn place_order(
    user_id: Uuid,
    request: OrderRequest,
    db_conn: &db::ConnectionPool,
) -> Result<AppOrderWithItems, errors::OrderPlacementError> {
    let user = AppUser::select_one(user_id, db_conn)
        .await?
        .ok_or(errors::OrderPlacementError::UserNonExistent(user_id))?;

    let mut tx = db_conn.begin().await.map_err(db::errors::DatabaseError::from)?;
    let rows = CartItemRow::select_for_user_locked(user_id, &mut *tx).await?;
    let lines: Vec<CartLine> = rows.iter().map(CartLine::from).collect();
    if lines.is_empty() {
        return Err(errors::OrderPlacementError::CartEmpty);
    }
    if let Some(line) = lines.iter().find(|line| !line.orderable) {
        return Err(errors::OrderPlacementError::ItemUnavailable(
            line.menu_item_id,
            line.name.clone(),
        ));
    }
    let delivery_address = request
        .delivery_address
        .map(|address| address.trim().to_owned())
        .filter(|address| !address.is_empty())
        .unwrap_or(user.address);
    if delivery_address.is_empty() {
        return Err(errors::OrderPlacementError::AddressMissing);
    }
    let summary = CartSummary::from_lines(lines, &PricingPolicy::configured())
        .map_err(|_overflow| errors::OrderPlacementError::CostTooLarge)?;

    let order = AppOrderInsert {
        user_id,
        payment_method: request.payment_method,
        delivery_address,
        subtotal: to_db_amount(summary.subtotal)?,
        discount: to_db_amount(summary.discount)?,
        delivery_fee: to_db_amount(summary.delivery_fee)?,
        total: to_db_amount(summary.total)?,
    }
    .store(&mut *tx)
    .await?;
    let mut items = Vec::with_capacity(summary.lines.len());
    for line in &summary.lines {
        let item = OrderItemInsert::new(
            order.id(),
            line.menu_item_id,
            &line.name,
            line.unit_price,
            line.discount_percent,
            line.quantity,
            line.line_total,
        )
        .store(&mut *tx)
        .await?;
        items.push(item);
    }
    let ordered: Vec<Uuid> = summary.lines.iter().map(|line| line.menu_item_id).collect();
    CartItem::remove_lines(user_id, &ordered, &mut *tx).await?;
    tx.commit().await.map_err(db::errors::DatabaseError::from)?;
    info!(
        %user_id,
        order_id = %order.id(),
        lines = items.len(),
        total = order.total(),
        "Order placed"
    );
    Ok(AppOrderWithItems { order, items })
}

/// Search orders. Customers pass their own ID to see only their orders.
pub async fn search_orders(
    params: AppOrderSearchParameters,
    db_conn: &db::ConnectionPool,
) -> Result<Vec<AppOrder>, db::errors::DatabaseError> {
    AppOrder::search(params, db_conn).await
}

/// Retrieve an order and its items. When `customer` is set, orders that do
/// not belong to them are reported as forbidden, whether or not they exist.
pub async fn retrieve_order(
    order_id: Uuid,
    customer: Option<Uuid>,
    db_conn: &db::ConnectionPool,
) -> Result<AppOrderWithItems, errors::OrderRetrievalError> {
    let order = AppOrder::select_one(order_id, db_conn).await?;
    let order = match (order, customer) {
        (Some(order), None) => order,
        (Some(order), Some(user_id)) if order.user_id() == Some(user_id) => order,
        (None, None) => return Err(errors::OrderRetrievalError::NonExistent(order_id)),
        (_, Some(_)) => return Err(errors::OrderRetrievalError::Forbidden(order_id)),
    };
    let items = OrderItem::select_all(order.id(), db_conn).await?;
    Ok(AppOrderWithItems { order, items })
}

/// Cancel one of the customer's own orders. Only orders which have not yet
/// been confirmed can be cancelled by customers.
pub async fn cancel_order(
    user_id: Uuid,
    order_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<AppOrder, errors::OrderUpdateError> {
    let mut order = AppOrder::select_one(order_id, db_conn)
        .await?
        .filter(|order| order.user_id() == Some(user_id))
        .ok_or(errors::OrderUpdateError::Forbidden(order_id))?;
    if order.status() != AppOrderStatus::Placed {
        return Err(errors::OrderUpdateError::InvalidTransition(
            order.status(),
            AppOrderStatus::Cancelled,
        ));
    }
    if !order.transition(AppOrderStatus::Cancelled, db_conn).await? {
        return Err(errors::OrderUpdateError::InvalidTransition(
            AppOrderStatus::Placed,
            AppOrderStatus::Cancelled,
        ));
    }
    info!(%user_id, %order_id, "Order cancelled by customer");
    Ok(order)
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: AppOrderStatus,
}

/// Move an order along its lifecycle.
pub async fn update_status(
    order_id: Uuid,
    update: StatusUpdate,
    db_conn: &db::ConnectionPool,
) -> Result<AppOrder, errors::OrderUpdateError> {
    let mut order = AppOrder::select_one(order_id, db_conn)
        .await?
        .ok_or(errors::OrderUpdateError::NonExistent(order_id))?;
    let current = order.status();
    if !current.can_transition_to(update.status) {
        warn!(%order_id, from = ?current, to = ?update.status, "Rejected order status change");
        return Err(errors::OrderUpdateError::InvalidTransition(
            current,
            update.status,
        ));
    }
    if !order.transition(update.status, db_conn).await? {
        warn!(%order_id, from = ?current, to = ?update.status, "Order status changed concurrently");
        return Err(errors::OrderUpdateError::InvalidTransition(
            current,
            update.status,
        ));
    }
    info!(%order_id, from = ?current, to = ?update.status, "Order status changed");
    Ok(order)
}

pub mod errors {
    use thiserror::Error;
    use uuid::Uuid;

    use crate::db::{errors::DatabaseError, models::apporder::AppOrderStatus};

    #[derive(Debug, Error)]
    pub enum OrderPlacementError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The ordering user does not exist")]
        UserNonExistent(Uuid),
        #[error("Cart is empty")]
        CartEmpty,
        #[error("A delivery address is required")]
        AddressMissing,
        #[error("{1} is currently unavailable")]
        ItemUnavailable(Uuid, String),
        #[error("Total cost exceeds the maximum allowed value")]
        CostTooLarge,
    }

    #[derive(Debug, Error)]
    pub enum OrderRetrievalError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The order does not exist")]
        NonExistent(Uuid),
        #[error("Not permitted to view this order")]
        Forbidden(Uuid),
    }

    #[derive(Debug, Error)]
    pub enum OrderUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error("The order does not exist")]
        NonExistent(Uuid),
        #[error("Not permitted to modify this order")]
        Forbidden(Uuid),
        #[error("Cannot move an order from {0:?} to {1:?}")]
        InvalidTransition(AppOrderStatus, AppOrderStatus),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::testing,
        services::cart::{self, AddCartItem},
    };

    #[test]
    fn order_request_accepts_missing_address() {
        let request: OrderRequest =
            serde_json::from_str(r#"{"payment_method": "cash_on_delivery"}"#).unwrap();
        assert_eq!(request.payment_method, PaymentMethod::CashOnDelivery);
        assert!(request.delivery_address.is_none());
    }

    #[test]
    fn unknown_payment_methods_are_rejected() {
        assert!(serde_json::from_str::<OrderRequest>(r#"{"payment_method": "barter"}"#).is_err());
    }

    #[test]
    fn amounts_beyond_bigint_are_rejected() {
        assert_eq!(to_db_amount(42).unwrap(), 42);
        assert!(matches!(
            to_db_amount(u64::MAX),
            Err(errors::OrderPlacementError::CostTooLarge)
        ));
    }

    #[test]
    fn status_update_parses_snake_case() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status": "out_for_delivery"}"#).unwrap();
        assert_eq!(update.status, AppOrderStatus::OutForDelivery);
    }

    fn cash_on_delivery() -> OrderRequest {
        OrderRequest {
            payment_method: PaymentMethod::CashOnDelivery,
            delivery_address: None,
        }
    }

    async fn add(user_id: Uuid, menu_item_id: Uuid, quantity: u32, pool: &db::ConnectionPool) {
        cart::add_item(
            user_id,
            AddCartItem {
                menu_item_id,
                quantity,
            },
            pool,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn checkout_copies_every_line_and_empties_the_cart() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let kitchen = testing::listed_service(&pool).await;
        let dosa = testing::menu_item(&kitchen, "Masala Dosa", 12000, 10, &pool).await;
        let lassi = testing::menu_item(&kitchen, "Mango Lassi", 6000, 0, &pool).await;
        add(user.id(), dosa.id(), 2, &pool).await;
        add(user.id(), lassi.id(), 3, &pool).await;
        let expected = cart::view_cart(user.id(), &pool).await.unwrap();

        let placed = place_order(user.id(), cash_on_delivery(), &pool).await.unwrap();
        assert_eq!(placed.order.total(), i64::try_from(expected.total).unwrap());
        assert_eq!(placed.order.delivery_address, "12 Lake Road, Pune");
        assert_eq!(placed.order.status(), AppOrderStatus::Placed);

        let stored = retrieve_order(placed.order.id(), Some(user.id()), &pool).await.unwrap();
        let items = serde_json::to_value(&stored.items).unwrap();
        let items = items.as_array().unwrap();
        assert_eq!(items.len(), expected.lines.len());
        for line in &expected.lines {
            let item = items
                .iter()
                .find(|item| item["name"] == line.name.as_str())
                .unwrap();
            assert_eq!(item["quantity"], line.quantity);
            assert_eq!(item["unit_price"], line.unit_price);
            assert_eq!(item["discount_percent"], line.discount_percent);
            assert_eq!(item["line_total"], line.line_total);
        }
        assert!(cart::view_cart(user.id(), &pool).await.unwrap().lines.is_empty());
    }

    #[tokio::test]
    async fn unavailable_item_rolls_back_checkout() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let kitchen = testing::listed_service(&pool).await;
        let dosa = testing::menu_item(&kitchen, "Masala Dosa", 12000, 0, &pool).await;
        let mut lassi = testing::menu_item(&kitchen, "Mango Lassi", 6000, 0, &pool).await;
        add(user.id(), dosa.id(), 1, &pool).await;
        add(user.id(), lassi.id(), 2, &pool).await;
        lassi.available = false;
        lassi.update(&pool).await.unwrap();

        let result = place_order(user.id(), cash_on_delivery(), &pool).await;
        assert!(matches!(
            result,
            Err(errors::OrderPlacementError::ItemUnavailable(id, _)) if id == lassi.id()
        ));
        assert_eq!(cart::view_cart(user.id(), &pool).await.unwrap().lines.len(), 2);
        let orders = search_orders(
            AppOrderSearchParameters {
                user_id: Some(user.id()),
                status: None,
            },
            &pool,
        )
        .await
        .unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn empty_cart_is_reported_before_a_missing_address() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer_with(&testing::unique_mobile(), "", &pool).await;
        assert!(matches!(
            place_order(user.id(), cash_on_delivery(), &pool).await,
            Err(errors::OrderPlacementError::CartEmpty)
        ));

        let kitchen = testing::listed_service(&pool).await;
        let dosa = testing::menu_item(&kitchen, "Masala Dosa", 12000, 0, &pool).await;
        add(user.id(), dosa.id(), 1, &pool).await;
        assert!(matches!(
            place_order(user.id(), cash_on_delivery(), &pool).await,
            Err(errors::OrderPlacementError::AddressMissing)
        ));
        assert_eq!(cart::view_cart(user.id(), &pool).await.unwrap().lines.len(), 1);
    }

    #[tokio::test]
    async fn confirmed_orders_cannot_be_cancelled_by_customers() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let kitchen = testing::listed_service(&pool).await;
        let dosa = testing::menu_item(&kitchen, "Masala Dosa", 12000, 0, &pool).await;
        add(user.id(), dosa.id(), 1, &pool).await;
        let order_id = place_order(user.id(), cash_on_delivery(), &pool)
            .await
            .unwrap()
            .order
            .id();

        let confirmed = update_status(
            order_id,
            StatusUpdate {
                status: AppOrderStatus::Confirmed,
            },
            &pool,
        )
        .await
        .unwrap();
        assert_eq!(confirmed.status(), AppOrderStatus::Confirmed);
        assert!(matches!(
            cancel_order(user.id(), order_id, &pool).await,
            Err(errors::OrderUpdateError::InvalidTransition(
                AppOrderStatus::Confirmed,
                AppOrderStatus::Cancelled
            ))
        ));
    }
}
