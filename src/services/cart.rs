//! The per-user cart and the pricing rules shared with order placement.
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{
    constants::orders::{DELIVERY_FEE, FREE_DELIVERY_THRESHOLD, MAX_LINE_QUANTITY},
    db::{
        self,
        models::{
            cart_item::{CartItem, CartItemRow},
            menu_item::MenuItem,
            service::Service,
        },
    },
};

/// Delivery charges applied on top of the discounted subtotal.
#[derive(Debug, Clone, Copy)]
pub struct PricingPolicy {
    pub delivery_fee: u64,
    pub free_delivery_threshold: u64,
}

impl PricingPolicy {
    /// The policy configured for this deployment.
    pub fn configured() -> Self {
        Self {
            delivery_fee: *DELIVERY_FEE,
            free_delivery_threshold: *FREE_DELIVERY_THRESHOLD,
        }
    }
}

/// The price of one unit after its percentage discount. Discounts round in
/// the customer's favour only down to whole paise.
pub fn discounted_price(price: u32, discount_percent: u8) -> u32 {
    let discount_percent = u64::from(discount_percent.min(100));
    let reduction = u64::from(price) * discount_percent / 100;
    u32::try_from(u64::from(price) - reduction).expect("Discounted price cannot exceed price")
}

/// One priced line of a cart.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: u32,
    /// Undiscounted price of one unit.
    pub unit_price: u32,
    pub discount_percent: u8,
    pub discounted_unit_price: u32,
    /// Discounted price of the whole line.
    pub line_total: u64,
    /// Whether the line can currently be ordered.
    pub orderable: bool,
}

impl CartLine {
    pub fn new(
        menu_item_id: Uuid,
        name: &str,
        unit_price: u32,
        discount_percent: u8,
        quantity: u32,
        orderable: bool,
    ) -> Self {
        let discounted_unit_price = discounted_price(unit_price, discount_percent);
        Self {
            menu_item_id,
            name: name.to_owned(),
            quantity,
            unit_price,
            discount_percent,
            discounted_unit_price,
            line_total: u64::from(discounted_unit_price) * u64::from(quantity),
            orderable,
        }
    }
}

impl From<&CartItemRow> for CartLine {
    fn from(row: &CartItemRow) -> Self {
        Self::new(
            row.menu_item_id,
            &row.name,
            row.price(),
            row.discount_percent(),
            row.quantity(),
            row.available && row.listed,
        )
    }
}

/// A priced cart: its lines plus totals. Amounts are in paise.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    /// Number of units across all lines.
    pub item_count: u64,
    /// Total before discounts.
    pub subtotal: u64,
    /// Amount knocked off by item discounts.
    pub discount: u64,
    pub delivery_fee: u64,
    /// Amount payable.
    pub total: u64,
}

impl CartSummary {
    /// Price a set of cart lines under a policy.
    pub fn from_lines(
        lines: Vec<CartLine>,
        policy: &PricingPolicy,
    ) -> Result<Self, errors::CostTooLarge> {
        let mut item_count: u64 = 0;
        let mut subtotal: u64 = 0;
        let mut discounted: u64 = 0;
        for line in &lines {
            item_count = item_count
                .checked_add(u64::from(line.quantity))
                .ok_or(errors::CostTooLarge)?;
            subtotal = u64::from(line.unit_price)
                .checked_mul(u64::from(line.quantity))
                .and_then(|gross| subtotal.checked_add(gross))
                .ok_or(errors::CostTooLarge)?;
            discounted = discounted
                .checked_add(line.line_total)
                .ok_or(errors::CostTooLarge)?;
        }
        let delivery_fee = if lines.is_empty() || discounted >= policy.free_delivery_threshold {
            0
        } else {
            policy.delivery_fee
        };
        let total = discounted
            .checked_add(delivery_fee)
            .filter(|total| i64::try_from(*total).is_ok())
            .ok_or(errors::CostTooLarge)?;
        Ok(Self {
            lines,
            item_count,
            subtotal,
            discount: subtotal - discounted,
            delivery_fee,
            total,
        })
    }
}

/// Price a user's cart as it stands.
pub async fn view_cart(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<CartSummary, errors::CartViewError> {
    let rows = CartItemRow::select_for_user(user_id, db_conn).await?;
    Ok(CartSummary::from_lines(
        rows.iter().map(CartLine::from).collect(),
        &PricingPolicy::configured(),
    )?)
}

#[derive(Deserialize)]
pub struct AddCartItem {
    pub menu_item_id: Uuid,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

fn check_quantity(quantity: u32) -> Result<(), errors::CartUpdateError> {
    if quantity > MAX_LINE_QUANTITY {
        Err(errors::CartUpdateError::QuantityTooLarge)
    } else {
        Ok(())
    }
}

/// Add an item to a user's cart. Adding an item already in the cart
/// increases its quantity.
pub async fn add_item(
    user_id: Uuid,
    request: AddCartItem,
    db_conn: &db::ConnectionPool,
) -> Result<CartSummary, errors::CartUpdateError> {
    if request.quantity == 0 {
        return Err(errors::CartUpdateError::QuantityZero);
    }
    check_quantity(request.quantity)?;
    let item = MenuItem::select_one(request.menu_item_id, db_conn)
        .await?
        .ok_or(errors::CartUpdateError::ItemNonExistent(request.menu_item_id))?;
    let listed = Service::select_one(item.service_id(), db_conn)
        .await?
        .is_some_and(|service| service.listed);
    if !listed {
        return Err(errors::CartUpdateError::ItemNonExistent(item.id()));
    }
    if !item.available {
        return Err(errors::CartUpdateError::ItemUnavailable(item.id()));
    }
    CartItem::add(
        user_id,
        item.id(),
        request.quantity,
        MAX_LINE_QUANTITY,
        db_conn,
    )
    .await?
    .ok_or(errors::CartUpdateError::QuantityTooLarge)?;
    info!(%user_id, menu_item_id = %item.id(), quantity = request.quantity, "Item added to cart");
    Ok(view_cart(user_id, db_conn).await?)
}

/// Set the quantity of a line already in the cart. Zero removes the line.
pub async fn set_quantity(
    user_id: Uuid,
    menu_item_id: Uuid,
    quantity: u32,
    db_conn: &db::ConnectionPool,
) -> Result<CartSummary, errors::CartUpdateError> {
    check_quantity(quantity)?;
    let mut line = CartItem::select_one(user_id, menu_item_id, db_conn)
        .await?
        .ok_or(errors::CartUpdateError::NotInCart(menu_item_id))?;
    if quantity == 0 {
        line.delete(db_conn).await?;
    } else {
        line.set_quantity(quantity);
        line.update(db_conn).await?;
    }
    Ok(view_cart(user_id, db_conn).await?)
}

/// Remove a line from the cart.
pub async fn remove_item(
    user_id: Uuid,
    menu_item_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<CartSummary, errors::CartUpdateError> {
    CartItem::select_one(user_id, menu_item_id, db_conn)
        .await?
        .ok_or(errors::CartUpdateError::NotInCart(menu_item_id))?
        .delete(db_conn)
        .await?;
    Ok(view_cart(user_id, db_conn).await?)
}

/// Empty the cart.
pub async fn clear_cart(
    user_id: Uuid,
    db_conn: &db::ConnectionPool,
) -> Result<(), db::errors::DatabaseError> {
    let removed = CartItem::clear_for_user(user_id, db_conn).await?;
    info!(%user_id, removed, "Cart cleared");
    Ok(())
}

pub mod errors {
    use crate::db::errors::DatabaseError;
    use thiserror::Error;
    use uuid::Uuid;

    #[derive(Error, Debug, PartialEq, Eq)]
    #[error("Total cost exceeds the maximum allowed value")]
    pub struct CostTooLarge;

    #[derive(Error, Debug)]
    pub enum CartViewError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        CostTooLarge(#[from] CostTooLarge),
    }

    #[derive(Error, Debug)]
    pub enum CartUpdateError {
        #[error(transparent)]
        DatabaseError(#[from] DatabaseError),
        #[error(transparent)]
        CostTooLarge(#[from] CostTooLarge),
        #[error("Menu item does not exist")]
        ItemNonExistent(Uuid),
        #[error("Menu item is currently unavailable")]
        ItemUnavailable(Uuid),
        #[error("Menu item is not in the cart")]
        NotInCart(Uuid),
        #[error("Quantity must be at least 1")]
        QuantityZero,
        #[error("Quantity exceeds the maximum per item")]
        QuantityTooLarge,
    }

    impl From<CartViewError> for CartUpdateError {
        fn from(err: CartViewError) -> Self {
            match err {
                CartViewError::DatabaseError(err) => err.into(),
                CartViewError::CostTooLarge(err) => err.into(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    const POLICY: PricingPolicy = PricingPolicy {
        delivery_fee: 4000,
        free_delivery_threshold: 50000,
    };

    fn line(price: u32, discount: u8, quantity: u32) -> CartLine {
        CartLine::new(Uuid::new_v4(), "Masala Dosa", price, discount, quantity, true)
    }

    #[test]
    fn discount_rounds_down_to_whole_paise() {
        assert_eq!(discounted_price(1000, 0), 1000);
        assert_eq!(discounted_price(1000, 15), 850);
        assert_eq!(discounted_price(999, 10), 900); // 99.9 off floors to 99
        assert_eq!(discounted_price(1000, 100), 0);
        assert_eq!(discounted_price(1000, 250), 0);
    }

    #[test]
    fn line_total_uses_discounted_price() {
        let line = line(12000, 25, 3);
        assert_eq!(line.discounted_unit_price, 9000);
        assert_eq!(line.line_total, 27000);
    }

    #[test]
    fn empty_cart_costs_nothing() {
        let summary = CartSummary::from_lines(Vec::new(), &POLICY).unwrap();
        assert!(summary.lines.is_empty());
        assert_eq!(summary.delivery_fee, 0);
        assert_eq!(summary.total, 0);
    }

    #[test]
    fn small_orders_pay_delivery() {
        let summary =
            CartSummary::from_lines(vec![line(20000, 10, 1), line(5000, 0, 2)], &POLICY).unwrap();
        assert_eq!(summary.item_count, 3);
        assert_eq!(summary.subtotal, 30000);
        assert_eq!(summary.discount, 2000);
        assert_eq!(summary.delivery_fee, 4000);
        assert_eq!(summary.total, 32000);
    }

    #[test]
    fn threshold_applies_to_discounted_amount() {
        // 60000 gross, 48000 after discount: still below the threshold.
        let below = CartSummary::from_lines(vec![line(30000, 20, 2)], &POLICY).unwrap();
        assert_eq!(below.delivery_fee, 4000);
        assert_eq!(below.total, 52000);

        let at = CartSummary::from_lines(vec![line(25000, 0, 2)], &POLICY).unwrap();
        assert_eq!(at.delivery_fee, 0);
        assert_eq!(at.total, 50000);
    }

    #[test]
    fn totals_that_overflow_are_rejected() {
        let lines = (0..3).map(|_| line(u32::MAX, 0, u32::MAX)).collect();
        assert_eq!(
            CartSummary::from_lines(lines, &POLICY).unwrap_err(),
            errors::CostTooLarge
        );
    }

    #[test]
    fn quantity_limits() {
        assert!(check_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(
            check_quantity(MAX_LINE_QUANTITY + 1),
            Err(errors::CartUpdateError::QuantityTooLarge)
        ));
    }

    #[tokio::test]
    async fn merged_lines_stop_at_the_cap() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let kitchen = testing::listed_service(&pool).await;
        let menu_item_id = testing::menu_item(&kitchen, "Idli", 4000, 0, &pool).await.id();
        let add = |quantity| AddCartItem {
            menu_item_id,
            quantity,
        };

        add_item(user.id(), add(60), &pool).await.unwrap();
        let summary = add_item(user.id(), add(39), &pool).await.unwrap();
        assert_eq!(summary.lines[0].quantity, 99);
        assert!(matches!(
            add_item(user.id(), add(1), &pool).await,
            Err(errors::CartUpdateError::QuantityTooLarge)
        ));
        assert_eq!(view_cart(user.id(), &pool).await.unwrap().lines[0].quantity, 99);
    }

    #[tokio::test]
    async fn concurrent_adds_cannot_overshoot_the_cap() {
        let Some(pool) = testing::test_pool().await else {
            return;
        };
        let user = testing::customer(&pool).await;
        let kitchen = testing::listed_service(&pool).await;
        let menu_item_id = testing::menu_item(&kitchen, "Vada Pav", 3000, 0, &pool).await.id();
        let add = || AddCartItem {
            menu_item_id,
            quantity: 50,
        };

        let (first, second) = tokio::join!(
            add_item(user.id(), add(), &pool),
            add_item(user.id(), add(), &pool)
        );
        assert!(first.is_ok() != second.is_ok());
        assert_eq!(view_cart(user.id(), &pool).await.unwrap().lines[0].quantity, 50);
    }
}
