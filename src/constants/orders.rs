//! Pricing policy applied to carts and orders. Amounts are in paise.
use std::sync::LazyLock;

use super::secrets::parse_or_default;

/// Flat delivery charge added to orders below the free delivery threshold.
pub static DELIVERY_FEE: LazyLock<u64> = LazyLock::new(|| parse_or_default("DELIVERY_FEE", 4000));

/// Discounted subtotal at or above which delivery is free.
pub static FREE_DELIVERY_THRESHOLD: LazyLock<u64> =
    LazyLock::new(|| parse_or_default("FREE_DELIVERY_THRESHOLD", 50000));

/// Maximum quantity of a single menu item in one cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;
