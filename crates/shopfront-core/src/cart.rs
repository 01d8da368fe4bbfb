//! Cart domain models.
//!
//! Prices are minor currency units (cents). A line's effective price is the
//! discounted price when one is present, the regular unit price otherwise.

use serde::{Deserialize, Serialize};

/// Denormalized product data carried on a cart line so the cart can render
/// without a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub name: String,
    pub unit_price: i64,
    pub discounted_price: Option<i64>,
    pub image: Option<String>,
    pub stock_available: Option<i32>,
}

impl ProductSnapshot {
    /// Price actually charged for one unit.
    pub fn effective_price(&self) -> i64 {
        self.discounted_price.unwrap_or(self.unit_price)
    }
}

/// One purchasable line in a cart.
///
/// `line_id` is server-assigned in remote mode and a client-generated UUID in
/// local mode. A local id is never reused as a real identity once the cart is
/// merged into an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub line_id: String,
    pub product_id: String,
    pub quantity: u32,
    pub product: ProductSnapshot,
}

impl CartLine {
    /// Total price for this line.
    pub fn line_total(&self) -> i64 {
        self.product.effective_price() * i64::from(self.quantity)
    }
}

/// Where the cart truth lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartMode {
    /// Backend is authoritative; the client is a read-after-write cache.
    Remote,
    /// Durable client storage is the only copy (anonymous session).
    Local,
}

impl CartMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Local => "local",
        }
    }
}

/// Snapshot of the cart published to subscribers.
///
/// Totals are derived on every read, never stored, so they cannot drift from
/// the line array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartState {
    pub lines: Vec<CartLine>,
    pub mode: CartMode,
    pub is_loading: bool,
}

impl CartState {
    pub fn empty(mode: CartMode) -> Self {
        Self {
            lines: Vec::new(),
            mode,
            is_loading: false,
        }
    }

    /// Sum of quantities over all lines.
    pub fn total_items(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of effective price times quantity over all lines.
    pub fn total_price(&self) -> i64 {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(unit: i64, discounted: Option<i64>) -> ProductSnapshot {
        ProductSnapshot {
            name: "Widget".into(),
            unit_price: unit,
            discounted_price: discounted,
            image: None,
            stock_available: None,
        }
    }

    #[test]
    fn test_discounted_price_wins() {
        let p = snapshot(250, Some(200));
        assert_eq!(p.effective_price(), 200);
        assert_eq!(snapshot(100, None).effective_price(), 100);
    }

    #[test]
    fn test_derived_totals() {
        let state = CartState {
            lines: vec![
                CartLine {
                    line_id: "l1".into(),
                    product_id: "P1".into(),
                    quantity: 2,
                    product: snapshot(100, None),
                },
                CartLine {
                    line_id: "l2".into(),
                    product_id: "P2".into(),
                    quantity: 1,
                    product: snapshot(250, Some(200)),
                },
            ],
            mode: CartMode::Local,
            is_loading: false,
        };

        assert_eq!(state.total_items(), 3);
        assert_eq!(state.total_price(), 400);
    }

    #[test]
    fn test_empty_cart_totals() {
        let state = CartState::empty(CartMode::Remote);
        assert_eq!(state.total_items(), 0);
        assert_eq!(state.total_price(), 0);
    }
}
