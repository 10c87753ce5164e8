//! Cart Aggregate
//!
//! Cart lines store only a product reference and a quantity. Prices are read
//! from the catalog every time the cart is shown, so totals follow catalog
//! price changes until checkout snapshots them into an order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::product::ProductSummary;
use crate::domain::value_objects::{line_total, ProductRef};

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Cart {
    pub cart_id: i64,
    pub customer_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartLine {
    pub cart_item_id: i64,
    pub cart_id: i64,
    pub product: ProductRef,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the live catalog entry it points at.
#[derive(Clone, Debug)]
pub struct PricedCartLine {
    pub line: CartLine,
    pub product: Option<ProductSummary>,
}

impl PricedCartLine {
    pub fn product_name(&self) -> &str {
        self.product.as_ref().map(|p| p.name.as_str()).unwrap_or("Product not found")
    }

    /// Zero when the product has been removed from the catalog.
    pub fn unit_price(&self) -> Decimal {
        self.product.as_ref().map(|p| p.price).unwrap_or(Decimal::ZERO)
    }

    pub fn subtotal(&self) -> Decimal { line_total(self.unit_price(), self.line.quantity) }
}

#[derive(Clone, Debug)]
pub struct PricedCart {
    pub cart: Cart,
    pub lines: Vec<PricedCartLine>,
}

impl PricedCart {
    pub fn total_items(&self) -> usize { self.lines.len() }

    pub fn total_amount(&self) -> Decimal {
        self.lines.iter().map(PricedCartLine::subtotal).sum()
    }

    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
}
