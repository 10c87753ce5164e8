//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use validator::Validate;
use crate::domain::aggregates::cart::CartLine;
use crate::domain::aggregates::product::ProductSummary;
use crate::domain::value_objects::{line_total, max_order_total, ProductRef};
use crate::ShopError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Shipped, delivered and cancelled orders are out of the customer's hands.
    pub fn can_cancel(self) -> bool {
        !matches!(self, Self::Shipped | Self::Delivered | Self::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Order {
    pub order_id: i64,
    pub customer_id: i64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase-time snapshot of a product; never follows later catalog edits.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderLine {
    pub order_item_id: i64,
    pub order_id: i64,
    pub product: ProductRef,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn subtotal(&self) -> Decimal { line_total(self.price_at_purchase, self.quantity) }
}

#[derive(Clone, Debug)]
pub struct OrderDetails {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub customer_name: String,
    pub customer_email: String,
}

impl OrderDetails {
    pub fn total_items(&self) -> i64 { self.lines.iter().map(|l| i64::from(l.quantity)).sum() }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewOrder {
    pub customer_id: i64,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderLine {
    pub product: ProductRef,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlannedLine {
    pub snapshot: NewOrderLine,
    /// Stock left on the product once this line is taken.
    pub remaining_stock: i32,
}

/// Validated outcome of a checkout, computed before anything is written.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutPlan {
    pub total_amount: Decimal,
    pub lines: Vec<PlannedLine>,
}

impl CheckoutPlan {
    /// Prices every cart line at the current catalog price and checks stock.
    ///
    /// `products` must hold the catalog rows as read (and locked) inside the
    /// checkout transaction. A product referenced by several lines has its
    /// stock consumed cumulatively.
    pub fn build(lines: &[CartLine], products: &HashMap<ProductRef, ProductSummary>) -> Result<Self, OrderError> {
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let mut remaining: HashMap<ProductRef, i32> = HashMap::new();
        let mut planned = Vec::with_capacity(lines.len());
        let mut total = Decimal::ZERO;
        for line in lines {
            let product = products.get(&line.product).ok_or(OrderError::ProductUnavailable(line.product))?;
            let available = *remaining.entry(line.product).or_insert(product.stock_quantity);
            if line.quantity > available {
                return Err(OrderError::InsufficientStock {
                    product_name: product.name.clone(),
                    available,
                    requested: line.quantity,
                });
            }
            remaining.insert(line.product, available - line.quantity);
            total += line_total(product.price, line.quantity);
            planned.push(PlannedLine {
                snapshot: NewOrderLine {
                    product: line.product,
                    product_name: product.name.clone(),
                    quantity: line.quantity,
                    price_at_purchase: product.price,
                },
                remaining_stock: available - line.quantity,
            });
        }
        if total > max_order_total() {
            return Err(OrderError::TotalTooLarge(total));
        }
        Ok(Self { total_amount: total, lines: planned })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    EmptyCart,
    #[error("Product {0} is no longer available")]
    ProductUnavailable(ProductRef),
    #[error("Insufficient stock for {product_name}: {available} available, {requested} requested")]
    InsufficientStock { product_name: String, available: i32, requested: i32 },
    #[error("Cannot cancel order with status {}", .0.as_str())]
    NotCancellable(OrderStatus),
    #[error("Order total {0} exceeds the maximum of {}", max_order_total())]
    TotalTooLarge(Decimal),
}

impl From<OrderError> for ShopError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::EmptyCart | OrderError::NotCancellable(_) => ShopError::InvalidState(e.to_string()),
            OrderError::ProductUnavailable(_) | OrderError::InsufficientStock { .. } => ShopError::Conflict(e.to_string()),
            OrderError::TotalTooLarge(_) => ShopError::validation(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_line(id: i64, product: ProductRef, quantity: i32) -> CartLine {
        let now = Utc::now();
        CartLine { cart_item_id: id, cart_id: 1, product, quantity, created_at: now, updated_at: now }
    }

    fn catalog() -> HashMap<ProductRef, ProductSummary> {
        HashMap::from([
            (ProductRef::Phone(1), ProductSummary { product: ProductRef::Phone(1), name: "Apple iPhone 15".into(), price: Decimal::new(99999, 2), stock_quantity: 10 }),
            (ProductRef::Accessory(1), ProductSummary { product: ProductRef::Accessory(1), name: "Fast Charger".into(), price: Decimal::new(49900, 2), stock_quantity: 5 }),
        ])
    }

    #[test]
    fn test_plan_snapshots_prices_and_stock() {
        let lines = vec![cart_line(1, ProductRef::Phone(1), 1), cart_line(2, ProductRef::Accessory(1), 2)];
        let plan = CheckoutPlan::build(&lines, &catalog()).unwrap();
        assert_eq!(plan.total_amount, Decimal::new(199799, 2));
        assert_eq!(plan.lines[0].remaining_stock, 9);
        assert_eq!(plan.lines[1].remaining_stock, 3);
        assert_eq!(plan.lines[1].snapshot.price_at_purchase, Decimal::new(49900, 2));
        let snapshot_total: Decimal = plan.lines.iter().map(|l| line_total(l.snapshot.price_at_purchase, l.snapshot.quantity)).sum();
        assert_eq!(snapshot_total, plan.total_amount);
    }

    #[test]
    fn test_plan_rejects_empty_cart() {
        assert_eq!(CheckoutPlan::build(&[], &catalog()), Err(OrderError::EmptyCart));
    }

    #[test]
    fn test_plan_rejects_any_short_line() {
        let lines = vec![cart_line(1, ProductRef::Phone(1), 1), cart_line(2, ProductRef::Accessory(1), 6)];
        let err = CheckoutPlan::build(&lines, &catalog()).unwrap_err();
        assert!(matches!(err, OrderError::InsufficientStock { available: 5, requested: 6, .. }));
    }

    #[test]
    fn test_plan_rejects_vanished_product() {
        let lines = vec![cart_line(1, ProductRef::Phone(2), 1)];
        assert_eq!(CheckoutPlan::build(&lines, &catalog()), Err(OrderError::ProductUnavailable(ProductRef::Phone(2))));
    }

    #[test]
    fn test_plan_rejects_unstorable_total() {
        let price = Decimal::new(99999999, 2);
        let products: HashMap<_, _> = (1..=2)
            .map(|id| {
                let product = ProductRef::Phone(id);
                (product, ProductSummary { product, name: format!("Phone {id}"), price, stock_quantity: 999_999 })
            })
            .collect();
        let one = vec![cart_line(1, ProductRef::Phone(1), 999_999)];
        assert_eq!(CheckoutPlan::build(&one, &products).unwrap().total_amount, Decimal::new(99999899000001, 2));

        let two = vec![cart_line(1, ProductRef::Phone(1), 999_999), cart_line(2, ProductRef::Phone(2), 999_999)];
        let err = CheckoutPlan::build(&two, &products).unwrap_err();
        assert!(matches!(err, OrderError::TotalTooLarge(_)));
        assert!(matches!(ShopError::from(err), ShopError::Validation { .. }));
    }

    #[test]
    fn test_cancellation_guard() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(ShopError::from(OrderError::EmptyCart), ShopError::InvalidState(_)));
        assert!(matches!(ShopError::from(OrderError::ProductUnavailable(ProductRef::Phone(1))), ShopError::Conflict(_)));
        let msg = OrderError::NotCancellable(OrderStatus::Shipped).to_string();
        assert_eq!(msg, "Cannot cancel order with status SHIPPED");
    }
}
