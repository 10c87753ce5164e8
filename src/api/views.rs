//! Response bodies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::{Accessory, MobilePhone, OrderDetails, OrderLine, OrderStatus, PricedCart, PricedCartLine};
use crate::domain::value_objects::ProductType;

/// A catalog record with its derived stock flag.
#[derive(Serialize)]
pub struct Stocked<T> {
    #[serde(flatten)]
    pub item: T,
    pub is_in_stock: bool,
}

impl From<MobilePhone> for Stocked<MobilePhone> {
    fn from(item: MobilePhone) -> Self {
        Self { is_in_stock: item.is_in_stock(), item }
    }
}

impl From<Accessory> for Stocked<Accessory> {
    fn from(item: Accessory) -> Self {
        Self { is_in_stock: item.is_in_stock(), item }
    }
}

#[derive(Serialize)]
pub struct CartItemView {
    pub cart_item_id: i64,
    pub product_type: ProductType,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PricedCartLine> for CartItemView {
    fn from(l: &PricedCartLine) -> Self {
        Self {
            cart_item_id: l.line.cart_item_id,
            product_type: l.line.product.product_type(),
            product_id: l.line.product.id(),
            product_name: l.product_name().to_string(),
            quantity: l.line.quantity,
            unit_price: l.unit_price(),
            subtotal: l.subtotal(),
            created_at: l.line.created_at,
            updated_at: l.line.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct CartView {
    pub cart_id: i64,
    pub customer_id: i64,
    pub items: Vec<CartItemView>,
    pub total_items: usize,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PricedCart> for CartView {
    fn from(c: PricedCart) -> Self {
        Self {
            cart_id: c.cart.cart_id,
            customer_id: c.cart.customer_id,
            items: c.lines.iter().map(CartItemView::from).collect(),
            total_items: c.total_items(),
            total_amount: c.total_amount(),
            created_at: c.cart.created_at,
            updated_at: c.cart.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderItemView {
    pub order_item_id: i64,
    pub product_type: ProductType,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderLine> for OrderItemView {
    fn from(l: OrderLine) -> Self {
        Self {
            order_item_id: l.order_item_id,
            product_type: l.product.product_type(),
            product_id: l.product.id(),
            subtotal: l.subtotal(),
            product_name: l.product_name,
            quantity: l.quantity,
            price_at_purchase: l.price_at_purchase,
            created_at: l.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct OrderView {
    pub order_id: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub shipping_address: String,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    pub total_items: i64,
}

impl From<OrderDetails> for OrderView {
    fn from(d: OrderDetails) -> Self {
        let total_items = d.total_items();
        let o = d.order;
        Self {
            order_id: o.order_id,
            customer_id: o.customer_id,
            customer_name: d.customer_name,
            customer_email: d.customer_email,
            order_date: o.order_date,
            status: o.status,
            total_amount: o.total_amount,
            shipping_address: o.shipping_address,
            notes: o.notes,
            updated_at: o.updated_at,
            items: d.lines.into_iter().map(OrderItemView::from).collect(),
            total_items,
        }
    }
}
