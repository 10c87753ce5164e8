//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use crate::domain::aggregates::{OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Payment(PaymentEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: i64, customer_id: i64, total_amount: Decimal, items: usize },
    Cancelled { order_id: i64, restocked_lines: usize },
    StatusChanged { order_id: i64, from: OrderStatus, to: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PaymentEvent {
    Recorded { payment_id: i64, order_id: i64, amount: Decimal, method: PaymentMethod },
    StatusChanged { payment_id: i64, order_id: i64, status: PaymentStatus },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Created { .. }) => "store.orders.created",
            Self::Order(OrderEvent::Cancelled { .. }) => "store.orders.cancelled",
            Self::Order(OrderEvent::StatusChanged { .. }) => "store.orders.status_changed",
            Self::Payment(PaymentEvent::Recorded { .. }) => "store.payments.recorded",
            Self::Payment(PaymentEvent::StatusChanged { .. }) => "store.payments.status_changed",
        }
    }
}
