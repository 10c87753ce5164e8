//! Payment records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::aggregates::order::OrderStatus;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Order status implied by a payment entering this status, if any.
    pub fn order_effect(self) -> Option<OrderStatus> {
        match self {
            Self::Completed => Some(OrderStatus::Confirmed),
            Self::Failed => Some(OrderStatus::Pending),
            Self::Pending | Self::Refunded => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Upi,
    NetBanking,
    CashOnDelivery,
    Wallet,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub payment_id: i64,
    pub order_id: i64,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub payment_date: DateTime<Utc>,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PaymentRequest {
    pub order_id: i64,
    pub payment_method: PaymentMethod,
    #[validate(length(max = 200))]
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewPayment {
    pub order_id: i64,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_effects() {
        assert_eq!(PaymentStatus::Completed.order_effect(), Some(OrderStatus::Confirmed));
        assert_eq!(PaymentStatus::Failed.order_effect(), Some(OrderStatus::Pending));
        assert_eq!(PaymentStatus::Refunded.order_effect(), None);
    }

    #[test]
    fn test_method_wire_names() {
        let m: PaymentMethod = serde_json::from_str("\"CASH_ON_DELIVERY\"").unwrap();
        assert_eq!(m, PaymentMethod::CashOnDelivery);
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"UPI\"");
    }
}
