//! Mobile Store
//!
//! Backend for a mobile phone and accessory retailer.
//!
//! ## Features
//! - Catalog of brands, phones and accessories
//! - Per-customer shopping cart priced live against the catalog
//! - Checkout that snapshots prices and reconciles stock atomically
//! - Order cancellation with stock restoration
//! - Payment recording (simulated gateway)
//! - Email/password accounts with bearer tokens and staff roles

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod events;
pub mod services;
pub mod storage;

use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{message}")]
    Validation {
        message: String,
        details: BTreeMap<String, String>,
    },

    #[error("{0}")]
    Unauthenticated(Cow<'static, str>),

    #[error("{0}")]
    PermissionDenied(Cow<'static, str>),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: BTreeMap::new(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            details: BTreeMap::from([(field.to_string(), message.clone())]),
            message,
        }
    }

    pub fn permission_denied(message: &'static str) -> Self {
        Self::PermissionDenied(Cow::Borrowed(message))
    }

    pub fn unauthenticated(message: &'static str) -> Self {
        Self::Unauthenticated(Cow::Borrowed(message))
    }

    /// Stable machine-readable code surfaced to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Unauthenticated(_) => "not_authenticated",
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::Conflict(_) => "conflict",
            Self::Storage(_) | Self::Internal(_) => "server_error",
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("invalid value ({})", e.code))
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                (field.to_string(), message)
            })
            .collect();
        Self::Validation {
            message: "Validation failed. Please check your input.".to_string(),
            details,
        }
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "must not be empty"))]
        name: String,
    }

    #[test]
    fn test_validation_errors_keep_field_messages() {
        let err: ShopError = Probe { name: String::new() }.validate().unwrap_err().into();
        match err {
            ShopError::Validation { details, .. } => {
                assert_eq!(details.get("name").map(String::as_str), Some("must not be empty"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ShopError::NotFound("Order").to_string(), "Order not found");
        assert_eq!(ShopError::Conflict("x".into()).code(), "conflict");
        assert_eq!(ShopError::field("status", "required").code(), "validation_error");
    }
}
