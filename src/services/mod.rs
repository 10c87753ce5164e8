//! Application services.
//!
//! Each operation opens exactly one unit of work, performs its reads and
//! writes through it and commits once. Events are published only after the
//! commit succeeded.

pub mod cart;
pub mod catalog;
pub mod customers;
pub mod orders;
pub mod payments;
pub mod sample;

use std::sync::Arc;
use crate::auth::TokenIssuer;
use crate::events::EventPublisher;
use crate::storage::Storage;
use crate::{Result, ShopError};

pub use cart::CartService;
pub use catalog::CatalogService;
pub use customers::CustomerService;
pub use orders::OrderService;
pub use payments::PaymentService;

/// The authenticated caller of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor {
    pub customer_id: i64,
    pub is_staff: bool,
}

impl Actor {
    pub fn require_staff(&self) -> Result<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(ShopError::permission_denied("You do not have permission to perform this action."))
        }
    }

    /// Customer filter for listings: staff see everything.
    pub fn scope(&self) -> Option<i64> {
        (!self.is_staff).then_some(self.customer_id)
    }

    pub fn can_access(&self, owner_id: i64) -> bool {
        self.is_staff || self.customer_id == owner_id
    }
}

/// Every service, wired to the same storage and event sink.
#[derive(Clone)]
pub struct Services {
    pub catalog: CatalogService,
    pub customers: CustomerService,
    pub cart: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl Services {
    pub fn new(storage: Arc<dyn Storage>, events: EventPublisher, tokens: TokenIssuer) -> Self {
        Self {
            catalog: CatalogService::new(storage.clone()),
            customers: CustomerService::new(storage.clone(), tokens),
            cart: CartService::new(storage.clone()),
            orders: OrderService::new(storage.clone(), events.clone()),
            payments: PaymentService::new(storage, events),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_scope() {
        let customer = Actor { customer_id: 5, is_staff: false };
        assert_eq!(customer.scope(), Some(5));
        assert!(customer.can_access(5));
        assert!(!customer.can_access(6));
        assert!(matches!(customer.require_staff(), Err(ShopError::PermissionDenied(_))));

        let staff = Actor { customer_id: 1, is_staff: true };
        assert_eq!(staff.scope(), None);
        assert!(staff.can_access(6));
        assert!(staff.require_staff().is_ok());
    }
}
