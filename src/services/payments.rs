//! Payment recording against orders. The gateway is simulated: every new
//! payment is accepted immediately.

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::{NewPayment, OrderStatus, Payment, PaymentRequest, PaymentStatus};
use crate::domain::events::{DomainEvent, OrderEvent, PaymentEvent};
use crate::events::EventPublisher;
use crate::services::Actor;
use crate::storage::Storage;
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct PaymentService {
    storage: Arc<dyn Storage>,
    events: EventPublisher,
}

impl PaymentService {
    pub fn new(storage: Arc<dyn Storage>, events: EventPublisher) -> Self {
        Self { storage, events }
    }

    /// Records a COMPLETED payment for the full order total and confirms the order.
    #[instrument(skip_all, fields(customer_id = actor.customer_id, order_id = request.order_id), err)]
    pub async fn create_payment(&self, actor: &Actor, request: PaymentRequest) -> Result<Payment> {
        request.validate()?;
        let mut uow = self.storage.begin().await?;
        let order = uow.lock_order(request.order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        if !actor.can_access(order.customer_id) {
            return Err(ShopError::permission_denied("You don't have permission to pay for this order"));
        }
        if uow.has_completed_payment(order.order_id).await? {
            return Err(ShopError::Conflict("Order is already paid".into()));
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ShopError::InvalidState("Cannot pay for a cancelled order".into()));
        }

        let transaction_id = request
            .transaction_id
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("TXN-{}", Uuid::now_v7().simple()));
        let payment = uow
            .insert_payment(&NewPayment {
                order_id: order.order_id,
                amount: order.total_amount,
                payment_method: request.payment_method,
                status: PaymentStatus::Completed,
                transaction_id: Some(transaction_id),
                notes: request.notes,
            })
            .await?;
        let confirmed = match payment.status.order_effect() {
            Some(status) if status != order.status => Some(uow.set_order_status(order.order_id, status).await?),
            _ => None,
        };
        uow.commit().await?;

        info!(payment_id = payment.payment_id, amount = %payment.amount, "payment recorded");
        self.events
            .publish(DomainEvent::Payment(PaymentEvent::Recorded {
                payment_id: payment.payment_id,
                order_id: payment.order_id,
                amount: payment.amount,
                method: payment.payment_method,
            }))
            .await;
        if let Some(updated) = confirmed {
            self.events
                .publish(DomainEvent::Order(OrderEvent::StatusChanged {
                    order_id: updated.order_id,
                    from: order.status,
                    to: updated.status,
                }))
                .await;
        }
        Ok(payment)
    }

    /// Staff only. COMPLETED confirms the order, FAILED sends it back to PENDING.
    #[instrument(skip(self, actor), err)]
    pub async fn update_status(&self, actor: &Actor, payment_id: i64, status: PaymentStatus) -> Result<Payment> {
        actor.require_staff()?;
        let mut uow = self.storage.begin().await?;
        let payment = uow.find_payment(payment_id).await?.ok_or(ShopError::NotFound("Payment"))?;
        let order = uow.lock_order(payment.order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        if status == PaymentStatus::Completed
            && payment.status != PaymentStatus::Completed
            && uow.has_completed_payment(order.order_id).await?
        {
            return Err(ShopError::Conflict("Order is already paid".into()));
        }
        let payment = uow.set_payment_status(payment_id, status).await?;
        let moved = match status.order_effect() {
            Some(target) => Some(uow.set_order_status(order.order_id, target).await?),
            None => None,
        };
        uow.commit().await?;

        info!(status = ?status, order_id = order.order_id, "payment status changed");
        self.events
            .publish(DomainEvent::Payment(PaymentEvent::StatusChanged {
                payment_id,
                order_id: order.order_id,
                status,
            }))
            .await;
        if let Some(updated) = moved.filter(|o| o.status != order.status) {
            self.events
                .publish(DomainEvent::Order(OrderEvent::StatusChanged {
                    order_id: updated.order_id,
                    from: order.status,
                    to: updated.status,
                }))
                .await;
        }
        Ok(payment)
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Payment>> {
        let mut uow = self.storage.begin().await?;
        uow.list_payments(actor.scope()).await
    }

    pub async fn my_payments(&self, actor: &Actor) -> Result<Vec<Payment>> {
        let mut uow = self.storage.begin().await?;
        uow.list_payments(Some(actor.customer_id)).await
    }

    pub async fn get(&self, actor: &Actor, payment_id: i64) -> Result<Payment> {
        let mut uow = self.storage.begin().await?;
        let payment = uow.find_payment(payment_id).await?.ok_or(ShopError::NotFound("Payment"))?;
        let owner = uow.find_order(payment.order_id).await?.map(|o| o.customer_id);
        match owner {
            Some(owner) if actor.can_access(owner) => Ok(payment),
            _ => Err(ShopError::NotFound("Payment")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{CheckoutRequest, PaymentMethod};
    use crate::domain::value_objects::ProductType;
    use crate::services::cart::AddItem;
    use crate::services::testing::{customer, seed_catalog, services, STAFF};
    use crate::services::Services;
    use rust_decimal::Decimal;

    async fn placed_order(services: &Services, actor: &Actor) -> i64 {
        let (phone_id, _) = seed_catalog(services, 10, 5).await;
        services
            .cart
            .add_item(actor, AddItem { product_type: ProductType::Phone, product_id: phone_id, quantity: 2 })
            .await
            .unwrap();
        let request = CheckoutRequest { shipping_address: "1 Main St".into(), notes: None };
        services.orders.create_from_cart(actor, request).await.unwrap().order.order_id
    }

    fn pay(order_id: i64) -> PaymentRequest {
        PaymentRequest { order_id, payment_method: PaymentMethod::Upi, transaction_id: None, notes: None }
    }

    #[tokio::test]
    async fn test_payment_confirms_order() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let order_id = placed_order(&services, &buyer).await;

        let payment = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.amount, Decimal::new(199998, 2));
        assert!(payment.transaction_id.as_deref().is_some_and(|t| t.starts_with("TXN-")));

        let order = services.orders.get(&buyer, order_id).await.unwrap();
        assert_eq!(order.order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_second_completed_payment_conflicts() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let order_id = placed_order(&services, &buyer).await;
        services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();

        let err = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
        assert_eq!(services.payments.my_payments(&buyer).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_staff_cannot_complete_a_second_payment() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let order_id = placed_order(&services, &buyer).await;
        let first = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();
        services.payments.update_status(&STAFF, first.payment_id, PaymentStatus::Failed).await.unwrap();
        let second = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();

        let err = services
            .payments
            .update_status(&STAFF, first.payment_id, PaymentStatus::Completed)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Order is already paid");
        let completed: Vec<_> = services
            .payments
            .my_payments(&buyer)
            .await
            .unwrap()
            .into_iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].payment_id, second.payment_id);

        // Re-completing the payment that already holds the slot is a no-op.
        services.payments.update_status(&STAFF, second.payment_id, PaymentStatus::Completed).await.unwrap();
    }

    #[tokio::test]
    async fn test_only_owner_or_staff_may_pay() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let stranger = customer(&services, "stranger@example.com").await;
        let order_id = placed_order(&services, &buyer).await;

        assert!(matches!(
            services.payments.create_payment(&stranger, pay(order_id)).await,
            Err(ShopError::PermissionDenied(_))
        ));
        assert!(matches!(
            services.payments.create_payment(&buyer, pay(order_id + 100)).await,
            Err(ShopError::NotFound("Order"))
        ));
        assert!(services.payments.create_payment(&STAFF, pay(order_id)).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_order_cannot_be_paid() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let order_id = placed_order(&services, &buyer).await;
        services.orders.cancel(&buyer, order_id).await.unwrap();

        let err = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap_err();
        assert!(matches!(err, ShopError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_status_update_drives_order() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let order_id = placed_order(&services, &buyer).await;
        let payment = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();

        assert!(matches!(
            services.payments.update_status(&buyer, payment.payment_id, PaymentStatus::Failed).await,
            Err(ShopError::PermissionDenied(_))
        ));

        services.payments.update_status(&STAFF, payment.payment_id, PaymentStatus::Failed).await.unwrap();
        assert_eq!(services.orders.get(&buyer, order_id).await.unwrap().order.status, OrderStatus::Pending);

        // A failed payment no longer blocks a new attempt.
        services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();
        assert_eq!(services.orders.get(&buyer, order_id).await.unwrap().order.status, OrderStatus::Confirmed);

        services.payments.update_status(&STAFF, payment.payment_id, PaymentStatus::Refunded).await.unwrap();
        assert_eq!(services.orders.get(&buyer, order_id).await.unwrap().order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_payments_are_scoped() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        let stranger = customer(&services, "stranger@example.com").await;
        let order_id = placed_order(&services, &buyer).await;
        let payment = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();

        assert!(matches!(services.payments.get(&stranger, payment.payment_id).await, Err(ShopError::NotFound(_))));
        assert!(services.payments.list(&stranger).await.unwrap().is_empty());
        assert_eq!(services.payments.list(&STAFF).await.unwrap().len(), 1);
        assert_eq!(services.payments.get(&buyer, payment.payment_id).await.unwrap(), payment);
    }
}
