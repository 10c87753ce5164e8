//! Order engine: checkout, cancellation and administrative status changes.
//!
//! Checkout and cancellation lock every product row they touch, always in
//! ascending [`ProductRef`] order, before reading stock. Two checkouts of the
//! same product therefore serialize on the row lock and the second one sees
//! the stock the first one left behind.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;
use crate::domain::aggregates::{CheckoutPlan, CheckoutRequest, NewOrder, Order, OrderDetails, OrderError, OrderStatus};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::ProductRef;
use crate::events::EventPublisher;
use crate::services::Actor;
use crate::storage::{Storage, UnitOfWork};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct OrderService {
    storage: Arc<dyn Storage>,
    events: EventPublisher,
}

async fn details(uow: &mut dyn UnitOfWork, order: Order) -> Result<OrderDetails> {
    let lines = uow.list_order_lines(order.order_id).await?;
    let (customer_name, customer_email) = match uow.find_customer(order.customer_id).await? {
        Some(c) => (c.name, c.email),
        None => (String::new(), String::new()),
    };
    Ok(OrderDetails { order, lines, customer_name, customer_email })
}

fn lock_order_of(mut products: Vec<ProductRef>) -> Vec<ProductRef> {
    products.sort();
    products.dedup();
    products
}

impl OrderService {
    pub fn new(storage: Arc<dyn Storage>, events: EventPublisher) -> Self {
        Self { storage, events }
    }

    /// Turns the caller's cart into a PENDING order.
    ///
    /// Either the order, all of its lines, every stock decrement and the
    /// emptied cart are committed together, or nothing is.
    #[instrument(skip_all, fields(customer_id = actor.customer_id), err)]
    pub async fn create_from_cart(&self, actor: &Actor, request: CheckoutRequest) -> Result<OrderDetails> {
        request.validate()?;
        let mut uow = self.storage.begin().await?;
        let cart = uow.lock_cart(actor.customer_id).await?.ok_or(ShopError::NotFound("Cart"))?;
        let cart_lines = uow.list_cart_lines(cart.cart_id).await?;
        if cart_lines.is_empty() {
            return Err(OrderError::EmptyCart.into());
        }

        let mut products = HashMap::new();
        for product in lock_order_of(cart_lines.iter().map(|l| l.product).collect()) {
            if let Some(summary) = uow.lock_product(product).await? {
                products.insert(product, summary);
            }
        }
        let plan = CheckoutPlan::build(&cart_lines, &products)?;

        let order = uow
            .insert_order(&NewOrder {
                customer_id: actor.customer_id,
                total_amount: plan.total_amount,
                shipping_address: request.shipping_address,
                notes: request.notes,
            })
            .await?;
        for planned in &plan.lines {
            uow.insert_order_line(order.order_id, &planned.snapshot).await?;
            uow.set_stock(planned.snapshot.product, planned.remaining_stock).await?;
        }
        uow.clear_cart(cart.cart_id).await?;
        let created = details(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(
            order_id = created.order.order_id,
            total_amount = %created.order.total_amount,
            lines = created.lines.len(),
            "order created from cart"
        );
        self.events
            .publish(DomainEvent::Order(OrderEvent::Created {
                order_id: created.order.order_id,
                customer_id: created.order.customer_id,
                total_amount: created.order.total_amount,
                items: created.lines.len(),
            }))
            .await;
        Ok(created)
    }

    /// Cancels an order and puts its quantities back on the shelf.
    ///
    /// Lines whose product has since been deleted are skipped.
    #[instrument(skip(self, actor), fields(customer_id = actor.customer_id), err)]
    pub async fn cancel(&self, actor: &Actor, order_id: i64) -> Result<OrderDetails> {
        let mut uow = self.storage.begin().await?;
        let order = uow
            .lock_order(order_id)
            .await?
            .filter(|o| actor.can_access(o.customer_id))
            .ok_or(ShopError::NotFound("Order"))?;
        if !order.status.can_cancel() {
            return Err(OrderError::NotCancellable(order.status).into());
        }

        let mut lines = uow.list_order_lines(order.order_id).await?;
        lines.sort_by_key(|l| l.product);
        let mut restocked = 0;
        for line in &lines {
            if let Some(product) = uow.lock_product(line.product).await? {
                uow.set_stock(line.product, product.stock_quantity.saturating_add(line.quantity)).await?;
                restocked += 1;
            }
        }
        let order = uow.set_order_status(order.order_id, OrderStatus::Cancelled).await?;
        let cancelled = details(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(restocked, skipped = lines.len() - restocked, "order cancelled");
        self.events
            .publish(DomainEvent::Order(OrderEvent::Cancelled { order_id, restocked_lines: restocked }))
            .await;
        Ok(cancelled)
    }

    /// Staff override: any status may be set, including backwards moves.
    #[instrument(skip(self, actor), err)]
    pub async fn update_status(&self, actor: &Actor, order_id: i64, status: OrderStatus) -> Result<OrderDetails> {
        actor.require_staff()?;
        let mut uow = self.storage.begin().await?;
        let order = uow.lock_order(order_id).await?.ok_or(ShopError::NotFound("Order"))?;
        let from = order.status;
        let order = uow.set_order_status(order_id, status).await?;
        let updated = details(uow.as_mut(), order).await?;
        uow.commit().await?;

        info!(from = from.as_str(), to = status.as_str(), "order status changed");
        self.events
            .publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id, from, to: status }))
            .await;
        Ok(updated)
    }

    /// Staff see every order, customers their own.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<OrderDetails>> {
        self.list_for(actor.scope()).await
    }

    pub async fn my_orders(&self, actor: &Actor) -> Result<Vec<OrderDetails>> {
        self.list_for(Some(actor.customer_id)).await
    }

    async fn list_for(&self, customer_id: Option<i64>) -> Result<Vec<OrderDetails>> {
        let mut uow = self.storage.begin().await?;
        let mut out = Vec::new();
        for order in uow.list_orders(customer_id).await? {
            out.push(details(uow.as_mut(), order).await?);
        }
        Ok(out)
    }

    pub async fn get(&self, actor: &Actor, order_id: i64) -> Result<OrderDetails> {
        let mut uow = self.storage.begin().await?;
        let order = uow
            .find_order(order_id)
            .await?
            .filter(|o| actor.can_access(o.customer_id))
            .ok_or(ShopError::NotFound("Order"))?;
        details(uow.as_mut(), order).await
    }
}
