//! Outbound domain events.

use tracing::{debug, warn};
use crate::domain::events::DomainEvent;

/// Publishes committed domain events to NATS when a client is configured.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { nats }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.nats.is_some()
    }

    /// Never fails; delivery problems are logged and dropped.
    pub async fn publish(&self, event: DomainEvent) {
        let Some(nats) = &self.nats else {
            debug!(subject = event.subject(), "event publishing disabled");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, subject = event.subject(), "failed to encode event");
                return;
            }
        };
        if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
            warn!(error = %e, subject = event.subject(), "failed to publish event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OrderEvent;

    #[tokio::test]
    async fn test_disabled_publisher_is_a_no_op() {
        let publisher = EventPublisher::disabled();
        assert!(!publisher.is_enabled());
        publisher.publish(DomainEvent::Order(OrderEvent::Cancelled { order_id: 1, restocked_lines: 0 })).await;
    }

    #[test]
    fn test_event_wire_shape() {
        let event = DomainEvent::Order(OrderEvent::Cancelled { order_id: 3, restocked_lines: 2 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order");
        assert_eq!(json["event"], "cancelled");
        assert_eq!(event.subject(), "store.orders.cancelled");
    }
}
