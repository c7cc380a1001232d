//! Inbound order lifecycle events and the notifications derived from them.

use crate::model::OrderStatus;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Payload pushed by the server on the tenant's event topic.
///
/// Ephemeral: it is parsed, fanned out to the store and dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    /// Discriminator such as `OrderCreated` or `OrderStatusChanged`.
    pub event_type: String,
    pub order_id: String,
    pub tenant_id: String,
    /// Status of the order at emission time.
    pub status: OrderStatus,
    /// Emission time on the server clock.
    pub timestamp: DateTime<Utc>,
}

/// Reasons an inbound payload is rejected before it reaches any state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("Malformed event payload: {0}")]
    Malformed(String),
    #[error("Event payload has an empty {0}")]
    EmptyField(&'static str),
}

impl OrderEvent {
    /// Parses and validates a raw payload.
    ///
    /// Unknown statuses, bad timestamps and blank identifiers are all errors;
    /// the caller drops the event.
    pub fn parse(payload: &str) -> Result<Self, EventError> {
        let event: OrderEvent =
            serde_json::from_str(payload).map_err(|e| EventError::Malformed(e.to_string()))?;
        if event.order_id.trim().is_empty() {
            return Err(EventError::EmptyField("orderId"));
        }
        if event.event_type.trim().is_empty() {
            return Err(EventError::EmptyField("eventType"));
        }
        Ok(event)
    }

    /// Builds the display record for this event.
    pub fn to_notification(&self) -> Notification {
        let timestamp = self.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true);
        let short_id: String = self.order_id.chars().take(8).collect();
        Notification {
            id: format!("{}-{}", self.order_id, timestamp),
            message: format!("Order {}... → {}", short_id, self.status),
            timestamp: self.timestamp,
            order_id: self.order_id.clone(),
            event_type: self.event_type.clone(),
        }
    }
}

/// Display-only record kept in the [`NotificationQueue`](crate::notifications::NotificationQueue).
///
/// `id` is `"{orderId}-{timestamp}"`, unique per order per instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub order_id: String,
    pub event_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "eventType": "OrderStatusChanged",
        "orderId": "7f3c9a2e-11aa-4bcd-9000-0123456789ab",
        "tenantId": "tenant-1",
        "status": "SHIPPED",
        "timestamp": "2024-03-01T10:15:30.123Z"
    }"#;

    #[test]
    fn test_parse_valid_payload() {
        let event = OrderEvent::parse(PAYLOAD).unwrap();
        assert_eq!(event.status, OrderStatus::Shipped);
        assert_eq!(event.tenant_id, "tenant-1");
    }

    #[test]
    fn test_notification_shape() {
        let notification = OrderEvent::parse(PAYLOAD).unwrap().to_notification();
        assert_eq!(
            notification.id,
            "7f3c9a2e-11aa-4bcd-9000-0123456789ab-2024-03-01T10:15:30.123Z"
        );
        assert_eq!(notification.message, "Order 7f3c9a2e... → SHIPPED");
        assert_eq!(notification.event_type, "OrderStatusChanged");
    }

    #[test]
    fn test_short_ids_are_not_padded() {
        let event = OrderEvent {
            event_type: "OrderCreated".into(),
            order_id: "ORD-1".into(),
            tenant_id: "t".into(),
            status: OrderStatus::Pending,
            timestamp: Utc::now(),
        };
        assert_eq!(event.to_notification().message, "Order ORD-1... → PENDING");
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        assert!(matches!(OrderEvent::parse("not json"), Err(EventError::Malformed(_))));
        let unknown_status = PAYLOAD.replace("SHIPPED", "TELEPORTED");
        assert!(matches!(OrderEvent::parse(&unknown_status), Err(EventError::Malformed(_))));
        let missing_field = r#"{"eventType":"OrderCreated","orderId":"a","status":"PENDING"}"#;
        assert!(matches!(OrderEvent::parse(missing_field), Err(EventError::Malformed(_))));
        let blank_id = PAYLOAD.replace("7f3c9a2e-11aa-4bcd-9000-0123456789ab", " ");
        assert_eq!(OrderEvent::parse(&blank_id), Err(EventError::EmptyField("orderId")));
    }
}
