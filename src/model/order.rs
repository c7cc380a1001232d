//! Order wire shapes: the order itself, the create payload and a listing page.

use crate::model::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A logistics order as returned by the remote order service.
///
/// The `id` is opaque and stable across fetches and events; `order_number`
/// is the human-readable identifier, unique within a tenant.
///
/// Orders are owned by the [`OrderDirectory`](crate::directory::OrderDirectory),
/// which either replaces them wholesale (fetch/create) or patches the
/// `status` field alone (inbound events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub order_number: String,
    #[serde(default)]
    pub description: String,
    pub status: OrderStatus,
    pub destination_address: String,
    pub weight: f64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tracking_notes: Option<String>,
    pub tenant_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the geo-coordinate pair, if both halves are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Status actions the UI may offer for this order.
    ///
    /// Mirrors the transition table only; the remote service makes the
    /// authoritative decision.
    pub fn available_actions(&self) -> &'static [OrderStatus] {
        self.status.successors()
    }
}

/// Payload for creating a new order (`POST /orders`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreate {
    pub order_number: String,
    pub description: String,
    pub destination_address: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_notes: Option<String>,
}

impl OrderCreate {
    /// Creates a payload with the required fields; optional fields start empty.
    pub fn new(
        order_number: impl Into<String>,
        description: impl Into<String>,
        destination_address: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            order_number: order_number.into(),
            description: description.into(),
            destination_address: destination_address.into(),
            weight,
            latitude: None,
            longitude: None,
            tracking_notes: None,
        }
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_tracking_notes(mut self, notes: impl Into<String>) -> Self {
        self.tracking_notes = Some(notes.into());
        self
    }
}

/// One page of the paginated order listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPage {
    #[serde(rename = "content")]
    pub items: Vec<Order>,
    pub total_pages: u32,
    #[serde(default)]
    pub total_elements: u64,
    /// Zero-based index of this page.
    #[serde(rename = "number")]
    pub current_page: u32,
}

/// Body of `PATCH /orders/{id}/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub new_status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_decodes_spring_shape() {
        let json = r#"{
            "content": [{
                "id": "7f3c9a2e-0000-4000-8000-000000000001",
                "orderNumber": "ORD-2024-001",
                "description": "Pallets",
                "status": "IN_TRANSIT",
                "destinationAddress": "1 Dock Road",
                "weight": 12.5,
                "latitude": 51.5,
                "longitude": -0.12,
                "trackingNotes": null,
                "tenantId": "t-1",
                "createdAt": "2024-03-01T10:00:00Z",
                "updatedAt": "2024-03-01T11:30:00.250Z"
            }],
            "totalPages": 3,
            "totalElements": 41,
            "number": 1
        }"#;

        let page: OrderPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 1);
        let order = &page.items[0];
        assert_eq!(order.status, OrderStatus::InTransit);
        assert_eq!(order.coordinates(), Some((51.5, -0.12)));
        assert!(order.tracking_notes.is_none());
        assert!(order.updated_at >= order.created_at);
    }

    #[test]
    fn test_create_payload_omits_absent_optionals() {
        let payload = OrderCreate::new("ORD-1", "Steel coils", "Harbour 4", 12.5);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["orderNumber"], "ORD-1");
        assert_eq!(json["destinationAddress"], "Harbour 4");
        assert!(json.get("latitude").is_none());
        assert!(json.get("trackingNotes").is_none());
    }
}
