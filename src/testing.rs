//! Fixture builders shared by unit and integration tests.

use crate::model::{Order, OrderEvent, OrderPage, OrderStatus, Session};
use chrono::{TimeZone, Utc};

/// An order with fixed timestamps and filler fields.
pub fn order(id: &str, status: OrderStatus) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).single().unwrap_or_default();
    Order {
        id: id.to_string(),
        order_number: format!("ORD-{id}"),
        description: format!("Consignment {id}"),
        status,
        destination_address: "12 Quay Street".to_string(),
        weight: 4.0,
        latitude: Some(53.35),
        longitude: Some(-6.26),
        tracking_notes: None,
        tenant_id: "tenant-1".to_string(),
        created_at,
        updated_at: created_at,
    }
}

/// A status-change event stamped with the current time.
pub fn event(order_id: &str, status: OrderStatus) -> OrderEvent {
    OrderEvent {
        event_type: "OrderStatusChanged".to_string(),
        order_id: order_id.to_string(),
        tenant_id: "tenant-1".to_string(),
        status,
        timestamp: Utc::now(),
    }
}

/// JSON wire form of [`event`].
pub fn event_payload(order_id: &str, status: OrderStatus) -> String {
    serde_json::to_string(&event(order_id, status)).unwrap_or_default()
}

pub fn page(orders: Vec<Order>, current_page: u32, total_pages: u32) -> OrderPage {
    OrderPage {
        total_elements: orders.len() as u64,
        items: orders,
        total_pages,
        current_page,
    }
}

pub fn session(token: &str, tenant_id: &str) -> Session {
    Session {
        token: token.to_string(),
        email: "dispatch@acme.test".to_string(),
        tenant_id: tenant_id.to_string(),
        role: "ROLE_USER".to_string(),
    }
}
