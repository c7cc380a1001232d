//! Order lifecycle states and the static transition table.
//!
//! ```text
//! PENDING ──► APPROVED ──► IN_TRANSIT ──► SHIPPED ──► DELIVERED
//!    │            │             │
//!    └────────────┴─────────────┴──────► CANCELLED
//! ```
//!
//! `DELIVERED` and `CANCELLED` are terminal. The table exists to decide which
//! action affordances to show; it never gates what the server may report.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Approved,
    InTransit,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Approved,
        OrderStatus::InTransit,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Legal successor statuses; empty for terminal statuses.
    pub fn successors(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Approved, Cancelled],
            Approved => &[InTransit, Cancelled],
            InTransit => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.successors().contains(&next)
    }

    /// Wire representation (`"IN_TRANSIT"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn test_transition_table() {
        assert_eq!(Pending.successors(), &[Approved, Cancelled]);
        assert_eq!(Approved.successors(), &[InTransit, Cancelled]);
        assert_eq!(InTransit.successors(), &[Shipped, Cancelled]);
        assert_eq!(Shipped.successors(), &[Delivered]);
        assert!(Delivered.successors().is_empty());
        assert!(Cancelled.successors().is_empty());
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Delivered, Cancelled]);
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(!Approved.can_transition_to(Pending));
        assert!(InTransit.can_transition_to(Cancelled));
    }

    #[test]
    fn test_wire_names_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status));
        }
        assert!("SHIPPING".parse::<OrderStatus>().is_err());
    }
}
