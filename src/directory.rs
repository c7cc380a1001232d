//! # Order Directory
//!
//! In-memory snapshot of one page of orders plus its pagination metadata and
//! the loading/error state of the most recent fetch.
//!
//! The directory has two independent writers: the REST fetch lifecycle
//! (wholesale page replacement) and the event fan-out (status-only patch).
//! The remote service is the floor truth, so a fetch result always replaces
//! whatever events patched before it, and an event arriving after a fetch
//! patches on top of the replaced page.
//!
//! Items keep the server's order in a `Vec`; a side index maps order id to
//! slot so patch-by-id does not scan the page.

use crate::model::{Order, OrderPage, OrderStatus};
use serde::Serialize;
use std::collections::HashMap;

/// Issued by [`OrderDirectory::begin_fetch`]; must be handed back when the
/// fetch resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub page: u32,
    pub size: u32,
}

/// Whether a fetch resolution was applied or discarded as out of date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Stale,
}

/// Read-only copy of the directory handed to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySnapshot {
    pub items: Vec<Order>,
    pub loading: bool,
    pub error: Option<String>,
    pub total_pages: u32,
    pub current_page: u32,
}

#[derive(Debug, Default)]
pub struct OrderDirectory {
    items: Vec<Order>,
    slots: HashMap<String, usize>,
    loading: bool,
    error: Option<String>,
    total_pages: u32,
    current_page: u32,
    issued_seq: u64,
    resolved_seq: u64,
    last_requested: Option<(u32, u32)>,
}

impl OrderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a fetch as in flight and clears the previous error.
    pub fn begin_fetch(&mut self, page: u32, size: u32) -> FetchTicket {
        self.issued_seq += 1;
        self.last_requested = Some((page, size));
        self.loading = true;
        self.error = None;
        FetchTicket {
            seq: self.issued_seq,
            page,
            size,
        }
    }

    /// Replaces items and pagination wholesale with `page`.
    ///
    /// Resolutions older than the last one applied are discarded.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, page: OrderPage) -> FetchOutcome {
        if !self.accept(ticket) {
            return FetchOutcome::Stale;
        }
        self.items = page.items;
        self.reindex();
        self.total_pages = page.total_pages;
        self.current_page = page.current_page;
        FetchOutcome::Applied
    }

    /// Records a fetch failure. Items are left as they were.
    pub fn fail_fetch(&mut self, ticket: FetchTicket, message: impl Into<String>) -> FetchOutcome {
        if !self.accept(ticket) {
            return FetchOutcome::Stale;
        }
        self.error = Some(message.into());
        FetchOutcome::Applied
    }

    fn accept(&mut self, ticket: FetchTicket) -> bool {
        if ticket.seq <= self.resolved_seq {
            return false;
        }
        self.resolved_seq = ticket.seq;
        if ticket.seq == self.issued_seq {
            self.loading = false;
        }
        true
    }

    /// Puts a freshly created order at the top of the page.
    ///
    /// Page metadata is untouched, so the page may briefly exceed its size.
    pub fn insert_created(&mut self, order: Order) {
        if let Some(slot) = self.slots.get(&order.id).copied() {
            self.items.remove(slot);
        }
        self.items.insert(0, order);
        self.reindex();
    }

    /// Replaces the entry with the same id in place, or prepends it.
    pub fn upsert(&mut self, order: Order) {
        match self.slots.get(&order.id).copied() {
            Some(slot) => self.items[slot] = order,
            None => {
                self.items.insert(0, order);
                self.reindex();
            }
        }
    }

    /// Overwrites only the status of a loaded order.
    ///
    /// Returns `false` (and changes nothing) when the order is not on the
    /// current page.
    pub fn patch_status(&mut self, order_id: &str, status: OrderStatus) -> bool {
        match self.slots.get(order_id) {
            Some(&slot) => {
                self.items[slot].status = status;
                true
            }
            None => false,
        }
    }

    /// Drops all state. Fetches still in flight will resolve as stale.
    pub fn reset(&mut self) {
        let issued = self.issued_seq;
        *self = Self {
            issued_seq: issued,
            resolved_seq: issued,
            ..Self::default()
        };
    }

    fn reindex(&mut self) {
        self.slots.clear();
        for (slot, order) in self.items.iter().enumerate() {
            self.slots.insert(order.id.clone(), slot);
        }
    }

    /// Page and size of the most recently issued fetch.
    pub fn last_requested(&self) -> Option<(u32, u32)> {
        self.last_requested
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        self.slots.get(order_id).map(|&slot| &self.items[slot])
    }

    pub fn items(&self) -> &[Order] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn snapshot(&self) -> DirectorySnapshot {
        DirectorySnapshot {
            items: self.items.clone(),
            loading: self.loading,
            error: self.error.clone(),
            total_pages: self.total_pages,
            current_page: self.current_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::order;

    fn page(ids: &[&str], current_page: u32) -> OrderPage {
        OrderPage {
            items: ids.iter().map(|id| order(id, OrderStatus::Pending)).collect(),
            total_pages: 4,
            total_elements: 37,
            current_page,
        }
    }

    #[test]
    fn test_fetch_replaces_wholesale() {
        let mut dir = OrderDirectory::new();
        let t1 = dir.begin_fetch(0, 10);
        assert!(dir.is_loading());
        dir.complete_fetch(t1, page(&["a", "b"], 0));
        assert!(dir.patch_status("a", OrderStatus::Approved));

        let t2 = dir.begin_fetch(1, 10);
        assert_eq!(dir.complete_fetch(t2, page(&["c"], 1)), FetchOutcome::Applied);
        assert!(!dir.is_loading());
        assert_eq!(dir.len(), 1);
        assert!(dir.get("a").is_none());
        assert_eq!(dir.current_page(), 1);
        assert_eq!(dir.total_pages(), 4);

        // An event after the fetch lands on the replaced set.
        assert!(dir.patch_status("c", OrderStatus::Cancelled));
        assert_eq!(dir.get("c").unwrap().status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_failure_keeps_stale_items() {
        let mut dir = OrderDirectory::new();
        let t1 = dir.begin_fetch(0, 10);
        dir.complete_fetch(t1, page(&["a"], 0));

        let t2 = dir.begin_fetch(0, 10);
        assert_eq!(dir.fail_fetch(t2, "Failed to fetch orders"), FetchOutcome::Applied);
        assert!(!dir.is_loading());
        assert_eq!(dir.error(), Some("Failed to fetch orders"));
        assert_eq!(dir.len(), 1);

        // The next fetch clears the error while in flight.
        dir.begin_fetch(0, 10);
        assert!(dir.error().is_none());
    }

    #[test]
    fn test_older_fetch_cannot_overwrite_newer() {
        let mut dir = OrderDirectory::new();
        let slow = dir.begin_fetch(0, 10);
        let fast = dir.begin_fetch(1, 10);

        assert_eq!(dir.complete_fetch(fast, page(&["new"], 1)), FetchOutcome::Applied);
        assert_eq!(dir.complete_fetch(slow, page(&["old"], 0)), FetchOutcome::Stale);
        assert_eq!(dir.fail_fetch(slow, "late failure"), FetchOutcome::Stale);

        assert!(dir.get("new").is_some());
        assert!(dir.error().is_none());
        assert_eq!(dir.current_page(), 1);
    }

    #[test]
    fn test_loading_tracks_newest_request() {
        let mut dir = OrderDirectory::new();
        let first = dir.begin_fetch(0, 10);
        let second = dir.begin_fetch(0, 10);
        dir.complete_fetch(first, page(&["a"], 0));
        assert!(dir.is_loading());
        dir.complete_fetch(second, page(&["b"], 0));
        assert!(!dir.is_loading());
    }

    #[test]
    fn test_patch_touches_status_only() {
        let mut dir = OrderDirectory::new();
        let t = dir.begin_fetch(0, 10);
        dir.complete_fetch(t, page(&["a", "b", "c"], 0));
        let before = dir.get("b").unwrap().clone();

        for status in [OrderStatus::Approved, OrderStatus::InTransit, OrderStatus::Shipped] {
            assert!(dir.patch_status("b", status));
        }

        let after = dir.get("b").unwrap();
        assert_eq!(after.status, OrderStatus::Shipped);
        assert_eq!(Order { status: before.status, ..after.clone() }, before);
        let ids: Vec<_> = dir.items().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_patch_for_unloaded_order_is_noop() {
        let mut dir = OrderDirectory::new();
        let t = dir.begin_fetch(0, 10);
        dir.complete_fetch(t, page(&["a"], 0));
        let before = dir.snapshot();

        assert!(!dir.patch_status("elsewhere", OrderStatus::Delivered));
        assert_eq!(dir.snapshot(), before);
    }

    #[test]
    fn test_created_order_goes_first_without_page_adjustment() {
        let mut dir = OrderDirectory::new();
        let t = dir.begin_fetch(0, 2);
        dir.complete_fetch(t, page(&["a", "b"], 0));

        dir.insert_created(order("fresh", OrderStatus::Pending));
        assert_eq!(dir.items()[0].id, "fresh");
        assert_eq!(dir.len(), 3);
        assert_eq!(dir.total_pages(), 4);
        assert!(dir.patch_status("b", OrderStatus::Approved));
        assert_eq!(dir.items()[2].status, OrderStatus::Approved);
    }

    #[test]
    fn test_reset_invalidates_in_flight_fetches() {
        let mut dir = OrderDirectory::new();
        let in_flight = dir.begin_fetch(0, 10);
        dir.reset();
        assert!(!dir.is_loading());
        assert_eq!(dir.complete_fetch(in_flight, page(&["a"], 0)), FetchOutcome::Stale);
        assert!(dir.is_empty());

        let next = dir.begin_fetch(0, 10);
        assert_eq!(dir.complete_fetch(next, page(&["b"], 0)), FetchOutcome::Applied);
    }

    #[test]
    fn test_upsert_replaces_in_place_or_prepends() {
        let mut dir = OrderDirectory::new();
        let t = dir.begin_fetch(0, 10);
        dir.complete_fetch(t, page(&["a", "b"], 0));

        let mut replacement = order("b", OrderStatus::Approved);
        replacement.description = "Re-weighed".into();
        dir.upsert(replacement);
        assert_eq!(dir.items()[1].description, "Re-weighed");
        assert_eq!(dir.len(), 2);

        dir.upsert(order("z", OrderStatus::Pending));
        assert_eq!(dir.items()[0].id, "z");
        assert_eq!(dir.get("b").unwrap().status, OrderStatus::Approved);
    }
}
