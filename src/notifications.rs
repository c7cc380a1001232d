//! Bounded, newest-first queue of display notifications.

use crate::model::Notification;
use std::collections::VecDeque;

/// Default number of notifications retained.
pub const DEFAULT_CAPACITY: usize = 50;

/// Ordered buffer of notifications, newest first.
///
/// Once the queue holds more than `capacity` entries the oldest (by
/// insertion) is dropped silently.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    capacity: usize,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl NotificationQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepends a notification, returning the evicted entry if the bound was exceeded.
    pub fn push(&mut self, notification: Notification) -> Option<Notification> {
        self.items.push_front(notification);
        if self.items.len() > self.capacity {
            self.items.pop_back()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn to_vec(&self) -> Vec<Notification> {
        self.items.iter().cloned().collect()
    }
}
