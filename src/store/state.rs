use crate::directory::OrderDirectory;
use crate::model::{OrderEvent, SessionKey};
use crate::notifications::NotificationQueue;
use tracing::debug;

/// The two session-scoped structures written by the sync core, and the
/// session they currently belong to.
#[derive(Debug, Default)]
pub struct StoreState {
    pub directory: OrderDirectory,
    pub notifications: NotificationQueue,
    owner: Option<SessionKey>,
}

impl StoreState {
    pub fn new(notification_capacity: usize) -> Self {
        Self {
            directory: OrderDirectory::new(),
            notifications: NotificationQueue::with_capacity(notification_capacity),
            owner: None,
        }
    }

    /// Hands the state to `owner`. A different previous owner's data is
    /// forgotten first; reopening for the same owner keeps everything.
    pub fn open(&mut self, owner: SessionKey) -> bool {
        if self.owner.as_ref() == Some(&owner) {
            return false;
        }
        self.reset();
        self.owner = Some(owner);
        true
    }

    /// Whether a write issued under `key` may still land.
    pub fn owned_by(&self, key: &SessionKey) -> bool {
        self.owner.as_ref() == Some(key)
    }

    /// Fans one event out: notification first, then the status patch.
    ///
    /// Returns whether the order was on the loaded page. An absent order is
    /// not an error; the next fetch brings it up to date.
    pub fn apply_event(&mut self, event: &OrderEvent) -> bool {
        if let Some(evicted) = self.notifications.push(event.to_notification()) {
            debug!(evicted = %evicted.id, "Notification evicted");
        }
        let patched = self.directory.patch_status(&event.order_id, event.status);
        debug!(
            order_id = %event.order_id,
            status = %event.status,
            patched,
            "Event applied"
        );
        patched
    }

    /// Forgets everything, the owner included; used when the session ends.
    pub fn reset(&mut self) {
        self.directory.reset();
        self.notifications.clear();
        self.owner = None;
    }
}
