//! # Store Actor
//!
//! Owns the [`StoreState`] and applies requests strictly in mailbox order.
//! Each handler runs to completion before the next message is read, so no
//! lock guards the directory or the notification queue.

use crate::model::SessionKey;
use crate::store::client::StoreClient;
use crate::store::message::StoreRequest;
use crate::store::state::StoreState;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    state: StoreState,
}

impl StoreActor {
    /// Creates the actor and its client.
    ///
    /// `buffer_size` bounds the mailbox; senders wait when it is full.
    pub fn new(buffer_size: usize, notification_capacity: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            state: StoreState::new(notification_capacity),
        };
        (actor, StoreClient::new(sender))
    }

    /// Hands the state to `owner` before the actor is spawned.
    pub fn open(&mut self, owner: SessionKey) {
        self.state.open(owner);
    }

    /// Runs until every [`StoreClient`] has been dropped.
    pub async fn run(mut self) {
        info!("Store actor started");

        while let Some(msg) = self.receiver.recv().await {
            self.handle(msg);
        }

        info!(
            orders = self.state.directory.len(),
            notifications = self.state.notifications.len(),
            "Store actor shutdown"
        );
    }

    fn handle(&mut self, msg: StoreRequest) {
        let state = &mut self.state;
        // Reply errors only mean the caller stopped waiting.
        match msg {
            StoreRequest::BeginFetch { page, size, respond_to } => {
                let ticket = state.directory.begin_fetch(page, size);
                debug!(seq = ticket.seq, page, size, "Fetch started");
                let _ = respond_to.send(ticket);
            }
            StoreRequest::CompleteFetch { ticket, page, respond_to } => {
                let count = page.items.len();
                let outcome = state.directory.complete_fetch(ticket, page);
                debug!(seq = ticket.seq, count, ?outcome, "Fetch resolved");
                let _ = respond_to.send(outcome);
            }
            StoreRequest::FailFetch { ticket, message, respond_to } => {
                let outcome = state.directory.fail_fetch(ticket, message);
                debug!(seq = ticket.seq, ?outcome, "Fetch failed");
                let _ = respond_to.send(outcome);
            }
            StoreRequest::InsertCreated { owner, order, respond_to } => {
                let applied = state.owned_by(&owner);
                if applied {
                    debug!(order_id = %order.id, "Created order inserted");
                    state.directory.insert_created(order);
                } else {
                    debug!(order_id = %order.id, "Created order from an ended session dropped");
                }
                let _ = respond_to.send(applied);
            }
            StoreRequest::Upsert { owner, order, respond_to } => {
                let applied = state.owned_by(&owner);
                if applied {
                    debug!(order_id = %order.id, "Order upserted");
                    state.directory.upsert(order);
                } else {
                    debug!(order_id = %order.id, "Order update from an ended session dropped");
                }
                let _ = respond_to.send(applied);
            }
            StoreRequest::ApplyEvent { event, respond_to } => {
                let patched = state.apply_event(&event);
                let _ = respond_to.send(patched);
            }
            StoreRequest::ClearNotifications { respond_to } => {
                state.notifications.clear();
                let _ = respond_to.send(());
            }
            StoreRequest::Open { owner, respond_to } => {
                let changed = state.open(owner);
                if changed {
                    info!("Store opened for a new session");
                }
                let _ = respond_to.send(changed);
            }
            StoreRequest::Reset { respond_to } => {
                state.reset();
                info!("Store reset");
                let _ = respond_to.send(());
            }
            StoreRequest::Directory { respond_to } => {
                let _ = respond_to.send(state.directory.snapshot());
            }
            StoreRequest::Notifications { respond_to } => {
                let _ = respond_to.send(state.notifications.to_vec());
            }
            StoreRequest::LastRequested { respond_to } => {
                let _ = respond_to.send(state.directory.last_requested());
            }
            StoreRequest::Order { order_id, respond_to } => {
                let _ = respond_to.send(state.directory.get(&order_id).cloned());
            }
        }
    }
}
