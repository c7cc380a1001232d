//! # Store Client
//!
//! Typed async interface to the [`StoreActor`](super::StoreActor). Cheap to
//! clone; the actor stops once the last clone is dropped.

use crate::directory::{DirectorySnapshot, FetchOutcome, FetchTicket};
use crate::model::{Notification, Order, OrderEvent, OrderPage, SessionKey};
use crate::store::error::StoreError;
use crate::store::message::{Response, StoreRequest};
use tokio::sync::{mpsc, oneshot};

/// Handle to the session-scoped directory and notification queue.
///
/// Every method is one round trip through the actor's mailbox. All of them
/// fail with [`StoreError::ActorClosed`] once the actor has stopped, and with
/// [`StoreError::ActorDropped`] if it stopped before replying.
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)
    }

    /// Issues a fetch ticket for `page` and marks the directory as loading.
    ///
    /// # Returns
    /// The ticket to hand back to [`complete_fetch`](Self::complete_fetch) or
    /// [`fail_fetch`](Self::fail_fetch) once the response is in.
    pub async fn begin_fetch(&self, page: u32, size: u32) -> Result<FetchTicket, StoreError> {
        self.request(|respond_to| StoreRequest::BeginFetch { page, size, respond_to })
            .await
    }

    /// Replaces the directory page with `page` unless a newer fetch was issued
    /// since `ticket`, or the store was reset.
    pub async fn complete_fetch(
        &self,
        ticket: FetchTicket,
        page: OrderPage,
    ) -> Result<FetchOutcome, StoreError> {
        self.request(|respond_to| StoreRequest::CompleteFetch { ticket, page, respond_to })
            .await
    }

    /// Records a failed fetch. Items already shown are kept.
    pub async fn fail_fetch(
        &self,
        ticket: FetchTicket,
        message: impl Into<String>,
    ) -> Result<FetchOutcome, StoreError> {
        let message = message.into();
        self.request(|respond_to| StoreRequest::FailFetch { ticket, message, respond_to })
            .await
    }

    /// Prepends a newly created order.
    ///
    /// # Returns
    /// `false` when `owner` no longer holds the store; the order is not
    /// listed in that case.
    pub async fn insert_created(&self, owner: SessionKey, order: Order) -> Result<bool, StoreError> {
        self.request(|respond_to| StoreRequest::InsertCreated { owner, order, respond_to })
            .await
    }

    /// Replaces the local copy of `order`, under the same ownership rule as
    /// [`insert_created`](Self::insert_created).
    pub async fn upsert(&self, owner: SessionKey, order: Order) -> Result<bool, StoreError> {
        self.request(|respond_to| StoreRequest::Upsert { owner, order, respond_to })
            .await
    }

    /// Fans an inbound event out to the notification queue and the directory.
    pub async fn apply_event(&self, event: OrderEvent) -> Result<bool, StoreError> {
        self.request(|respond_to| StoreRequest::ApplyEvent { event, respond_to })
            .await
    }

    pub async fn clear_notifications(&self) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::ClearNotifications { respond_to })
            .await
    }

    /// Hands the store to the session named by `owner`, forgetting a previous
    /// owner's orders and notifications.
    ///
    /// # Returns
    /// Whether the store changed hands.
    pub async fn open(&self, owner: SessionKey) -> Result<bool, StoreError> {
        self.request(|respond_to| StoreRequest::Open { owner, respond_to })
            .await
    }

    /// Forgets everything and releases ownership. In-flight fetches resolve
    /// as stale and late writes are dropped.
    pub async fn reset(&self) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::Reset { respond_to })
            .await
    }

    pub async fn directory(&self) -> Result<DirectorySnapshot, StoreError> {
        self.request(|respond_to| StoreRequest::Directory { respond_to })
            .await
    }

    /// Notifications, newest first.
    pub async fn notifications(&self) -> Result<Vec<Notification>, StoreError> {
        self.request(|respond_to| StoreRequest::Notifications { respond_to })
            .await
    }

    pub async fn last_requested(&self) -> Result<Option<(u32, u32)>, StoreError> {
        self.request(|respond_to| StoreRequest::LastRequested { respond_to })
            .await
    }

    /// Looks an order up on the loaded page only.
    pub async fn order(&self, order_id: impl Into<String>) -> Result<Option<Order>, StoreError> {
        let order_id = order_id.into();
        self.request(|respond_to| StoreRequest::Order { order_id, respond_to })
            .await
    }
}
