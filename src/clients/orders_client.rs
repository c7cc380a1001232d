//! # Orders Client
//!
//! What a page calls to read and change orders. Each operation talks to the
//! remote [`OrderService`] with the current session's token and writes the
//! result into the store.
//!
//! Authentication rejections are never handled in place: the rejected token
//! is handed to [`SessionManager::invalidate`] and the call fails with
//! [`OrdersError::Unauthorized`]. Every other failure stays local to the
//! caller, except a failed fetch, which is also recorded on the directory.
//!
//! Every write carries the [`SessionKey`] of the token it was issued with. A
//! reply that comes back after that session ended is returned to the caller
//! but never reaches the store, so it cannot show up under the next session.

use crate::directory::{DirectorySnapshot, FetchOutcome};
use crate::model::{Order, OrderCreate, OrderStatus, SessionKey};
use crate::remote::{OrderService, RemoteError};
use crate::session::SessionManager;
use crate::store::{StoreClient, StoreError};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Directory error shown when the service gives no reason.
pub const FETCH_FAILED: &str = "Failed to fetch orders";

#[derive(Debug, thiserror::Error)]
pub enum OrdersError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("Session rejected by the server")]
    Unauthorized,
    #[error("Order cannot move from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error(transparent)]
    Remote(RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order operations for the signed-in session.
#[derive(Clone)]
pub struct OrdersClient {
    session: Arc<SessionManager>,
    store: StoreClient,
    service: Arc<dyn OrderService>,
    page_size: u32,
}

impl OrdersClient {
    /// Builds a client over the shared session and store.
    ///
    /// `page_size` is only used by [`refresh`](Self::refresh) when nothing
    /// has been fetched yet.
    ///
    /// # Example
    /// ```ignore
    /// let orders = OrdersClient::new(session, store, Arc::new(HttpApi::new(url)), 20);
    /// orders.fetch(0, 20).await?;
    /// ```
    pub fn new(
        session: Arc<SessionManager>,
        store: StoreClient,
        service: Arc<dyn OrderService>,
        page_size: u32,
    ) -> Self {
        Self { session, store, service, page_size }
    }

    /// Loads `page` into the directory, replacing whatever it showed.
    ///
    /// A response that resolves after a newer fetch was issued is discarded
    /// and reported as [`FetchOutcome::Stale`]. On failure the directory keeps
    /// its items and records the error message.
    ///
    /// # Returns
    /// [`FetchOutcome::Applied`] when the page is now shown,
    /// [`FetchOutcome::Stale`] when a newer fetch or a session change won.
    #[instrument(skip(self))]
    pub async fn fetch(&self, page: u32, size: u32) -> Result<FetchOutcome, OrdersError> {
        let token = self.token()?;
        let ticket = self.store.begin_fetch(page, size).await?;

        match self.service.fetch_page(&token, page, size).await {
            Ok(result) => {
                let outcome = self.store.complete_fetch(ticket, result).await?;
                debug!(seq = ticket.seq, ?outcome, "Fetch applied");
                Ok(outcome)
            }
            Err(e) => {
                let message = match &e {
                    RemoteError::Rejected { message, .. } if !message.is_empty() => message.clone(),
                    _ => FETCH_FAILED.to_string(),
                };
                self.store.fail_fetch(ticket, message).await?;
                Err(self.rejected(&token, e))
            }
        }
    }

    /// Re-fetches the page last requested, or the first page.
    pub async fn refresh(&self) -> Result<FetchOutcome, OrdersError> {
        let (page, size) = self
            .store
            .last_requested()
            .await?
            .unwrap_or((0, self.page_size));
        self.fetch(page, size).await
    }

    /// Creates an order and puts it at the top of the current page.
    ///
    /// # Returns
    /// The order as the service stored it. If the session ended while the
    /// request was in flight the order is still returned but not listed.
    #[instrument(skip(self, payload), fields(order_number = %payload.order_number))]
    pub async fn create(&self, payload: OrderCreate) -> Result<Order, OrdersError> {
        let token = self.token()?;
        let order = self
            .service
            .create_order(&token, &payload)
            .await
            .map_err(|e| self.rejected(&token, e))?;
        info!(order_id = %order.id, "Order created");
        if !self.store.insert_created(SessionKey::of(&token), order.clone()).await? {
            debug!(order_id = %order.id, "Session ended before the order was listed");
        }
        Ok(order)
    }

    /// Asks the service to move an order to `target`.
    ///
    /// Moves the local status table forbids are refused without a request
    /// when the order is on the current page. Nothing changes locally until
    /// the service answers; the returned order then replaces the local copy.
    #[instrument(skip(self))]
    pub async fn transition(&self, order_id: &str, target: OrderStatus) -> Result<Order, OrdersError> {
        let token = self.token()?;
        if let Some(current) = self.store.order(order_id).await? {
            if !current.status.can_transition_to(target) {
                return Err(OrdersError::IllegalTransition { from: current.status, to: target });
            }
        }

        let order = self
            .service
            .transition(&token, order_id, target)
            .await
            .map_err(|e| self.rejected(&token, e))?;
        info!(order_id, status = %order.status, "Order transitioned");
        if !self.store.upsert(SessionKey::of(&token), order.clone()).await? {
            debug!(order_id, "Session ended before the transition was applied");
        }
        Ok(order)
    }

    /// Reads one order. The directory is left alone.
    #[instrument(skip(self))]
    pub async fn get(&self, order_id: &str) -> Result<Order, OrdersError> {
        let token = self.token()?;
        self.service
            .get_order(&token, order_id)
            .await
            .map_err(|e| self.rejected(&token, e))
    }

    /// Current page, loading flag and last error.
    pub async fn directory(&self) -> Result<DirectorySnapshot, OrdersError> {
        Ok(self.store.directory().await?)
    }

    fn token(&self) -> Result<String, OrdersError> {
        self.session.token().ok_or(OrdersError::NotAuthenticated)
    }

    fn rejected(&self, token: &str, error: RemoteError) -> OrdersError {
        if !error.is_auth_rejection() {
            return OrdersError::Remote(error);
        }
        if self.session.invalidate(token) {
            warn!(error = %error, "Session invalidated by the server");
        }
        OrdersError::Unauthorized
    }
}
