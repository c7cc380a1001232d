//! # Event Channel
//!
//! Keeps at most one live, tenant-scoped subscription per session and hands
//! each inbound event to the registered [`EventHandler`].
//!
//! [`EventChannel::start`] spawns a worker task and returns immediately. The
//! worker connects, subscribes to `orders/{tenantId}` and reads messages
//! until the transport fails; any failure is retried after a fixed delay,
//! forever, until [`EventChannel::stop`]. Every await in the worker races the
//! stop signal, so stopping also abandons a pending handshake or retry.
//!
//! Events missed while disconnected are not replayed.

pub mod handler;
pub mod mock;
pub mod stomp;
pub mod transport;
pub mod ws;

pub use handler::EventHandler;
pub use transport::{EventConnection, EventTransport, TransportError};
pub use ws::WebSocketTransport;

use crate::model::{OrderEvent, SessionState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Delay between a transport failure and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("A channel is already active for another session")]
    AlreadyActive,
    #[error("No event handler registered")]
    NoHandler,
}

/// Connectivity as seen by the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelStatus {
    /// No worker is running.
    #[default]
    Idle,
    /// Handshake or subscribe in progress.
    Connecting,
    Subscribed,
    /// Waiting out the reconnect delay after a failure.
    Retrying,
}

struct ActiveChannel {
    token: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// The event subscription for whichever session is signed in.
pub struct EventChannel {
    transport: Arc<dyn EventTransport>,
    reconnect_delay: Duration,
    handler: Option<Arc<dyn EventHandler>>,
    status: Arc<watch::Sender<ChannelStatus>>,
    active: Option<ActiveChannel>,
}

impl EventChannel {
    /// Creates an idle channel.
    ///
    /// # Example
    /// ```ignore
    /// let mut channel = EventChannel::new(Arc::new(WebSocketTransport::new(url)), DEFAULT_RECONNECT_DELAY);
    /// channel.on_event(Arc::new(store.clone()));
    /// channel.start(&session_state)?;
    /// ```
    pub fn new(transport: Arc<dyn EventTransport>, reconnect_delay: Duration) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Idle);
        Self {
            transport,
            reconnect_delay,
            handler: None,
            status: Arc::new(status),
            active: None,
        }
    }

    /// Registers the fan-out handler. Takes effect from the next `start`.
    pub fn on_event(&mut self, handler: Arc<dyn EventHandler>) {
        self.handler = Some(handler);
    }

    /// Opens the subscription for `state`'s session without waiting for it.
    ///
    /// A no-op for an anonymous state or when this session's channel is
    /// already running. Starting for a different session while one is
    /// active is refused; stop the old one first.
    pub fn start(&mut self, state: &SessionState) -> Result<(), ChannelError> {
        let Some(session) = state.session() else {
            debug!("Not starting event channel: no session");
            return Ok(());
        };
        if let Some(active) = &self.active {
            if active.token == session.token {
                return Ok(());
            }
            return Err(ChannelError::AlreadyActive);
        }
        let handler = self.handler.clone().ok_or(ChannelError::NoHandler)?;

        let (shutdown, stop_signal) = oneshot::channel();
        let worker = Worker {
            transport: self.transport.clone(),
            handler,
            token: session.token.clone(),
            tenant_id: session.tenant_id.clone(),
            topic: session.topic(),
            delay: self.reconnect_delay,
            status: self.status.clone(),
        };
        let task = tokio::spawn(worker.run(stop_signal));
        self.active = Some(ActiveChannel { token: session.token.clone(), shutdown, task });
        Ok(())
    }

    /// Tears down the subscription and cancels any pending retry.
    ///
    /// Returns once the worker has released the connection. Safe to call
    /// when nothing is running.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let _ = active.shutdown.send(());
        if let Err(e) = active.task.await {
            warn!(error = %e, "Event channel worker failed");
        }
        self.status.send_replace(ChannelStatus::Idle);
    }

    /// Whether a worker was started and not yet stopped.
    ///
    /// An active channel may still be connecting or waiting to retry; see
    /// [`status`](Self::status) for where it is.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// # Returns
    /// The worker's last reported state, or [`ChannelStatus::Idle`] once
    /// stopped.
    pub fn status(&self) -> ChannelStatus {
        *self.status.borrow()
    }

    /// Whether the subscription is live right now.
    pub fn is_connected(&self) -> bool {
        self.status() == ChannelStatus::Subscribed
    }

    pub fn watch_status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.subscribe()
    }
}

enum Exit {
    Stopped,
    Failed { error: TransportError, subscribed: bool },
}

struct Worker {
    transport: Arc<dyn EventTransport>,
    handler: Arc<dyn EventHandler>,
    token: String,
    tenant_id: String,
    topic: String,
    delay: Duration,
    status: Arc<watch::Sender<ChannelStatus>>,
}

impl Worker {
    async fn run(self, mut stop: oneshot::Receiver<()>) {
        info!(tenant_id = %self.tenant_id, topic = %self.topic, "Event channel started");
        let mut failures: u32 = 0;

        loop {
            match self.connect_and_stream(&mut stop, failures + 1).await {
                Exit::Stopped => break,
                Exit::Failed { error, subscribed } => {
                    failures = if subscribed { 1 } else { failures + 1 };
                    self.status.send_replace(ChannelStatus::Retrying);
                    warn!(
                        error = %error,
                        failures,
                        delay_ms = self.delay.as_millis() as u64,
                        "Event channel failed, retrying"
                    );
                }
            }

            let stopped = tokio::select! {
                _ = &mut stop => true,
                _ = tokio::time::sleep(self.delay) => false,
            };
            if stopped {
                break;
            }
        }

        self.status.send_replace(ChannelStatus::Idle);
        info!(tenant_id = %self.tenant_id, "Event channel stopped");
    }

    async fn connect_and_stream(&self, stop: &mut oneshot::Receiver<()>, attempt: u32) -> Exit {
        self.status.send_replace(ChannelStatus::Connecting);
        debug!(attempt, "Connecting event channel");

        let connected = tokio::select! {
            _ = &mut *stop => return Exit::Stopped,
            connected = self.transport.connect(&self.token) => connected,
        };
        let mut connection = match connected {
            Ok(connection) => connection,
            Err(error) => return Exit::Failed { error, subscribed: false },
        };

        let subscribed = tokio::select! {
            _ = &mut *stop => None,
            subscribed = connection.subscribe(&self.topic) => Some(subscribed),
        };
        match subscribed {
            None => {
                connection.close().await;
                return Exit::Stopped;
            }
            Some(Err(error)) => {
                connection.close().await;
                return Exit::Failed { error, subscribed: false };
            }
            Some(Ok(())) => {}
        }
        self.status.send_replace(ChannelStatus::Subscribed);
        info!(topic = %self.topic, "Event channel subscribed");

        loop {
            let next = tokio::select! {
                _ = &mut *stop => None,
                next = connection.next_message() => Some(next),
            };
            match next {
                None => {
                    connection.close().await;
                    return Exit::Stopped;
                }
                Some(Some(Ok(payload))) => self.dispatch(&payload).await,
                Some(Some(Err(error))) => {
                    connection.close().await;
                    return Exit::Failed { error, subscribed: true };
                }
                Some(None) => {
                    connection.close().await;
                    let error = TransportError::Dropped("closed by server".into());
                    return Exit::Failed { error, subscribed: true };
                }
            }
        }
    }

    async fn dispatch(&self, payload: &str) {
        let event = match OrderEvent::parse(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed event");
                return;
            }
        };
        if event.tenant_id != self.tenant_id {
            warn!(order_id = %event.order_id, tenant_id = %event.tenant_id, "Dropping event for another tenant");
            return;
        }
        self.handler.handle(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use crate::model::{OrderEvent, OrderStatus};
    use crate::testing::{event_payload, session};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct Collect(mpsc::UnboundedSender<OrderEvent>);

    #[async_trait]
    impl EventHandler for Collect {
        async fn handle(&self, event: OrderEvent) {
            let _ = self.0.send(event);
        }
    }

    fn channel(transport: &MockTransport) -> (EventChannel, mpsc::UnboundedReceiver<OrderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut channel = EventChannel::new(Arc::new(transport.clone()), DEFAULT_RECONNECT_DELAY);
        channel.on_event(Arc::new(Collect(tx)));
        (channel, rx)
    }

    fn signed_in(token: &str) -> SessionState {
        SessionState::Authenticated(session(token, "tenant-1"))
    }

    #[tokio::test]
    async fn test_anonymous_start_is_noop() {
        let transport = MockTransport::new();
        let (mut channel, _rx) = channel(&transport);
        channel.start(&SessionState::Anonymous).unwrap();
        assert!(!channel.is_active());
        assert_eq!(transport.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_start_requires_handler() {
        let transport = MockTransport::new();
        let mut channel = EventChannel::new(Arc::new(transport), DEFAULT_RECONNECT_DELAY);
        assert_eq!(channel.start(&signed_in("jwt")), Err(ChannelError::NoHandler));
    }

    #[tokio::test]
    async fn test_subscribes_with_token_and_tenant_topic() {
        let transport = MockTransport::new();
        let (mut channel, mut rx) = channel(&transport);
        channel.start(&signed_in("jwt-1")).unwrap();
        channel.start(&signed_in("jwt-1")).unwrap();
        transport.wait_for_subscriptions(1).await;

        assert_eq!(transport.tokens(), vec!["jwt-1".to_string()]);
        assert_eq!(transport.topics(), vec!["orders/tenant-1".to_string()]);
        assert!(channel.is_connected());

        assert!(transport.push(event_payload("o-1", OrderStatus::Shipped)));
        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.order_id, "o-1");

        channel.stop().await;
        assert_eq!(transport.active_subscriptions(), 0);
        assert_eq!(channel.status(), ChannelStatus::Idle);
    }

    #[tokio::test]
    async fn test_second_session_is_refused() {
        let transport = MockTransport::new();
        let (mut channel, _rx) = channel(&transport);
        channel.start(&signed_in("jwt-1")).unwrap();
        assert_eq!(channel.start(&signed_in("jwt-2")), Err(ChannelError::AlreadyActive));
        channel.stop().await;
        channel.stop().await;
        channel.start(&signed_in("jwt-2")).unwrap();
        channel.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_and_foreign_events_are_dropped() {
        let transport = MockTransport::new();
        let (mut channel, mut rx) = channel(&transport);
        channel.start(&signed_in("jwt")).unwrap();
        transport.wait_for_subscriptions(1).await;

        transport.push("{not json");
        transport.push(r#"{"eventType":"OrderStatusChanged","orderId":"o-1","tenantId":"tenant-1","status":"LOST","timestamp":"2024-03-01T09:00:00Z"}"#);
        transport.push(event_payload("o-1", OrderStatus::Approved).replace("tenant-1", "tenant-2"));
        transport.push(event_payload("o-2", OrderStatus::Approved));

        let delivered = rx.recv().await.unwrap();
        assert_eq!(delivered.order_id, "o-2");
        assert!(channel.is_connected());
        channel.stop().await;
    }
}
