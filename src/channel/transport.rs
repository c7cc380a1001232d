//! Transport seam under the event channel.
//!
//! A transport opens one authenticated connection per attempt. The channel
//! never reuses a connection after an error; it closes it and asks the
//! transport for a fresh one.

use async_trait::async_trait;

/// Transport-level failures. All of them are retried by the channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Handshake rejected: {0}")]
    Handshake(String),
    #[error("Connection dropped: {0}")]
    Dropped(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Transport I/O error: {0}")]
    Io(String),
}

#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Opens a connection and completes the handshake carrying `token`.
    async fn connect(&self, token: &str) -> Result<Box<dyn EventConnection>, TransportError>;
}

/// One live, handshaken connection.
#[async_trait]
pub trait EventConnection: Send {
    /// Subscribes to `topic` (for example `orders/{tenantId}`).
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Next message body on the subscription.
    ///
    /// `None` means the peer closed the connection cleanly.
    async fn next_message(&mut self) -> Option<Result<String, TransportError>>;

    /// Releases the subscription and the connection. Must not fail.
    async fn close(&mut self);
}
