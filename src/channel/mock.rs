//! # Mock Transport
//!
//! Scripted [`EventTransport`] for channel tests. Each connect attempt takes
//! the next scripted outcome (accept by default). Accepted connections read
//! from a feed the test drives with [`MockTransport::push`] and
//! [`MockTransport::drop_connection`].
//!
//! The transport counts live subscriptions, so a test can assert that
//! reconnecting never leaves more than one behind.

use crate::channel::{EventConnection, EventTransport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};

enum Outcome {
    Accept,
    Reject(TransportError),
    Hang,
}

enum FeedItem {
    Payload(String),
    Fail(TransportError),
}

#[derive(Default)]
struct Script {
    outcomes: VecDeque<Outcome>,
    feed: Option<mpsc::UnboundedSender<FeedItem>>,
    tokens: Vec<String>,
    topics: Vec<String>,
}

struct Shared {
    script: Mutex<Script>,
    attempts: AtomicUsize,
    live_subscriptions: AtomicUsize,
    live_connections: AtomicUsize,
    subscribes: watch::Sender<usize>,
}

#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let (subscribes, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                script: Mutex::new(Script::default()),
                attempts: AtomicUsize::new(0),
                live_subscriptions: AtomicUsize::new(0),
                live_connections: AtomicUsize::new(0),
                subscribes,
            }),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.shared.script.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// The next connect attempt fails its handshake with `error`.
    pub fn reject_next(&self, error: TransportError) -> &Self {
        self.script().outcomes.push_back(Outcome::Reject(error));
        self
    }

    pub fn accept_next(&self) -> &Self {
        self.script().outcomes.push_back(Outcome::Accept);
        self
    }

    /// The next connect attempt never completes its handshake.
    pub fn hang_next(&self) -> &Self {
        self.script().outcomes.push_back(Outcome::Hang);
        self
    }

    /// Delivers `payload` on the newest connection. Returns `false` if none is open.
    pub fn push(&self, payload: impl Into<String>) -> bool {
        self.send(FeedItem::Payload(payload.into()))
    }

    /// Drops the newest connection as if the network went away.
    pub fn drop_connection(&self) -> bool {
        self.send(FeedItem::Fail(TransportError::Dropped("simulated network loss".into())))
    }

    fn send(&self, item: FeedItem) -> bool {
        match &self.script().feed {
            Some(feed) => feed.send(item).is_ok(),
            None => false,
        }
    }

    pub fn connect_attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.shared.live_subscriptions.load(Ordering::SeqCst)
    }

    pub fn open_connections(&self) -> usize {
        self.shared.live_connections.load(Ordering::SeqCst)
    }

    /// Tokens presented at each handshake, in order.
    pub fn tokens(&self) -> Vec<String> {
        self.script().tokens.clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.script().topics.clone()
    }

    /// Waits until `count` subscriptions have been made in total.
    pub async fn wait_for_subscriptions(&self, count: usize) {
        let mut rx = self.shared.subscribes.subscribe();
        // The sender lives in `shared`, which this handle keeps alive.
        let _ = rx.wait_for(|seen| *seen >= count).await;
    }
}

#[async_trait]
impl EventTransport for MockTransport {
    async fn connect(&self, token: &str) -> Result<Box<dyn EventConnection>, TransportError> {
        self.shared.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = {
            let mut script = self.script();
            script.tokens.push(token.to_string());
            script.outcomes.pop_front().unwrap_or(Outcome::Accept)
        };
        match outcome {
            Outcome::Accept => {}
            Outcome::Reject(error) => return Err(error),
            Outcome::Hang => std::future::pending::<()>().await,
        }

        let (sender, feed) = mpsc::unbounded_channel();
        self.script().feed = Some(sender);
        self.shared.live_connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            shared: self.shared.clone(),
            feed,
            subscribed: false,
            released: false,
        }))
    }
}

struct MockConnection {
    shared: Arc<Shared>,
    feed: mpsc::UnboundedReceiver<FeedItem>,
    subscribed: bool,
    released: bool,
}

impl MockConnection {
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if self.subscribed {
            self.shared.live_subscriptions.fetch_sub(1, Ordering::SeqCst);
        }
        self.shared.live_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventConnection for MockConnection {
    async fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if !self.subscribed {
            self.subscribed = true;
            self.shared.live_subscriptions.fetch_add(1, Ordering::SeqCst);
        }
        self.shared
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .topics
            .push(topic.to_string());
        self.shared.subscribes.send_modify(|seen| *seen += 1);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
        match self.feed.recv().await? {
            FeedItem::Payload(payload) => Some(Ok(payload)),
            FeedItem::Fail(error) => Some(Err(error)),
        }
    }

    async fn close(&mut self) {
        self.release();
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.release();
    }
}
