//! # Mock Remote API
//!
//! Scripted stand-in for the order and auth services, in the spirit of an
//! expectation-based mock client: queue the calls you expect, in order,
//! with the response each should produce, then `verify()` that all of them
//! were consumed.
//!
//! ```ignore
//! let api = MockApi::new();
//! api.expect_fetch(0, 20).return_ok(page);
//! api.expect_transition("o-1", OrderStatus::Approved)
//!     .return_err(RemoteError::Unauthorized { status: 401 });
//! // ... exercise the code under test ...
//! api.verify();
//! ```
//!
//! A response can be held back with [`ExpectationBuilder::after`] to stage
//! races between overlapping requests (pair it with paused tokio time).

use crate::model::{
    LoginRequest, Order, OrderCreate, OrderPage, OrderStatus, RegisterRequest, Session,
};
use crate::remote::{AuthService, OrderService, RemoteError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A scripted response, optionally delayed.
struct Reply<T> {
    result: Result<T, RemoteError>,
    delay: Option<Duration>,
}

impl<T> Reply<T> {
    async fn resolve(self) -> Result<T, RemoteError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result
    }
}

enum Expectation {
    Fetch { page: u32, size: u32, reply: Reply<OrderPage> },
    Get { order_id: String, reply: Reply<Order> },
    Create { reply: Reply<Order> },
    Transition { order_id: String, target: OrderStatus, reply: Reply<Order> },
    Login { reply: Reply<Session> },
    Register { reply: Reply<Session> },
}

impl Expectation {
    fn name(&self) -> &'static str {
        match self {
            Expectation::Fetch { .. } => "fetch_page",
            Expectation::Get { .. } => "get_order",
            Expectation::Create { .. } => "create_order",
            Expectation::Transition { .. } => "transition",
            Expectation::Login { .. } => "login",
            Expectation::Register { .. } => "register",
        }
    }
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock implementing both [`OrderService`] and [`AuthService`].
#[derive(Clone, Default)]
pub struct MockApi {
    expectations: Queue,
    tokens: Arc<Mutex<Vec<String>>>,
    created: Arc<Mutex<Vec<OrderCreate>>>,
}

/// Finishes an expectation by choosing its response.
pub struct ExpectationBuilder<T> {
    queue: Queue,
    delay: Option<Duration>,
    wrap: Box<dyn FnOnce(Reply<T>) -> Expectation + Send>,
}

impl<T> ExpectationBuilder<T> {
    fn new(queue: Queue, wrap: impl FnOnce(Reply<T>) -> Expectation + Send + 'static) -> Self {
        Self { queue, delay: None, wrap: Box::new(wrap) }
    }

    /// Holds the response back for `delay`.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn return_ok(self, value: T) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: RemoteError) {
        self.push(Err(error));
    }

    fn push(self, result: Result<T, RemoteError>) {
        let expectation = (self.wrap)(Reply { result, delay: self.delay });
        lock(&self.queue).push_back(expectation);
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_fetch(&self, page: u32, size: u32) -> ExpectationBuilder<OrderPage> {
        ExpectationBuilder::new(self.expectations.clone(), move |reply| Expectation::Fetch {
            page,
            size,
            reply,
        })
    }

    pub fn expect_get(&self, order_id: impl Into<String>) -> ExpectationBuilder<Order> {
        let order_id = order_id.into();
        ExpectationBuilder::new(self.expectations.clone(), move |reply| Expectation::Get {
            order_id,
            reply,
        })
    }

    pub fn expect_create(&self) -> ExpectationBuilder<Order> {
        ExpectationBuilder::new(self.expectations.clone(), |reply| Expectation::Create { reply })
    }

    pub fn expect_transition(
        &self,
        order_id: impl Into<String>,
        target: OrderStatus,
    ) -> ExpectationBuilder<Order> {
        let order_id = order_id.into();
        ExpectationBuilder::new(self.expectations.clone(), move |reply| {
            Expectation::Transition { order_id, target, reply }
        })
    }

    pub fn expect_login(&self) -> ExpectationBuilder<Session> {
        ExpectationBuilder::new(self.expectations.clone(), |reply| Expectation::Login { reply })
    }

    pub fn expect_register(&self) -> ExpectationBuilder<Session> {
        ExpectationBuilder::new(self.expectations.clone(), |reply| Expectation::Register { reply })
    }

    /// Bearer tokens seen by order-service calls, in call order.
    pub fn tokens(&self) -> Vec<String> {
        lock(&self.tokens).clone()
    }

    /// Create payloads received, in call order.
    pub fn created(&self) -> Vec<OrderCreate> {
        lock(&self.created).clone()
    }

    pub fn pending(&self) -> usize {
        lock(&self.expectations).len()
    }

    /// Panics unless every expectation was consumed.
    pub fn verify(&self) {
        let remaining = self.pending();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }

    fn next(&self, call: &'static str) -> Expectation {
        match lock(&self.expectations).pop_front() {
            Some(expectation) => expectation,
            None => panic!("Unexpected call to {call}: no expectations left"),
        }
    }

    fn record_token(&self, token: &str) {
        lock(&self.tokens).push(token.to_string());
    }
}

fn mismatch(call: &str, expectation: &Expectation) -> ! {
    panic!("Unexpected call to {call}: expected {}", expectation.name())
}

#[async_trait]
impl OrderService for MockApi {
    async fn fetch_page(&self, token: &str, page: u32, size: u32) -> Result<OrderPage, RemoteError> {
        self.record_token(token);
        match self.next("fetch_page") {
            Expectation::Fetch { page: p, size: s, reply } => {
                assert_eq!((p, s), (page, size), "fetch_page called with unexpected page/size");
                reply.resolve().await
            }
            other => mismatch("fetch_page", &other),
        }
    }

    async fn get_order(&self, token: &str, order_id: &str) -> Result<Order, RemoteError> {
        self.record_token(token);
        match self.next("get_order") {
            Expectation::Get { order_id: expected, reply } => {
                assert_eq!(expected, order_id, "get_order called with unexpected id");
                reply.resolve().await
            }
            other => mismatch("get_order", &other),
        }
    }

    async fn create_order(&self, token: &str, payload: &OrderCreate) -> Result<Order, RemoteError> {
        self.record_token(token);
        lock(&self.created).push(payload.clone());
        match self.next("create_order") {
            Expectation::Create { reply } => reply.resolve().await,
            other => mismatch("create_order", &other),
        }
    }

    async fn transition(
        &self,
        token: &str,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<Order, RemoteError> {
        self.record_token(token);
        match self.next("transition") {
            Expectation::Transition { order_id: expected, target: expected_target, reply } => {
                assert_eq!(
                    (expected.as_str(), expected_target),
                    (order_id, target),
                    "transition called with unexpected arguments"
                );
                reply.resolve().await
            }
            other => mismatch("transition", &other),
        }
    }
}

#[async_trait]
impl AuthService for MockApi {
    async fn login(&self, _request: &LoginRequest) -> Result<Session, RemoteError> {
        match self.next("login") {
            Expectation::Login { reply } => reply.resolve().await,
            other => mismatch("login", &other),
        }
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<Session, RemoteError> {
        match self.next("register") {
            Expectation::Register { reply } => reply.resolve().await,
            other => mismatch("register", &other),
        }
    }
}
