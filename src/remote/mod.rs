//! Seams to the remote order and auth services.
//!
//! The sync core only sees the [`OrderService`] and [`AuthService`] traits.
//! [`HttpApi`] talks to the real REST backend; [`mock::MockApi`] replays
//! scripted responses in tests.

pub mod error;
pub mod http;
pub mod mock;

pub use error::RemoteError;
pub use http::HttpApi;

use crate::model::{LoginRequest, Order, OrderCreate, OrderPage, OrderStatus, RegisterRequest, Session};
use async_trait::async_trait;

/// Remote order service. Every call carries the caller's bearer token.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn fetch_page(&self, token: &str, page: u32, size: u32) -> Result<OrderPage, RemoteError>;

    async fn get_order(&self, token: &str, order_id: &str) -> Result<Order, RemoteError>;

    async fn create_order(&self, token: &str, payload: &OrderCreate) -> Result<Order, RemoteError>;

    /// Requests a status change; the service re-validates and may reject it.
    async fn transition(
        &self,
        token: &str,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<Order, RemoteError>;
}

/// Remote auth service.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<Session, RemoteError>;

    /// Registers a user, creating the tenant if needed. The user is logged in on success.
    async fn register(&self, request: &RegisterRequest) -> Result<Session, RemoteError>;
}
