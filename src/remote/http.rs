//! REST client for the order and auth services, built on `reqwest`.

use crate::model::{
    LoginRequest, Order, OrderCreate, OrderPage, OrderStatus, RegisterRequest, Session,
    StatusTransition,
};
use crate::remote::{AuthService, OrderService, RemoteError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// `base_url` is the API root, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| RemoteError::Decode(e.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), "Request rejected");
        Err(RemoteError::from_status(status.as_u16(), &body))
    }
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport(e.to_string())
}

#[async_trait]
impl OrderService for HttpApi {
    #[instrument(skip(self, token))]
    async fn fetch_page(&self, token: &str, page: u32, size: u32) -> Result<OrderPage, RemoteError> {
        let response = self
            .http
            .get(self.url("/orders"))
            .bearer_auth(token)
            .query(&[("page", page), ("size", size)])
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn get_order(&self, token: &str, order_id: &str) -> Result<Order, RemoteError> {
        let response = self
            .http
            .get(self.url(&format!("/orders/{order_id}")))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token, payload), fields(order_number = %payload.order_number))]
    async fn create_order(&self, token: &str, payload: &OrderCreate) -> Result<Order, RemoteError> {
        let response = self
            .http
            .post(self.url("/orders"))
            .bearer_auth(token)
            .json(payload)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    #[instrument(skip(self, token))]
    async fn transition(
        &self,
        token: &str,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<Order, RemoteError> {
        let response = self
            .http
            .patch(self.url(&format!("/orders/{order_id}/status")))
            .bearer_auth(token)
            .json(&StatusTransition { new_status: target })
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }
}

#[async_trait]
impl AuthService for HttpApi {
    #[instrument(skip(self))]
    async fn login(&self, request: &LoginRequest) -> Result<Session, RemoteError> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }

    #[instrument(skip(self))]
    async fn register(&self, request: &RegisterRequest) -> Result<Session, RemoteError> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await
            .map_err(transport)?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let api = HttpApi::new("http://localhost:8080/api/");
        assert_eq!(api.url("/orders"), "http://localhost:8080/api/orders");
    }
}
