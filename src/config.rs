//! Client configuration.
//!
//! Defaults match a backend on `localhost:8080`. Overrides come from
//! `ORDER_SYNC_*` environment variables or a TOML document:
//!
//! ```toml
//! api_base_url = "https://track.example.com/api"
//! ws_url = "wss://track.example.com/ws/websocket"
//! reconnect_delay_ms = 5000
//! heart_beat_ms = 10000
//! page_size = 20
//! notification_capacity = 50
//! session_file = "/var/lib/order-sync/session.json"
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// REST root, for example `http://localhost:8080/api`.
    pub api_base_url: String,
    /// STOMP WebSocket endpoint.
    pub ws_url: String,
    #[serde(rename = "reconnect_delay_ms", with = "millis")]
    pub reconnect_delay: Duration,
    /// STOMP heart-beat offered to the broker. Zero turns it off.
    #[serde(rename = "heart_beat_ms", with = "millis")]
    pub heart_beat: Duration,
    pub page_size: u32,
    pub notification_capacity: usize,
    /// Where the session is persisted. `None` keeps it in memory only.
    pub session_file: Option<PathBuf>,
    /// Store actor mailbox size.
    pub store_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080/api".to_string(),
            ws_url: "ws://localhost:8080/ws/websocket".to_string(),
            reconnect_delay: crate::channel::DEFAULT_RECONNECT_DELAY,
            heart_beat: crate::channel::stomp::DEFAULT_HEART_BEAT,
            page_size: 20,
            notification_capacity: crate::notifications::DEFAULT_CAPACITY,
            session_file: None,
            store_buffer: 64,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(source)?;
        config.validate()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup("ORDER_SYNC_API_URL") {
            config.api_base_url = url;
        }
        if let Some(url) = lookup("ORDER_SYNC_WS_URL") {
            config.ws_url = url;
        }
        if let Some(ms) = lookup("ORDER_SYNC_RECONNECT_DELAY_MS") {
            config.reconnect_delay = Duration::from_millis(parse("reconnect_delay_ms", &ms)?);
        }
        if let Some(ms) = lookup("ORDER_SYNC_HEART_BEAT_MS") {
            config.heart_beat = Duration::from_millis(parse("heart_beat_ms", &ms)?);
        }
        if let Some(size) = lookup("ORDER_SYNC_PAGE_SIZE") {
            config.page_size = parse("page_size", &size)?;
        }
        if let Some(cap) = lookup("ORDER_SYNC_NOTIFICATION_CAPACITY") {
            config.notification_capacity = parse("notification_capacity", &cap)?;
        }
        if let Some(path) = lookup("ORDER_SYNC_SESSION_FILE") {
            config.session_file = Some(PathBuf::from(path));
        }
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid { key: "page_size", value: "0".into() });
        }
        if self.notification_capacity == 0 {
            return Err(ConfigError::Invalid { key: "notification_capacity", value: "0".into() });
        }
        if self.store_buffer == 0 {
            return Err(ConfigError::Invalid { key: "store_buffer", value: "0".into() });
        }
        Ok(self)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value: value.to_string() })
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
