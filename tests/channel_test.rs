mod common;

use common::{eventually, harness};
use order_sync::channel::{ChannelStatus, TransportError};
use order_sync::testing::session;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_drop_keeps_one_subscription() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();
    h.transport.wait_for_subscriptions(1).await;
    assert_eq!(h.transport.active_subscriptions(), 1);

    let dropped_at = Instant::now();
    assert!(h.transport.drop_connection());
    h.transport.wait_for_subscriptions(2).await;

    assert!(dropped_at.elapsed() >= Duration::from_secs(5));
    assert_eq!(h.transport.connect_attempts(), 2);
    assert_eq!(h.transport.active_subscriptions(), 1);
    assert_eq!(h.transport.open_connections(), 1);
    assert_eq!(h.system.channel_status(), ChannelStatus::Subscribed);
    assert_eq!(h.transport.tokens(), vec!["jwt-1".to_string(), "jwt-1".to_string()]);

    h.system.shutdown().await.unwrap();
    assert_eq!(h.transport.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_handshakes_retry_at_fixed_delay() {
    let h = harness();
    h.transport
        .reject_next(TransportError::Handshake("broker unavailable".into()))
        .reject_next(TransportError::Io("connection refused".into()))
        .reject_next(TransportError::Protocol("garbled CONNECTED".into()));
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));

    let started = Instant::now();
    h.system.login("dispatch@acme.test", "secret").await.unwrap();
    h.transport.wait_for_subscriptions(1).await;

    // Three failures, three waits of exactly the fixed delay.
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(15));
    assert!(waited < Duration::from_secs(16));
    assert_eq!(h.transport.connect_attempts(), 4);
    assert_eq!(h.transport.active_subscriptions(), 1);
    h.system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_logout_cancels_pending_retries() {
    let h = harness();
    for _ in 0..3 {
        h.transport.reject_next(TransportError::Handshake("rejected".into()));
    }
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();

    let mut status = h.system.watch_channel();
    status.wait_for(|s| *s == ChannelStatus::Retrying).await.unwrap();
    let attempts = h.transport.connect_attempts();

    assert!(h.system.logout());
    h.system.settled().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(h.transport.connect_attempts(), attempts);
    assert_eq!(h.system.channel_status(), ChannelStatus::Idle);
    h.system.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_logout_abandons_hanging_handshake() {
    let h = harness();
    h.transport.hang_next();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();
    eventually("handshake started", || h.transport.connect_attempts() == 1).await;
    assert_eq!(h.system.channel_status(), ChannelStatus::Connecting);

    h.system.logout();
    h.system.settled().await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(h.transport.connect_attempts(), 1);
    assert_eq!(h.transport.open_connections(), 0);
    assert_eq!(h.system.channel_status(), ChannelStatus::Idle);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_new_session_replaces_channel() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.api.expect_login().return_ok(session("jwt-2", "tenant-2"));

    h.system.login("a@acme.test", "secret").await.unwrap();
    h.transport.wait_for_subscriptions(1).await;
    h.system.login("b@other.test", "secret").await.unwrap();
    h.transport.wait_for_subscriptions(2).await;

    assert_eq!(h.transport.topics(), vec!["orders/tenant-1".to_string(), "orders/tenant-2".to_string()]);
    assert_eq!(h.transport.active_subscriptions(), 1);
    h.system.shutdown().await.unwrap();
}
