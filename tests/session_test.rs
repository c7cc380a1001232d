mod common;

use common::{harness, harness_with, wait_for_notifications};
use order_sync::clients::OrdersError;
use order_sync::directory::FetchOutcome;
use order_sync::model::{OrderCreate, OrderStatus, SessionState};
use order_sync::remote::RemoteError;
use order_sync::session::{MemoryStorage, SessionSlots, SessionStorage};
use order_sync::testing::{event_payload, order, page, session};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_concurrent_rejections_clear_session_once() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();
    assert_eq!(h.storage.load().unwrap().token.as_deref(), Some("jwt-1"));
    let clears_before = h.storage.clear_count();

    for status in [401, 403, 401] {
        h.api
            .expect_get("a")
            .after(Duration::from_millis(50))
            .return_err(RemoteError::Unauthorized { status });
    }
    let mut sessions = h.system.watch_session();
    sessions.borrow_and_update();

    let orders = &h.system.orders;
    let (first, second, third) = tokio::join!(orders.get("a"), orders.get("a"), orders.get("a"));
    for result in [first, second, third] {
        assert!(matches!(result, Err(OrdersError::Unauthorized)));
    }

    assert_eq!(h.storage.clear_count() - clears_before, 1);
    assert!(h.storage.load().unwrap().is_empty());
    assert_eq!(h.system.session(), SessionState::Anonymous);
    assert!(sessions.has_changed().unwrap());
    sessions.borrow_and_update();
    assert!(!sessions.has_changed().unwrap());

    h.system.settled().await;
    assert_eq!(h.transport.active_subscriptions(), 0);
    h.api.verify();
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rejection_of_old_token_keeps_new_session() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.api.expect_get("a").after(Duration::from_millis(50)).return_err(RemoteError::Unauthorized { status: 401 });
    h.api.expect_login().return_ok(session("jwt-2", "tenant-1"));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();

    let orders = h.system.orders.clone();
    let stale = tokio::spawn(async move { orders.get("a").await });
    while h.api.pending() > 1 {
        tokio::task::yield_now().await;
    }
    h.system.login("dispatch@acme.test", "secret").await.unwrap();

    assert!(matches!(stale.await.unwrap(), Err(OrdersError::Unauthorized)));
    assert_eq!(h.system.session().session().map(|s| s.token.as_str()), Some("jwt-2"));
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_logout_resets_session_scoped_state() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.api.expect_fetch(0, 20).return_ok(page(vec![order("a", OrderStatus::Pending)], 0, 1));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();
    h.transport.wait_for_subscriptions(1).await;
    h.system.orders.fetch(0, 20).await.unwrap();
    h.transport.push(event_payload("a", OrderStatus::Approved));
    wait_for_notifications(&h.system, 1).await;

    assert!(h.system.logout());
    assert!(!h.system.logout());
    h.system.settled().await;

    assert!(h.system.orders.directory().await.unwrap().items.is_empty());
    assert!(h.system.notifications().await.unwrap().is_empty());
    assert_eq!(h.transport.active_subscriptions(), 0);
    assert!(matches!(h.system.orders.fetch(0, 20).await, Err(OrdersError::NotAuthenticated)));
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_persisted_session_starts_channel_without_login() {
    let storage = Arc::new(MemoryStorage::with_slots(SessionSlots::from(&session("jwt-9", "tenant-9"))));
    let h = harness_with(storage);

    assert!(h.system.session().is_authenticated());
    h.transport.wait_for_subscriptions(1).await;
    assert_eq!(h.transport.tokens(), vec!["jwt-9".to_string()]);
    assert_eq!(h.transport.topics(), vec!["orders/tenant-9".to_string()]);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_partial_persisted_session_is_discarded() {
    let storage = Arc::new(MemoryStorage::with_slots(SessionSlots {
        token: Some("jwt-9".into()),
        email: Some("dispatch@acme.test".into()),
        ..SessionSlots::default()
    }));
    let h = harness_with(storage.clone());

    assert_eq!(h.system.session(), SessionState::Anonymous);
    assert!(storage.load().unwrap().is_empty());
    h.system.settled().await;
    assert_eq!(h.transport.connect_attempts(), 0);
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_register_signs_in() {
    let h = harness();
    h.api.expect_register().return_ok(session("jwt-r", "tenant-new"));
    let signed_in = h.system.register("ops@new.test", "secret", "new-co").await.unwrap();
    assert_eq!(signed_in.tenant_id, "tenant-new");
    h.transport.wait_for_subscriptions(1).await;
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_answered_after_logout_stays_out_of_next_session() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-1", "tenant-1"));
    h.api.expect_create().after(Duration::from_millis(100)).return_ok(order("tenant1-order", OrderStatus::Pending));
    h.api.expect_login().return_ok(session("jwt-2", "tenant-2"));
    h.system.login("dispatch@acme.test", "secret").await.unwrap();

    let orders = h.system.orders.clone();
    let create = tokio::spawn(async move {
        orders.create(OrderCreate::new("ORD-1", "Pallets", "Dock 2", 12.5)).await
    });
    while h.api.pending() > 1 {
        tokio::task::yield_now().await;
    }
    assert!(h.system.logout());
    h.system.settled().await;
    h.system.login("ops@other.test", "secret").await.unwrap();

    assert_eq!(create.await.unwrap().unwrap().id, "tenant1-order");
    assert!(h.system.orders.directory().await.unwrap().items.is_empty());
    h.api.verify();
    h.system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_fetch_right_after_switching_sessions_is_applied() {
    let h = harness();
    h.api.expect_login().return_ok(session("jwt-a", "tenant-1"));
    h.api.expect_fetch(0, 20).return_ok(page(vec![order("a", OrderStatus::Pending)], 0, 1));
    h.api.expect_login().return_ok(session("jwt-b", "tenant-2"));
    h.api.expect_fetch(0, 20).return_ok(page(vec![order("b", OrderStatus::Approved)], 0, 1));

    h.system.login("a@acme.test", "secret").await.unwrap();
    h.system.orders.fetch(0, 20).await.unwrap();
    h.system.login("b@other.test", "secret").await.unwrap();

    assert_eq!(h.system.orders.fetch(0, 20).await.unwrap(), FetchOutcome::Applied);
    let snapshot = h.system.orders.directory().await.unwrap();
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].id, "b");
    assert!(!snapshot.loading);
    h.api.verify();
    h.system.shutdown().await.unwrap();
}
