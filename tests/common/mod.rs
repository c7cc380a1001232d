#![allow(dead_code)]

use order_sync::channel::mock::MockTransport;
use order_sync::config::ClientConfig;
use order_sync::lifecycle::{Collaborators, TrackerSystem};
use order_sync::remote::mock::MockApi;
use order_sync::session::MemoryStorage;
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub system: TrackerSystem,
    pub api: MockApi,
    pub transport: MockTransport,
    pub storage: Arc<MemoryStorage>,
}

pub fn harness() -> Harness {
    harness_with(Arc::new(MemoryStorage::new()))
}

pub fn harness_with(storage: Arc<MemoryStorage>) -> Harness {
    let api = MockApi::new();
    let transport = MockTransport::new();
    let collaborators = Collaborators {
        orders: Arc::new(api.clone()),
        auth: Arc::new(api.clone()),
        transport: Arc::new(transport.clone()),
        storage: storage.clone(),
    };
    let system = TrackerSystem::start(&ClientConfig::default(), collaborators);
    Harness { system, api, transport, storage }
}

/// Polls `check` until it holds, failing the test after a couple of seconds.
pub async fn eventually(what: &str, check: impl Fn() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition never held: {what}");
}

/// Waits until the notification queue holds `count` entries.
pub async fn wait_for_notifications(system: &TrackerSystem, count: usize) {
    for _ in 0..200 {
        if system.notifications().await.map(|n| n.len()).unwrap_or(0) >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("never saw {count} notifications");
}
