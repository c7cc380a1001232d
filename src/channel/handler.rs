//! Fan-out seam between the channel and the state it feeds.

use crate::model::OrderEvent;
use crate::store::StoreClient;
use async_trait::async_trait;
use tracing::warn;

/// Receives every validated inbound event, once, in arrival order.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: OrderEvent);
}

/// Fans the event out to the notification queue and then the directory.
#[async_trait]
impl EventHandler for StoreClient {
    async fn handle(&self, event: OrderEvent) {
        let order_id = event.order_id.clone();
        if let Err(e) = self.apply_event(event).await {
            warn!(%order_id, error = %e, "Event fan-out failed");
        }
    }
}
