//! Messages accepted by the [`StoreActor`](super::StoreActor).

use crate::directory::{DirectorySnapshot, FetchOutcome, FetchTicket};
use crate::model::{Notification, Order, OrderEvent, OrderPage, SessionKey};
use tokio::sync::oneshot;

/// One-shot reply channel. Store operations cannot fail once delivered.
pub type Response<T> = oneshot::Sender<T>;

/// Every read and write of the session-scoped state goes through one of
/// these variants, so the actor's mailbox order is the write order.
#[derive(Debug)]
pub enum StoreRequest {
    BeginFetch {
        page: u32,
        size: u32,
        respond_to: Response<FetchTicket>,
    },
    CompleteFetch {
        ticket: FetchTicket,
        page: OrderPage,
        respond_to: Response<FetchOutcome>,
    },
    FailFetch {
        ticket: FetchTicket,
        message: String,
        respond_to: Response<FetchOutcome>,
    },
    /// Replies whether the write landed; it is dropped when `owner` no
    /// longer holds the store.
    InsertCreated {
        owner: SessionKey,
        order: Order,
        respond_to: Response<bool>,
    },
    Upsert {
        owner: SessionKey,
        order: Order,
        respond_to: Response<bool>,
    },
    /// Event fan-out. Replies whether the directory was patched.
    ApplyEvent {
        event: OrderEvent,
        respond_to: Response<bool>,
    },
    ClearNotifications {
        respond_to: Response<()>,
    },
    /// Hands the store to a new session. Replies whether it changed hands.
    Open {
        owner: SessionKey,
        respond_to: Response<bool>,
    },
    Reset {
        respond_to: Response<()>,
    },
    Directory {
        respond_to: Response<DirectorySnapshot>,
    },
    Notifications {
        respond_to: Response<Vec<Notification>>,
    },
    LastRequested {
        respond_to: Response<Option<(u32, u32)>>,
    },
    /// Looks an order up on the current page.
    Order {
        order_id: String,
        respond_to: Response<Option<Order>>,
    },
}
