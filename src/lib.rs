//! # Order Sync
//!
//! Real-time synchronization core for a multi-tenant logistics order tracker.
//!
//! A signed-in user sees one page of their tenant's orders. The page is
//! loaded over REST and kept fresh by status events the server pushes on a
//! tenant-scoped STOMP topic. This crate owns that part of the client:
//!
//! - **[channel]**: the event subscription, with a fixed-delay reconnect loop.
//! - **[store]**: a single-owner actor holding the [`directory`] (current page
//!   of orders) and the [`notifications`] queue. Events and REST results are
//!   both applied through its mailbox, so they never interleave mid-update.
//! - **[clients]**: [`OrdersClient`](clients::OrdersClient), the page-level
//!   fetch/create/transition API.
//! - **[session]**: the authentication state, persisted across restarts and
//!   cleared exactly once when the server rejects its token.
//! - **[remote]**: seams to the REST services, with a `reqwest` client and
//!   scripted mocks.
//! - **[lifecycle]**: [`TrackerSystem`](lifecycle::TrackerSystem), which wires
//!   it all together and starts or stops the channel as the session changes.
//!
//! The REST service is always the source of truth. Events only patch the
//! status of orders already on the page, and the next fetch replaces the page
//! wholesale.
//!
//! ## Testing
//!
//! [`remote::mock::MockApi`] and [`channel::mock::MockTransport`] script the
//! two external collaborators. Fixture builders live in `testing`, compiled
//! only for this crate's tests or with the `testing` feature.

pub mod channel;
pub mod clients;
pub mod config;
pub mod directory;
pub mod lifecycle;
pub mod model;
pub mod notifications;
pub mod remote;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
