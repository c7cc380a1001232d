//! # System Lifecycle
//!
//! Wiring and teardown of the sync core. [`TrackerSystem`] owns the store
//! actor, the session manager and a supervisor task that keeps the event
//! channel in step with the session:
//!
//! - signed in: the channel is started for that session
//! - signed out (explicitly or by a rejected token): the channel is stopped
//!   and the session-scoped store is reset
//! - a different session replacing the current one: both of the above
//!
//! Session changes are observed through a `watch` channel, so a burst of
//! changes collapses to the latest one and the channel never runs for a
//! session that is already gone.

pub mod tracing;
pub mod tracker_system;

pub use self::tracing::setup_tracing;
pub use tracker_system::*;
