//! # Session Store
//!
//! The Order Directory and the Notification Queue are written by three
//! independent contexts (fetch, create, event fan-out). Under a
//! multi-threaded runtime those writes must be serialised without changing
//! their interleaving, so both structures live inside a single
//! [`StoreActor`] that processes [`StoreRequest`]s one at a time.
//!
//! - [`StoreState`] holds the data and the synchronous fan-out step.
//! - [`StoreActor`] owns the state and the receiving end of the channel.
//! - [`StoreClient`] is the cloneable, typed interface used everywhere else.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod state;

pub use actor::StoreActor;
pub use client::StoreClient;
pub use error::StoreError;
pub use message::{Response, StoreRequest};
pub use state::StoreState;
