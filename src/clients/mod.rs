//! Page-level entry points into the sync core.

pub mod orders_client;

pub use orders_client::*;
