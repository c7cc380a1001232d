//! Pure data structures shared by every layer of the sync core.
//!
//! Wire shapes follow the remote service's JSON (camelCase fields, upper-case
//! status strings), so the same types serve the REST client, the event
//! channel and the in-memory state.

pub mod event;
pub mod order;
pub mod session;
pub mod status;

pub use event::*;
pub use order::*;
pub use session::*;
pub use status::*;
