//! # Log Output
//!
//! Everything in the crate logs through `tracing` with structured fields
//! (`order_id`, `tenant_id`, `topic`, `seq`, `attempt`). The library never
//! installs a subscriber; binaries call [`setup_tracing`] once.
//!
//! ```bash
//! # Lifecycle edges only: session, channel connect/retry, store start/stop
//! RUST_LOG=info cargo run
//!
//! # Plus fetch tickets, event fan-out and STOMP frames
//! RUST_LOG=debug cargo run
//!
//! # Only the channel worker
//! RUST_LOG=order_sync::channel=debug cargo run
//! ```
//!
//! A reconnect after a dropped connection looks like:
//!
//! ```text
//! INFO Event channel subscribed topic=orders/5b0c...
//! WARN Event channel failed, retrying error=Connection dropped: ... failures=1 delay_ms=5000
//! INFO Event channel subscribed topic=orders/5b0c...
//! ```

/// Installs a compact fmt subscriber filtered by `RUST_LOG`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
