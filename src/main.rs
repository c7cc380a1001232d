//! Demo client: signs in, loads the first page and prints live events.
//!
//! ```bash
//! ORDER_SYNC_API_URL=http://localhost:8080/api \
//! ORDER_SYNC_WS_URL=ws://localhost:8080/ws/websocket \
//! ORDER_SYNC_EMAIL=dispatch@acme.test ORDER_SYNC_PASSWORD=secret \
//! RUST_LOG=info cargo run
//! ```
//!
//! `ORDER_SYNC_CONFIG` may point at a TOML file instead of the URL variables.

use order_sync::config::ClientConfig;
use order_sync::lifecycle::{setup_tracing, Collaborators, TrackerSystem};
use std::time::Duration;
use tracing::{info, warn, Instrument};

fn load_config() -> Result<ClientConfig, String> {
    match std::env::var("ORDER_SYNC_CONFIG") {
        Ok(path) => {
            let source = std::fs::read_to_string(&path).map_err(|e| format!("{path}: {e}"))?;
            ClientConfig::from_toml_str(&source).map_err(|e| e.to_string())
        }
        Err(_) => ClientConfig::from_env().map_err(|e| e.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = load_config()?;
    info!(api = %config.api_base_url, ws = %config.ws_url, "Starting order sync");
    let system = TrackerSystem::start(&config, Collaborators::from_config(&config));

    if !system.session().is_authenticated() {
        let email = std::env::var("ORDER_SYNC_EMAIL").map_err(|_| "ORDER_SYNC_EMAIL not set")?;
        let password =
            std::env::var("ORDER_SYNC_PASSWORD").map_err(|_| "ORDER_SYNC_PASSWORD not set")?;
        let span = tracing::info_span!("login");
        system
            .login(&email, &password)
            .instrument(span)
            .await
            .map_err(|e| e.to_string())?;
    }

    match system.orders.fetch(0, config.page_size).await {
        Ok(_) => {
            let snapshot = system.orders.directory().await.map_err(|e| e.to_string())?;
            info!(
                orders = snapshot.items.len(),
                total_pages = snapshot.total_pages,
                "First page loaded"
            );
        }
        Err(e) => warn!(error = %e, "Initial fetch failed"),
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(10));
    let mut newest: Option<String> = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let notifications = system.notifications().await.map_err(|e| e.to_string())?;
                let unseen: Vec<_> = notifications
                    .iter()
                    .take_while(|n| Some(&n.id) != newest.as_ref())
                    .collect();
                for notification in unseen.iter().rev() {
                    info!(id = %notification.id, "{}", notification.message);
                }
                newest = notifications.first().map(|n| n.id.clone());
                if !system.session().is_authenticated() {
                    warn!("Signed out by the server");
                    break;
                }
            }
        }
    }

    system.shutdown().await.map_err(|e| e.to_string())?;
    info!("Order sync stopped");
    Ok(())
}
