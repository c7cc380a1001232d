use crate::channel::{ChannelStatus, EventChannel, EventHandler, EventTransport, WebSocketTransport};
use crate::clients::OrdersClient;
use crate::config::ClientConfig;
use crate::model::{LoginRequest, Notification, RegisterRequest, Session, SessionState};
use crate::remote::{AuthService, HttpApi, OrderService, RemoteError};
use crate::session::{FileStorage, MemoryStorage, SessionManager, SessionStorage};
use crate::store::{StoreActor, StoreClient, StoreError};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Task failed: {0}")]
    Task(String),
}

/// External collaborators the system is built on.
pub struct Collaborators {
    pub orders: Arc<dyn OrderService>,
    pub auth: Arc<dyn AuthService>,
    pub transport: Arc<dyn EventTransport>,
    pub storage: Arc<dyn SessionStorage>,
}

impl Collaborators {
    /// REST over `reqwest`, STOMP over WebSocket, file or memory session storage.
    pub fn from_config(config: &ClientConfig) -> Self {
        let api = Arc::new(HttpApi::new(config.api_base_url.clone()));
        let storage: Arc<dyn SessionStorage> = match &config.session_file {
            Some(path) => Arc::new(FileStorage::new(path.clone())),
            None => Arc::new(MemoryStorage::new()),
        };
        Self {
            orders: api.clone(),
            auth: api,
            transport: Arc::new(
                WebSocketTransport::new(config.ws_url.clone()).with_heart_beat(config.heart_beat),
            ),
            storage,
        }
    }
}

/// The running sync core.
///
/// ```ignore
/// let config = ClientConfig::from_env()?;
/// let system = TrackerSystem::start(&config, Collaborators::from_config(&config));
/// system.login("dispatch@acme.test", "secret").await?;
/// system.orders.fetch(0, config.page_size).await?;
/// // ... events now patch the directory as they arrive ...
/// system.shutdown().await?;
/// ```
pub struct TrackerSystem {
    pub orders: OrdersClient,
    pub store: StoreClient,
    session: Arc<SessionManager>,
    auth: Arc<dyn AuthService>,
    channel_status: watch::Receiver<ChannelStatus>,
    applied: watch::Receiver<SessionState>,
    stop_supervisor: oneshot::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl TrackerSystem {
    /// Spawns the store actor and the session supervisor.
    ///
    /// A session persisted by an earlier run is restored first, so the event
    /// channel comes up without a new login.
    pub fn start(config: &ClientConfig, collaborators: Collaborators) -> Self {
        let session = Arc::new(SessionManager::rehydrate(collaborators.storage));

        let (mut store_actor, store) = StoreActor::new(config.store_buffer, config.notification_capacity);
        if let Some(restored) = session.current().session() {
            store_actor.open(restored.key());
        }
        let store_handle = tokio::spawn(store_actor.run());

        let mut channel = EventChannel::new(collaborators.transport, config.reconnect_delay);
        channel.on_event(Arc::new(store.clone()) as Arc<dyn EventHandler>);
        let channel_status = channel.watch_status();

        let (applied_tx, applied) = watch::channel(SessionState::Anonymous);
        let (stop_supervisor, stop) = oneshot::channel();
        let supervisor = Supervisor {
            channel,
            store: store.clone(),
            sessions: session.subscribe(),
            applied: applied_tx,
        };
        let supervisor_handle = tokio::spawn(supervisor.run(stop));

        let orders = OrdersClient::new(
            session.clone(),
            store.clone(),
            collaborators.orders,
            config.page_size,
        );

        Self {
            orders,
            store,
            session,
            auth: collaborators.auth,
            channel_status,
            applied,
            stop_supervisor,
            handles: vec![supervisor_handle, store_handle],
        }
    }

    /// Signs in and waits until the store and the event channel belong to the
    /// new session.
    ///
    /// # Returns
    /// The session the server issued. A fetch made after this returns is
    /// never undone by the switch from a previous session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SystemError> {
        let request = LoginRequest { email: email.to_string(), password: password.to_string() };
        let session = self.auth.login(&request).await?;
        self.session.establish(session.clone());
        self.settled().await;
        Ok(session)
    }

    /// Registers a user (and the tenant, if new) and signs them in, with the
    /// same guarantee as [`login`](Self::login).
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        tenant_slug: &str,
    ) -> Result<Session, SystemError> {
        let request = RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            tenant_slug: tenant_slug.to_string(),
        };
        let session = self.auth.register(&request).await?;
        self.session.establish(session.clone());
        self.settled().await;
        Ok(session)
    }

    /// Ends the session. The store is reset in the background; await
    /// [`settled`](Self::settled) to observe it.
    ///
    /// # Returns
    /// `false` if nobody was signed in.
    pub fn logout(&self) -> bool {
        self.session.logout()
    }

    /// Snapshot of the authentication state.
    pub fn session(&self) -> SessionState {
        self.session.current()
    }

    pub fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe()
    }

    /// # Returns
    /// Where the event channel stands. [`ChannelStatus::Idle`] while signed
    /// out.
    pub fn channel_status(&self) -> ChannelStatus {
        *self.channel_status.borrow()
    }

    pub fn watch_channel(&self) -> watch::Receiver<ChannelStatus> {
        self.channel_status.clone()
    }

    /// Waits until the supervisor has acted on the current session state.
    ///
    /// The target is re-read on every step, so a session that changes again
    /// while waiting (a rejection, say) is followed rather than waited on.
    pub async fn settled(&self) {
        let mut applied = self.applied.clone();
        let _ = applied.wait_for(|state| *state == self.session.current()).await;
    }

    /// Notifications received this session, newest first.
    pub async fn notifications(&self) -> Result<Vec<Notification>, SystemError> {
        Ok(self.store.notifications().await?)
    }

    pub async fn clear_notifications(&self) -> Result<(), SystemError> {
        Ok(self.store.clear_notifications().await?)
    }

    /// Stops the event channel, then the store actor once every client is gone.
    ///
    /// # Returns
    /// [`SystemError::Task`] if one of the spawned tasks panicked.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down sync core");
        let _ = self.stop_supervisor.send(());
        drop(self.orders);
        drop(self.store);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Task failed during shutdown");
                return Err(SystemError::Task(e.to_string()));
            }
        }
        info!("Sync core shutdown complete");
        Ok(())
    }
}

struct Supervisor {
    channel: EventChannel,
    store: StoreClient,
    sessions: watch::Receiver<SessionState>,
    applied: watch::Sender<SessionState>,
}

impl Supervisor {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        debug!("Session supervisor started");
        let mut current = SessionState::Anonymous;

        loop {
            let next = self.sessions.borrow_and_update().clone();
            if next != current {
                self.apply(&current, &next).await;
                current = next;
            }
            self.applied.send_replace(current.clone());

            tokio::select! {
                _ = &mut stop => break,
                changed = self.sessions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.channel.stop().await;
        debug!("Session supervisor stopped");
    }

    async fn apply(&mut self, previous: &SessionState, next: &SessionState) {
        if previous.is_authenticated() {
            self.channel.stop().await;
            if let Err(e) = self.store.reset().await {
                warn!(error = %e, "Failed to reset store");
            }
        }
        if let Some(session) = next.session() {
            if let Err(e) = self.store.open(session.key()).await {
                warn!(error = %e, "Failed to open store");
            }
        }
        if let Err(e) = self.channel.start(next) {
            warn!(error = %e, "Event channel not started");
        }
    }
}
