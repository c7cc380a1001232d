//! # Session State
//!
//! [`SessionManager`] is the single owner of the authentication state. It
//! persists the session to a [`SessionStorage`] as one group, rehydrates it
//! at startup, and publishes every transition on a `watch` channel that the
//! lifecycle layer uses to start and stop the event channel.
//!
//! An authentication rejection from any remote call ends up in
//! [`SessionManager::invalidate`], the only logout path besides an explicit
//! user action. The clear is performed under the channel's lock, so any
//! number of concurrent rejections clear the session exactly once.

pub mod storage;

pub use storage::*;

use crate::model::{Session, SessionState};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct SessionManager {
    state: watch::Sender<SessionState>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionManager {
    /// Starts anonymous without reading storage.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        let (state, _) = watch::channel(SessionState::Anonymous);
        Self { state, storage }
    }

    /// Restores a persisted session.
    ///
    /// Anything short of all four slots is treated as "not authenticated"
    /// and the leftover slots are cleared.
    pub fn rehydrate(storage: Arc<dyn SessionStorage>) -> Self {
        let manager = Self::new(storage);
        let restored = match manager.storage.load() {
            Ok(slots) if slots.is_empty() => None,
            Ok(slots) => {
                let session = slots.into_session();
                if session.is_none() {
                    warn!("Discarding partially persisted session");
                }
                session
            }
            Err(e) => {
                warn!(error = %e, "Unreadable persisted session");
                None
            }
        };

        match restored {
            Some(session) => {
                info!(tenant_id = %session.tenant_id, "Session rehydrated");
                manager.state.send_replace(SessionState::Authenticated(session));
            }
            None => {
                if let Err(e) = manager.storage.clear() {
                    warn!(error = %e, "Failed to clear persisted session");
                }
            }
        }
        manager
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().session().map(|s| s.token.clone())
    }

    /// Installs a new session after a successful login or registration.
    ///
    /// Persistence is best effort: a storage failure is logged and the
    /// in-memory session still takes effect.
    pub fn establish(&self, session: Session) {
        if let Err(e) = self.storage.store(&SessionSlots::from(&session)) {
            warn!(error = %e, "Failed to persist session");
        }
        info!(tenant_id = %session.tenant_id, email = %session.email, "Session established");
        self.state.send_replace(SessionState::Authenticated(session));
    }

    /// Explicit user logout. Returns `false` if there was no session.
    pub fn logout(&self) -> bool {
        self.clear_if(|_| true, "logout")
    }

    /// Clears the session after the server rejected `rejected_token`.
    ///
    /// A rejection that arrives after the user already switched sessions
    /// leaves the new session alone. Returns whether this call cleared it.
    pub fn invalidate(&self, rejected_token: &str) -> bool {
        self.clear_if(|session| session.token == rejected_token, "authentication rejected")
    }

    fn clear_if(&self, matches: impl FnOnce(&Session) -> bool, reason: &'static str) -> bool {
        let cleared = self.state.send_if_modified(|state| {
            if !state.session().is_some_and(matches) {
                return false;
            }
            if let Err(e) = self.storage.clear() {
                warn!(error = %e, "Failed to clear persisted session");
            }
            *state = SessionState::Anonymous;
            true
        });
        if cleared {
            info!(reason, "Session cleared");
        }
        cleared
    }
}
