//! Durable storage for the four session slots.
//!
//! Slots are always written and cleared as a group. The file backend writes
//! to a sibling temp file and renames it over the target, so a crash leaves
//! either the old group or the new one.

use crate::model::Session;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Session storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Session storage encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Session storage lock poisoned")]
    Poisoned,
}

/// Raw slot values as found in storage; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSlots {
    pub token: Option<String>,
    pub email: Option<String>,
    pub tenant_id: Option<String>,
    pub role: Option<String>,
}

impl SessionSlots {
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.email.is_none() && self.tenant_id.is_none() && self.role.is_none()
    }

    /// Returns a session only when every slot holds a non-blank value.
    pub fn into_session(self) -> Option<Session> {
        let present = |slot: Option<String>| slot.filter(|v| !v.trim().is_empty());
        Some(Session {
            token: present(self.token)?,
            email: present(self.email)?,
            tenant_id: present(self.tenant_id)?,
            role: present(self.role)?,
        })
    }
}

impl From<&Session> for SessionSlots {
    fn from(session: &Session) -> Self {
        Self {
            token: Some(session.token.clone()),
            email: Some(session.email.clone()),
            tenant_id: Some(session.tenant_id.clone()),
            role: Some(session.role.clone()),
        }
    }
}

/// Durable local storage collaborator.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<SessionSlots, StorageError>;
    fn store(&self, slots: &SessionSlots) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
}

/// Process-local storage, used when no session file is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<SessionSlots>,
    clears: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slots(slots: SessionSlots) -> Self {
        Self {
            slots: Mutex::new(slots),
            clears: AtomicUsize::new(0),
        }
    }

    /// Number of times `clear` has been called.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<SessionSlots, StorageError> {
        Ok(self.slots.lock().map_err(|_| StorageError::Poisoned)?.clone())
    }

    fn store(&self, slots: &SessionSlots) -> Result<(), StorageError> {
        *self.slots.lock().map_err(|_| StorageError::Poisoned)? = slots.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.slots.lock().map_err(|_| StorageError::Poisoned)? = SessionSlots::default();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// JSON file holding all four slots.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<SessionSlots, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SessionSlots::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, slots: &SessionSlots) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let temp = self.temp_path();
        fs::write(&temp, serde_json::to_vec_pretty(slots)?)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
