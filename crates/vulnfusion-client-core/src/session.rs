use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session file io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is not valid json: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no writable config directory on this system")]
    NoConfigDir,
}

/// Persistence seam for the bearer credential. The console keeps exactly one
/// persisted key; nothing else survives a restart.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, SessionStoreError>;
    fn persist(&self, token: &str) -> Result<(), SessionStoreError>;
    fn clear(&self) -> Result<(), SessionStoreError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: String,
}

/// Token store backed by a single JSON file under the user config dir.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/vulnfusion/session.json`.
    pub fn default_path() -> Result<PathBuf, SessionStoreError> {
        let base = dirs::config_dir().ok_or(SessionStoreError::NoConfigDir)?;
        Ok(base.join("vulnfusion").join(SESSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, SessionStoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let persisted: PersistedSession = serde_json::from_str(&raw)?;
        Ok(Some(persisted.token))
    }

    fn persist(&self, token: &str) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let persisted = PersistedSession {
            token: token.to_string(),
        };
        std::fs::write(&self.path, serde_json::to_string(&persisted)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory token store for tests and `--no-persist` runs.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, SessionStoreError> {
        Ok(lock(&self.token).clone())
    }

    fn persist(&self, token: &str) -> Result<(), SessionStoreError> {
        *lock(&self.token) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *lock(&self.token) = None;
        Ok(())
    }
}

type ClearedHook = Box<dyn Fn() + Send + Sync>;

/// The one piece of mutable shared state in the client. Written only by the
/// login flow and the gateway's 401 handler.
pub struct SessionStore {
    token: Mutex<Option<String>>,
    store: Box<dyn TokenStore>,
    on_cleared: Mutex<Option<ClearedHook>>,
}

impl SessionStore {
    /// Reads the persisted credential once. A malformed or unreadable store
    /// degrades to an absent session rather than failing startup.
    pub fn open(store: Box<dyn TokenStore>) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted session, starting logged out");
                None
            }
        };
        Self {
            token: Mutex::new(token),
            store,
            on_cleared: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::open(Box::new(MemoryTokenStore::new()))
    }

    /// Invoked synchronously by `clear()` when a live session is discarded.
    /// The shell uses this as its hard navigation back to the login view.
    pub fn set_on_cleared(&self, hook: impl Fn() + Send + Sync + 'static) {
        *lock(&self.on_cleared) = Some(Box::new(hook));
    }

    pub fn token(&self) -> Option<String> {
        lock(&self.token).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.token).is_some()
    }

    /// Login-flow writer. The credential is opaque; validity is the
    /// backend's concern.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), SessionStoreError> {
        let token = token.into();
        *lock(&self.token) = Some(token.clone());
        self.store.persist(&token)
    }

    /// Discards the credential and fires the cleared hook. A no-op when no
    /// session is held, so redundant 401s do not re-trigger navigation.
    pub fn clear(&self) {
        let had_token = lock(&self.token).take().is_some();
        if !had_token {
            return;
        }
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "failed to remove persisted session");
        }
        if let Some(hook) = lock(&self.on_cleared).as_ref() {
            hook();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn open_reads_persisted_token_once() {
        let session = SessionStore::open(Box::new(MemoryTokenStore::with_token("tok-1")));
        assert_eq!(session.token().as_deref(), Some("tok-1"));
        assert!(session.is_authenticated());
    }

    #[test]
    fn clear_fires_hook_only_when_a_session_was_held() {
        let fired = Arc::new(AtomicUsize::new(0));
        let session = SessionStore::in_memory();
        let counter = fired.clone();
        session.set_on_cleared(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        session.clear();
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        session.set_token("tok-2").unwrap();
        session.clear();
        session.clear();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");
        let store = FileTokenStore::new(&path);

        assert!(store.load().unwrap().is_none());
        store.persist("tok-3").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("tok-3"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing an already-absent file stays ok
        store.clear().unwrap();
    }

    #[test]
    fn malformed_session_file_degrades_to_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let session = SessionStore::open(Box::new(FileTokenStore::new(&path)));
        assert!(!session.is_authenticated());
    }
}
