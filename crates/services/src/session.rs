//! The live session, shared by the transport and the store.

use gradtrack_core::{Session, User};
use gradtrack_storage::{SessionStore, StorageError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Holder of the authenticated session.
///
/// The in-memory copy and the persisted copy change together: `set` persists
/// before publishing, `clear` drops both. Cloning shares the same session.
#[derive(Clone)]
pub struct SessionContext {
    current: Arc<RwLock<Option<Session>>>,
    store: Arc<dyn SessionStore>,
}

impl SessionContext {
    /// Create an empty context backed by `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            store,
        }
    }

    /// Load the persisted session, if any, and make it live.
    pub async fn init(&self) -> Result<Option<Session>, StorageError> {
        let restored = self.store.load().await?;
        if let Some(session) = &restored {
            info!("Restored session for {}", session.user.email);
        }
        *self.current.write().await = restored.clone();
        Ok(restored)
    }

    /// Persist `session` and make it live.
    pub async fn set(&self, session: Session) -> Result<(), StorageError> {
        self.store.save(&session).await?;
        debug!("Session set for user {}", session.user.id);
        *self.current.write().await = Some(session);
        Ok(())
    }

    /// Drop the live session and its persisted copy.
    ///
    /// The in-memory session is gone even if removing the persisted copy fails.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.current.write().await.take();
        self.store.clear().await
    }

    /// Snapshot of the live session.
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Bearer token of the live session.
    pub async fn token(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|s| s.token.clone())
    }

    /// User of the live session.
    pub async fn user(&self) -> Option<User> {
        self.current.read().await.as_ref().map(|s| s.user.clone())
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}
