//! In-memory session storage, used by tests and the mock backend.

use async_trait::async_trait;
use gradtrack_core::Session;
use tokio::sync::Mutex;
use super::{Result, SessionStore};

/// Session storage that lives only as long as the process.
#[derive(Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session.
    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<()> {
        *self.slot.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.lock().await = None;
        Ok(())
    }
}
