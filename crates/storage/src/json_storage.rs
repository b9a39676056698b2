//! JSON file session storage.
//!
//! Stores the session as a single JSON document with the fixed keys `token`
//! and `user`. Writes go to a sibling temp file that is renamed over the
//! target, so a reader sees either the old pair or the new pair.

use std::path::{Path, PathBuf};
use async_trait::async_trait;
use gradtrack_core::Session;
use tokio::fs;
use tracing::{debug, warn};
use super::{Result, SessionStore};

/// File name of the persisted session inside the storage directory.
pub const SESSION_FILE: &str = "session.json";

/// File-based JSON session storage.
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    /// Create storage rooted at `dir`, creating the directory if needed.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            path: dir.join(SESSION_FILE),
        })
    }

    /// Path of the session document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn load(&self) -> Result<Option<Session>> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let value: serde_json::Value = serde_json::from_str(&json)?;
        if value.get("token").is_none() || value.get("user").is_none() {
            warn!("Ignoring incomplete session document at {}", self.path.display());
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string_pretty(session)?;
        let tmp = self.temp_path();
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Persisted session for user {}", session.user.id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        fs::remove_file(&self.path).await.or_else(|e| {
            if e.kind() == std::io::ErrorKind::NotFound { Ok(()) } else { Err(e) }
        })?;
        debug!("Cleared persisted session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradtrack_core::{Role, User, UserId};

    fn create_test_session() -> Session {
        Session {
            token: "mock-student-token-123".to_string(),
            user: User {
                id: UserId(1),
                name: "Test Student".to_string(),
                email: "student@test.com".to_string(),
                role: Role::Student,
                student_id: Some("ST001".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path()).await.unwrap();

        assert!(store.load().await.unwrap().is_none());

        let session = create_test_session();
        store.save(&session).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(session));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_document_uses_fixed_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path()).await.unwrap();
        store.save(&create_test_session()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["token"], "mock-student-token-123");
        assert_eq!(value["user"]["email"], "student@test.com");
    }

    #[tokio::test]
    async fn test_clear_removes_both_halves() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path()).await.unwrap();
        store.save(&create_test_session()).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.path().exists());

        // clearing twice is fine
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_incomplete_document_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path()).await.unwrap();
        std::fs::write(store.path(), r#"{"token":"orphan"}"#).unwrap();

        assert!(store.load().await.unwrap().is_none());
    }
}
