//! Session persistence trait abstraction.

use async_trait::async_trait;
use gradtrack_core::Session;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Durable client-side storage for the authenticated session.
///
/// The credential and the user record are one value: implementations must
/// write them together and clear them together, never one without the other.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session, if any.
    async fn load(&self) -> Result<Option<Session>>;

    /// Persist the session, replacing whatever was stored.
    async fn save(&self, session: &Session) -> Result<()>;

    /// Remove the persisted session. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<()>;
}
