//! Notification model.

use serde::{Deserialize, Serialize};
use crate::id::NotificationId;
use crate::Time;

/// A notification shown in the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Unique identifier
    pub id: NotificationId,

    /// Whether the user has seen it
    #[serde(default)]
    pub read: bool,

    /// Short title
    #[serde(default)]
    pub title: String,

    /// Body text
    #[serde(default)]
    pub message: String,

    /// Category, e.g. `comment`, `deadline`, `upload`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// When it was emitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Time>,
}

impl Notification {
    /// Create an unread notification.
    pub fn new(id: NotificationId, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            read: false,
            title: title.into(),
            message: message.into(),
            kind: None,
            created_at: Some(chrono::Utc::now()),
        }
    }
}
