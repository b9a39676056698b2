//! Unique identifiers for GradTrack entities.
//!
//! Server-owned entities carry numeric identifiers assigned by the backend.
//! They are opaque to the client and never reused within a session.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.parse()?))
            }
        }
    };
}

entity_id!(
    /// Identifier of a user account.
    UserId
);
entity_id!(
    /// Identifier of a project (a.k.a. repository).
    ProjectId
);
entity_id!(
    /// Identifier of a milestone. Shares the folder id space on the server.
    MilestoneId
);
entity_id!(
    /// Identifier of a folder inside a project.
    FolderId
);
entity_id!(
    /// Identifier of an uploaded file.
    FileId
);
entity_id!(
    /// Identifier of a review comment.
    CommentId
);
entity_id!(
    /// Identifier of a notification.
    NotificationId
);

impl From<MilestoneId> for FolderId {
    fn from(id: MilestoneId) -> Self {
        Self(id.0)
    }
}

impl From<FolderId> for MilestoneId {
    fn from(id: FolderId) -> Self {
        Self(id.0)
    }
}

/// Client-side identifier for an upload that has not settled yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UploadId(Ulid);

impl UploadId {
    /// Generate a new UploadId
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for UploadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
