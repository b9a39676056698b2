//! GradTrack core data models.
//!
//! This crate defines the entities mirrored by the client (projects,
//! milestones, folders, files, comments, notifications and the session) and
//! the failure taxonomy shared by every service call.

#![warn(missing_docs)]

// Core identities
mod id;
mod error;

// Accounts
mod user;

// Project tree
mod project;
mod milestone;
mod folder;

// Deliverables and feedback
mod file;
mod comment;
mod notification;

// Re-exports
pub use id::*;
pub use error::{ApiError, ApiResult, ErrorKind};
pub use user::{Credentials, Registration, Role, Session, User, UserRef};
pub use project::{Project, ProjectDraft, ProjectPatch, ProjectStatus, Team};
pub use milestone::{Milestone, MilestoneDraft, MilestonePatch, MilestoneStatus};
pub use folder::{Folder, FolderDraft, FolderPatch};
pub use file::{
    bare_file_name, filename_from_content_disposition, Download, FileRecord, FileScope, FileUpload,
    DEFAULT_DOWNLOAD_NAME,
};
pub use comment::{rating_in_range, Comment, CommentDraft, CommentPatch, MAX_RATING, MIN_RATING};
pub use notification::Notification;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;

/// An entity with a stable identifier, as held by a store slice.
pub trait Entity: Clone {
    /// Identifier type
    type Id: Copy + Eq + std::hash::Hash + std::fmt::Debug;

    /// The entity's identifier.
    fn id(&self) -> Self::Id;
}

macro_rules! impl_entity {
    ($($ty:ty => $id:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                type Id = $id;

                fn id(&self) -> Self::Id {
                    self.id
                }
            }
        )*
    };
}

impl_entity!(
    Project => ProjectId,
    Milestone => MilestoneId,
    Folder => FolderId,
    FileRecord => FileId,
    Comment => CommentId,
    Notification => NotificationId,
);
