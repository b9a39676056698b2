//! Folder model - the tree of folders under a project.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{FolderId, ProjectId};
use crate::milestone::MilestoneStatus;

/// A folder. Root folders have no parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    /// Unique identifier
    pub id: FolderId,

    /// Folder name
    pub name: String,

    /// Description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parent folder, `None` for root folders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<FolderId>,

    /// Owning project
    pub repository_id: ProjectId,

    /// Marks the folder as a milestone
    #[serde(default)]
    pub is_milestone: bool,

    /// Deadline, milestones only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Milestone status, when the server tracks one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MilestoneStatus>,

    /// Milestone completion percentage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl Folder {
    /// Whether this is a root folder of its project.
    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }

    /// Apply a field-wise patch.
    pub fn apply(&mut self, patch: FolderPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(parent) = patch.parent_folder_id {
            self.parent_folder_id = parent;
        }
        if let Some(due) = patch.due_date {
            self.due_date = Some(due);
        }
        if let Some(status) = patch.status {
            self.status = Some(status);
        }
        if let Some(progress) = patch.progress {
            self.progress = Some(progress.min(100));
        }
    }
}

/// Fields for creating a folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDraft {
    /// Folder name
    pub name: String,
    /// Owning project
    pub repository_id: ProjectId,
    /// Parent folder; none for a root folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<FolderId>,
    /// Create as a milestone
    #[serde(default)]
    pub is_milestone: bool,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Due date, for milestones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// Field-wise update of a folder.
///
/// `parent_folder_id` is doubly optional: `Some(None)` moves the folder to the
/// project root, `None` leaves the parent untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Move under another parent; `Some(None)` moves to the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<Option<FolderId>>,
    /// New due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// New milestone status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MilestoneStatus>,
    /// New milestone progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}
