//! Milestone model - a due-dated checkpoint inside a project.
//!
//! The server stores milestones as folders carrying an `isMilestone` marker.
//! The conversions at the bottom of this module are the only place where the
//! two shapes meet; everything above the service layer sees [`Milestone`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::error::{ApiError, ErrorKind};
use crate::folder::{Folder, FolderDraft, FolderPatch};
use crate::id::{MilestoneId, ProjectId};

/// A milestone embedded in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    /// Unique identifier
    pub id: MilestoneId,

    /// Milestone title
    pub milestone_name: String,

    /// Longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Deadline
    pub due_date: NaiveDate,

    /// Current status
    #[serde(default)]
    pub status: MilestoneStatus,

    /// Completion percentage (0..=100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl Milestone {
    /// Apply a field-wise patch.
    pub fn apply(&mut self, patch: MilestonePatch) {
        if let Some(name) = patch.milestone_name {
            self.milestone_name = name;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(due) = patch.due_date {
            self.due_date = due;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = Some(progress.min(100));
        }
    }
}

/// Milestone status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Not started yet
    #[default]
    NotStarted,
    /// Work under way
    InProgress,
    /// Done
    Completed,
    /// Past due and not done
    Overdue,
}

impl std::str::FromStr for MilestoneStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "not_started" => Ok(Self::NotStarted),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "overdue" => Ok(Self::Overdue),
            other => Err(format!("unknown milestone status: {}", other)),
        }
    }
}

/// Fields for creating a milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDraft {
    /// Milestone name
    pub milestone_name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When it is due
    pub due_date: NaiveDate,
}

impl MilestoneDraft {
    /// Express the draft as a milestone folder at the root of `project`.
    pub fn into_folder_draft(self, project: ProjectId) -> FolderDraft {
        FolderDraft {
            name: self.milestone_name,
            repository_id: project,
            parent_folder_id: None,
            is_milestone: true,
            description: self.description,
            due_date: Some(self.due_date),
        }
    }
}

/// Field-wise update of a milestone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestonePatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MilestoneStatus>,
    /// New progress, 0 to 100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl MilestonePatch {
    /// Express the patch as a folder update.
    pub fn into_folder_patch(self) -> FolderPatch {
        FolderPatch {
            name: self.milestone_name,
            description: self.description,
            parent_folder_id: None,
            due_date: self.due_date,
            status: self.status,
            progress: self.progress,
        }
    }
}

impl TryFrom<Folder> for Milestone {
    type Error = ApiError;

    fn try_from(folder: Folder) -> Result<Self, Self::Error> {
        if !folder.is_milestone {
            return Err(ApiError::new(
                ErrorKind::Unknown,
                format!("folder {} is not a milestone", folder.id),
            ));
        }
        let due_date = folder.due_date.ok_or_else(|| {
            ApiError::new(
                ErrorKind::Unknown,
                format!("milestone folder {} has no due date", folder.id),
            )
        })?;
        Ok(Milestone {
            id: folder.id.into(),
            milestone_name: folder.name,
            description: folder.description,
            due_date,
            status: folder.status.unwrap_or_default(),
            progress: folder.progress,
        })
    }
}
