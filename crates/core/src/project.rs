//! Project model - a capstone project (the server calls it a repository).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::id::{ProjectId, UserId};
use crate::milestone::{Milestone, MilestoneStatus};
use crate::user::UserRef;

/// A capstone project with its embedded milestones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// Project name
    #[serde(alias = "projectName")]
    pub name: String,

    /// One-line description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,

    /// Lifecycle status
    pub status: ProjectStatus,

    /// Start of the project window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// End of the project window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Assigned supervisor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<UserRef>,

    /// Student team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,

    /// Ordered milestones owned by this project
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl Project {
    /// Number of milestones marked completed.
    pub fn completed_milestones(&self) -> usize {
        self.milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .count()
    }

    /// Apply a field-wise patch.
    pub fn apply(&mut self, patch: ProjectPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.short_description {
            self.short_description = Some(description);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(start) = patch.start_date {
            self.start_date = Some(start);
        }
        if let Some(end) = patch.end_date {
            self.end_date = Some(end);
        }
    }
}

/// Project status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    /// In progress
    Active,
    /// Awaiting approval
    Pending,
    /// Finished
    Completed,
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown project status: {}", other)),
        }
    }
}

/// Team membership.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Team {
    /// Member user ids
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// Fields for creating a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDraft {
    /// Project name
    pub name: String,
    /// One-line summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// Planned start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Planned end
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Supervisor to assign
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_id: Option<UserId>,
}

impl ProjectDraft {
    /// Draft with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_description: None,
            start_date: None,
            end_date: None,
            supervisor_id: None,
        }
    }
}

/// Field-wise update of a project. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    /// New start date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// New end date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}
