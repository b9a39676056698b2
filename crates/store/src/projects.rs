//! Projects slice, with each project's embedded milestones.
//!
//! A project can be held in several places at once: the list, the detail view
//! and the search results. Milestone merges are applied to every copy of the
//! parent project, so no two copies disagree about its milestones.

use crate::slice::{FetchFence, Reducer, Slice, Ticket};
use gradtrack_core::{ApiError, Milestone, MilestoneId, Project, ProjectId, ProjectStatus};
use serde::Serialize;
use std::str::FromStr;
use tracing::debug;

/// Status filter of the project list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectFilter {
    #[default]
    All,
    Active,
    Pending,
    Completed,
}

impl ProjectFilter {
    pub fn matches(self, status: ProjectStatus) -> bool {
        match self {
            ProjectFilter::All => true,
            ProjectFilter::Active => status == ProjectStatus::Active,
            ProjectFilter::Pending => status == ProjectStatus::Pending,
            ProjectFilter::Completed => status == ProjectStatus::Completed,
        }
    }
}

impl FromStr for ProjectFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            other => ProjectStatus::from_str(other).map(|status| match status {
                ProjectStatus::Active => Self::Active,
                ProjectStatus::Pending => Self::Pending,
                ProjectStatus::Completed => Self::Completed,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectsState {
    #[serde(flatten)]
    pub slice: Slice<Project>,
    pub search_results: Vec<Project>,
    pub filter: ProjectFilter,
    pub search_query: String,
    #[serde(skip)]
    search_fence: FetchFence,
}

#[derive(Debug, Clone)]
pub enum ProjectsAction {
    Pending,
    Failed(ApiError),
    Fetched { ticket: Ticket, projects: Vec<Project> },
    FetchFailed { ticket: Ticket, error: ApiError },
    Loaded(Project),
    Created(Project),
    Updated(Project),
    Deleted(ProjectId),
    Searched { ticket: Ticket, results: Vec<Project> },
    SearchFailed { ticket: Ticket, error: ApiError },
    SearchCleared,
    MilestoneCreated { project: ProjectId, milestone: Milestone },
    MilestoneUpdated { project: ProjectId, milestone: Milestone },
    MilestoneDeleted { project: ProjectId, milestone: MilestoneId },
    FilterSet(ProjectFilter),
    SearchQuerySet(String),
    SelectionCleared,
    ErrorCleared,
}

impl ProjectsState {
    /// Start a list fetch.
    pub fn begin_fetch(&mut self) -> Ticket {
        self.slice.begin_fetch()
    }

    /// Start a keyword search.
    pub fn begin_search(&mut self) -> Ticket {
        self.slice.begin();
        self.search_fence.issue(())
    }

    /// Projects passing the status filter and the search query, in list order.
    pub fn visible(&self) -> Vec<&Project> {
        let query = self.search_query.trim().to_lowercase();
        self.slice
            .items
            .iter()
            .filter(|p| self.filter.matches(p.status))
            .filter(|p| {
                query.is_empty()
                    || p.name.to_lowercase().contains(&query)
                    || p.short_description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query))
            })
            .collect()
    }

    /// Apply `f` to every held copy of project `id`.
    fn each_copy(&mut self, id: ProjectId, mut f: impl FnMut(&mut Project)) {
        let copies = self
            .slice
            .items
            .iter_mut()
            .chain(self.slice.selected.iter_mut())
            .chain(self.search_results.iter_mut())
            .filter(|p| p.id == id);
        for project in copies {
            f(project);
        }
    }
}

fn upsert_milestone(milestones: &mut Vec<Milestone>, milestone: &Milestone) {
    match milestones.iter_mut().find(|m| m.id == milestone.id) {
        Some(existing) => *existing = milestone.clone(),
        None => milestones.push(milestone.clone()),
    }
}

impl Reducer for ProjectsState {
    type Action = ProjectsAction;
    const NAME: &'static str = "projects";

    fn reduce(&mut self, action: ProjectsAction) {
        match action {
            ProjectsAction::Pending => self.slice.begin(),
            ProjectsAction::Failed(err) => self.slice.fail(err),
            ProjectsAction::Fetched { ticket, projects } => {
                if !self.slice.settle_fetch(ticket, projects) {
                    debug!("Discarding superseded project list");
                }
            }
            ProjectsAction::FetchFailed { ticket, error } => {
                if !self.slice.fail_fetch(ticket, error) {
                    debug!("Discarding superseded project list failure");
                }
            }
            ProjectsAction::Loaded(project) => self.slice.select(project),
            ProjectsAction::Created(project) => self.slice.append(project),
            ProjectsAction::Updated(project) => {
                for copy in self.search_results.iter_mut().filter(|p| p.id == project.id) {
                    *copy = project.clone();
                }
                self.slice.replace(project);
            }
            ProjectsAction::Deleted(id) => {
                self.search_results.retain(|p| p.id != id);
                self.slice.remove(id);
            }
            ProjectsAction::Searched { ticket, results } => {
                if self.search_fence.is_latest(&(), ticket) {
                    self.slice.settle();
                    self.search_results = results;
                } else {
                    debug!("Discarding superseded search results");
                }
            }
            ProjectsAction::SearchFailed { ticket, error } => {
                if self.search_fence.is_latest(&(), ticket) {
                    self.slice.fail(error);
                }
            }
            ProjectsAction::SearchCleared => self.search_results.clear(),
            // milestones created twice (e.g. a replayed response) are upserted
            ProjectsAction::MilestoneCreated { project, milestone } => {
                self.slice.settle();
                self.each_copy(project, |p| upsert_milestone(&mut p.milestones, &milestone));
            }
            ProjectsAction::MilestoneUpdated { project, milestone } => {
                self.slice.settle();
                self.each_copy(project, |p| {
                    if let Some(existing) = p.milestones.iter_mut().find(|m| m.id == milestone.id) {
                        *existing = milestone.clone();
                    }
                });
            }
            ProjectsAction::MilestoneDeleted { project, milestone } => {
                self.slice.settle();
                self.each_copy(project, |p| p.milestones.retain(|m| m.id != milestone));
            }
            ProjectsAction::FilterSet(filter) => self.filter = filter,
            ProjectsAction::SearchQuerySet(query) => self.search_query = query,
            ProjectsAction::SelectionCleared => self.slice.clear_selected(),
            ProjectsAction::ErrorCleared => self.slice.clear_error(),
        }
    }
}
