//! Dashboard summary and milestone progress.

use chrono::{Days, NaiveDate};
use gradtrack_core::{FileRecord, Milestone, MilestoneId, MilestoneStatus, Project, ProjectId};
use serde::Serialize;

/// Incomplete milestones due before `today + DUE_SOON_DAYS` count as due soon.
pub const DUE_SOON_DAYS: u64 = 7;

/// Incomplete milestones due before `today + DEADLINE_WINDOW_DAYS` are listed
/// as upcoming deadlines.
pub const DEADLINE_WINDOW_DAYS: u64 = 14;

/// Length of the deadline and recent-file lists.
pub const RECENT_LIMIT: usize = 5;

/// Share of a project's milestones that are completed, as a rounded
/// percentage. A project without milestones is at 0.
pub fn project_progress(project: &Project) -> u8 {
    let total = project.milestones.len();
    if total == 0 {
        return 0;
    }
    let completed = project.completed_milestones();
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Whether a milestone is past its due date without being completed.
pub fn milestone_is_overdue(milestone: &Milestone, today: NaiveDate) -> bool {
    match milestone.status {
        MilestoneStatus::Completed => false,
        MilestoneStatus::Overdue => true,
        _ => milestone.due_date < today,
    }
}

fn is_open(milestone: &Milestone) -> bool {
    milestone.status != MilestoneStatus::Completed
}

fn due_before(milestone: &Milestone, today: NaiveDate, days: u64) -> bool {
    today
        .checked_add_days(Days::new(days))
        .map_or(true, |limit| milestone.due_date < limit)
}

/// An incomplete milestone close to its due date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpcomingDeadline {
    /// Owning project
    pub project_id: ProjectId,
    /// Name of the owning project
    pub project_name: String,
    /// The milestone
    pub milestone_id: MilestoneId,
    /// Name of the milestone
    pub milestone_name: String,
    /// When it is due
    pub due_date: NaiveDate,
    /// Already past due
    pub overdue: bool,
}

/// Figures shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    /// Day the snapshot was computed for
    pub today: NaiveDate,
    /// Loaded projects
    pub total_projects: usize,
    /// Loaded files
    pub total_files: usize,
    /// Completed milestones across all projects
    pub completed_milestones: usize,
    /// Incomplete milestones due within [`DUE_SOON_DAYS`], overdue included
    pub due_soon: usize,
    /// Soonest first, at most [`RECENT_LIMIT`]
    pub upcoming_deadlines: Vec<UpcomingDeadline>,
    /// First [`RECENT_LIMIT`] files in list order
    pub recent_files: Vec<FileRecord>,
}

impl DashboardSnapshot {
    /// Build the dashboard from the loaded projects and files.
    pub fn build(projects: &[Project], files: &[FileRecord], today: NaiveDate) -> Self {
        let milestones = || {
            projects
                .iter()
                .flat_map(|p| p.milestones.iter().map(move |m| (p, m)))
        };

        let completed_milestones = projects.iter().map(Project::completed_milestones).sum();
        let due_soon = milestones()
            .filter(|(_, m)| is_open(m) && due_before(m, today, DUE_SOON_DAYS))
            .count();

        let mut upcoming_deadlines: Vec<UpcomingDeadline> = milestones()
            .filter(|(_, m)| is_open(m) && due_before(m, today, DEADLINE_WINDOW_DAYS))
            .map(|(p, m)| UpcomingDeadline {
                project_id: p.id,
                project_name: p.name.clone(),
                milestone_id: m.id,
                milestone_name: m.milestone_name.clone(),
                due_date: m.due_date,
                overdue: milestone_is_overdue(m, today),
            })
            .collect();
        // stable, so equal dates keep project order
        upcoming_deadlines.sort_by_key(|d| d.due_date);
        upcoming_deadlines.truncate(RECENT_LIMIT);

        Self {
            today,
            total_projects: projects.len(),
            total_files: files.len(),
            completed_milestones,
            due_soon,
            upcoming_deadlines,
            recent_files: files.iter().take(RECENT_LIMIT).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gradtrack_core::{FileId, ProjectStatus, UserId, UserRef};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn milestone(id: u64, due: NaiveDate, status: MilestoneStatus) -> Milestone {
        Milestone {
            id: MilestoneId(id),
            milestone_name: format!("m{}", id),
            description: None,
            due_date: due,
            status,
            progress: None,
        }
    }

    fn project(id: u64, milestones: Vec<Milestone>) -> Project {
        Project {
            id: ProjectId(id),
            name: format!("project {}", id),
            short_description: None,
            status: ProjectStatus::Active,
            start_date: None,
            end_date: None,
            supervisor: None,
            team: None,
            milestones,
        }
    }

    fn file(id: u64) -> FileRecord {
        FileRecord {
            id: FileId(id),
            file_name: format!("f{}.pdf", id),
            file_size: 1,
            file_type: "application/pdf".to_string(),
            description: None,
            upload_date: Utc::now(),
            uploaded_by: UserRef {
                id: UserId(1),
                name: "Test Student".to_string(),
            },
            folder_id: None,
            milestone_id: None,
            project_id: None,
        }
    }

    #[test]
    fn test_project_progress() {
        let today = date(2024, 3, 1);
        assert_eq!(project_progress(&project(1, vec![])), 0);
        let p = project(
            1,
            vec![
                milestone(1, today, MilestoneStatus::Completed),
                milestone(2, today, MilestoneStatus::InProgress),
                milestone(3, today, MilestoneStatus::NotStarted),
            ],
        );
        assert_eq!(project_progress(&p), 33);
    }

    #[test]
    fn test_overdue() {
        let today = date(2024, 3, 10);
        assert!(milestone_is_overdue(&milestone(1, date(2024, 3, 1), MilestoneStatus::InProgress), today));
        assert!(!milestone_is_overdue(&milestone(1, date(2024, 3, 1), MilestoneStatus::Completed), today));
        assert!(!milestone_is_overdue(&milestone(1, today, MilestoneStatus::NotStarted), today));
        assert!(milestone_is_overdue(&milestone(1, date(2024, 4, 1), MilestoneStatus::Overdue), today));
    }

    #[test]
    fn test_dashboard_figures() {
        let today = date(2024, 3, 1);
        let projects = vec![
            project(
                1,
                vec![
                    milestone(1, date(2024, 2, 1), MilestoneStatus::Completed),
                    milestone(2, date(2024, 3, 5), MilestoneStatus::InProgress),
                    milestone(3, date(2024, 3, 12), MilestoneStatus::NotStarted),
                ],
            ),
            project(
                2,
                vec![
                    milestone(4, date(2024, 2, 20), MilestoneStatus::InProgress),
                    milestone(5, date(2024, 6, 1), MilestoneStatus::NotStarted),
                ],
            ),
        ];
        let files: Vec<FileRecord> = (1..=7).map(file).collect();

        let snapshot = DashboardSnapshot::build(&projects, &files, today);
        assert_eq!(snapshot.total_projects, 2);
        assert_eq!(snapshot.total_files, 7);
        assert_eq!(snapshot.completed_milestones, 1);
        // milestone 4 (overdue) and 2
        assert_eq!(snapshot.due_soon, 2);

        let upcoming: Vec<u64> = snapshot
            .upcoming_deadlines
            .iter()
            .map(|d| d.milestone_id.get())
            .collect();
        assert_eq!(upcoming, vec![4, 2, 3]);
        assert!(snapshot.upcoming_deadlines[0].overdue);
        assert_eq!(snapshot.upcoming_deadlines[0].project_name, "project 2");
        assert_eq!(snapshot.recent_files.len(), RECENT_LIMIT);
        assert_eq!(snapshot.recent_files[0].id, FileId(1));
    }

    #[test]
    fn test_empty_dashboard() {
        let snapshot = DashboardSnapshot::build(&[], &[], date(2024, 1, 1));
        assert_eq!(snapshot.total_projects, 0);
        assert!(snapshot.upcoming_deadlines.is_empty());
        assert!(snapshot.recent_files.is_empty());
    }
}
