//! Progress and dashboard figures.
//!
//! Pure functions over store snapshots: per-project completion, deadline
//! tracking and the dashboard summary.

#![warn(missing_docs)]

pub mod dashboard;

pub use dashboard::{
    milestone_is_overdue, project_progress, DashboardSnapshot, UpcomingDeadline, DEADLINE_WINDOW_DAYS,
    DUE_SOON_DAYS, RECENT_LIMIT,
};
