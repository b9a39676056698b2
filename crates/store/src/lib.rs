//! The GradTrack Entity Store.
//!
//! Six slices hold the client's working copy of server-owned entities. Each
//! slice is a plain state value reduced by actions; the [`Store`] façade turns
//! user intents into service calls and reduces their outcomes.

pub mod auth;
pub mod comments;
pub mod files;
pub mod folders;
pub mod notifications;
pub mod projects;
pub mod slice;
mod store;

pub use auth::{AuthAction, AuthState};
pub use comments::{partition, CommentsAction, CommentsState};
pub use files::{FilesAction, FilesState};
pub use folders::{FoldersAction, FoldersState, Placement};
pub use notifications::{unread_count, NotificationsAction, NotificationsState};
pub use projects::{ProjectFilter, ProjectsAction, ProjectsState};
pub use slice::{FetchFence, Reducer, Slice, Ticket};
pub use store::Store;
