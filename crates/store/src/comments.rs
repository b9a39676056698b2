//! Comments slice with supervisor and student views.
//!
//! The role views are never edited directly: [`partition`] rebuilds them from
//! the primary collection after every reduction.

use crate::slice::{FetchFence, Reducer, Slice, Ticket};
use gradtrack_core::{ApiError, Comment, CommentId, FileId, Role};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CommentsState {
    #[serde(flatten)]
    pub slice: Slice<Comment>,
    pub supervisor: Vec<Comment>,
    pub student: Vec<Comment>,
    #[serde(skip)]
    role_fence: FetchFence<(FileId, Role)>,
}

#[derive(Debug, Clone)]
pub enum CommentsAction {
    Pending,
    Failed(ApiError),
    Fetched { ticket: Ticket, comments: Vec<Comment> },
    FetchFailed { ticket: Ticket, error: ApiError },
    /// Comments of one role on one file; replaces that subset only
    RoleFetched { ticket: Ticket, file: FileId, role: Role, comments: Vec<Comment> },
    RoleFetchFailed { ticket: Ticket, file: FileId, role: Role, error: ApiError },
    Loaded(Comment),
    Created(Comment),
    Updated(Comment),
    Deleted(CommentId),
    Cleared,
    ErrorCleared,
}

/// Split comments into (supervisor, student) views, keeping order.
pub fn partition(comments: &[Comment]) -> (Vec<Comment>, Vec<Comment>) {
    comments
        .iter()
        .cloned()
        .partition(|c| c.user_role == Role::Supervisor)
}

impl CommentsState {
    pub fn begin_fetch(&mut self) -> Ticket {
        self.slice.begin_fetch()
    }

    pub fn begin_role_fetch(&mut self, file: FileId, role: Role) -> Ticket {
        self.slice.begin();
        self.role_fence.issue((file, role))
    }

    /// Role view for `role`.
    pub fn by_role(&self, role: Role) -> &[Comment] {
        match role {
            Role::Supervisor => &self.supervisor,
            Role::Student => &self.student,
        }
    }

    /// Mean supervisor rating, if any comment carries one.
    pub fn average_rating(&self) -> Option<f32> {
        let ratings: Vec<u8> = self.supervisor.iter().filter_map(|c| c.rating).collect();
        if ratings.is_empty() {
            return None;
        }
        Some(ratings.iter().map(|&r| f32::from(r)).sum::<f32>() / ratings.len() as f32)
    }

    fn rebuild_views(&mut self) {
        let (supervisor, student) = partition(&self.slice.items);
        self.supervisor = supervisor;
        self.student = student;
    }

    fn merge_role_subset(&mut self, file: FileId, role: Role, comments: Vec<Comment>) {
        self.slice.settle();
        // held comments of the subset keep their place; vanished ones go
        self.slice.items.retain(|c| {
            !(c.file_id == file && c.user_role == role) || comments.iter().any(|n| n.id == c.id)
        });
        for comment in comments {
            match self.slice.position(comment.id) {
                Some(idx) => self.slice.items[idx] = comment,
                None => self.slice.items.push(comment),
            }
        }
    }
}

impl Reducer for CommentsState {
    type Action = CommentsAction;
    const NAME: &'static str = "comments";

    fn reduce(&mut self, action: CommentsAction) {
        match action {
            CommentsAction::Pending => self.slice.begin(),
            CommentsAction::Failed(err) => self.slice.fail(err),
            CommentsAction::Fetched { ticket, comments } => {
                if !self.slice.settle_fetch(ticket, comments) {
                    debug!("Discarding superseded comments");
                }
            }
            CommentsAction::FetchFailed { ticket, error } => {
                self.slice.fail_fetch(ticket, error);
            }
            CommentsAction::RoleFetched { ticket, file, role, comments } => {
                if self.role_fence.is_latest(&(file, role), ticket) {
                    self.merge_role_subset(file, role, comments);
                } else {
                    debug!("Discarding superseded {} comments of file {}", role.as_path(), file);
                }
            }
            CommentsAction::RoleFetchFailed { ticket, file, role, error } => {
                if self.role_fence.is_latest(&(file, role), ticket) {
                    self.slice.fail(error);
                }
            }
            CommentsAction::Loaded(comment) => self.slice.select(comment),
            CommentsAction::Created(comment) => self.slice.append(comment),
            CommentsAction::Updated(comment) => {
                self.slice.replace(comment);
            }
            CommentsAction::Deleted(id) => {
                self.slice.remove(id);
            }
            CommentsAction::Cleared => self.slice.clear(),
            CommentsAction::ErrorCleared => self.slice.clear_error(),
        }
        self.rebuild_views();
    }
}
