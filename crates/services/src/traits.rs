//! Domain Service traits, one per entity family.
//!
//! Every operation resolves with the entity payload or rejects with a
//! classified [`ApiError`]. Implementations never swallow failures and never
//! retry.

use async_trait::async_trait;
use gradtrack_core::{
    ApiResult, Comment, CommentDraft, CommentId, CommentPatch, Credentials, Download, FileId,
    FileRecord, FileUpload, Folder, FolderDraft, FolderId, FolderPatch, Milestone, MilestoneDraft,
    MilestoneId, MilestonePatch, Notification, NotificationId, Project, ProjectDraft, ProjectId,
    ProjectPatch, Registration, Role, Session, User, UserId,
};

/// Side channel for upload progress, percentages in `0..=100`.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<u8>;

/// Receiving end of [`ProgressSender`].
pub type ProgressReceiver = tokio::sync::mpsc::UnboundedReceiver<u8>;

/// Create a progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Authentication.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchange credentials for a session.
    async fn login(&self, credentials: Credentials) -> ApiResult<Session>;

    /// Create an account and sign in.
    async fn register(&self, registration: Registration) -> ApiResult<Session>;

    /// Identity behind the current credential.
    async fn current_user(&self) -> ApiResult<User>;
}

/// Projects (repositories) and their milestones.
#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Project>>;

    /// Projects the user belongs to or supervises.
    async fn list_for_user(&self, user: UserId) -> ApiResult<Vec<Project>>;

    async fn get(&self, id: ProjectId) -> ApiResult<Project>;

    async fn create(&self, draft: ProjectDraft) -> ApiResult<Project>;

    async fn update(&self, id: ProjectId, patch: ProjectPatch) -> ApiResult<Project>;

    async fn remove(&self, id: ProjectId) -> ApiResult<()>;

    /// Keyword search over project names and descriptions.
    async fn search(&self, keyword: &str) -> ApiResult<Vec<Project>>;

    async fn create_milestone(
        &self,
        project: ProjectId,
        draft: MilestoneDraft,
    ) -> ApiResult<Milestone>;

    async fn update_milestone(
        &self,
        project: ProjectId,
        milestone: MilestoneId,
        patch: MilestonePatch,
    ) -> ApiResult<Milestone>;

    async fn remove_milestone(&self, project: ProjectId, milestone: MilestoneId) -> ApiResult<()>;
}

/// Folder tree under a project.
#[async_trait]
pub trait FolderService: Send + Sync {
    async fn get(&self, id: FolderId) -> ApiResult<Folder>;

    /// Folders without a parent.
    async fn list_root(&self, repository: ProjectId) -> ApiResult<Vec<Folder>>;

    /// Direct children of `parent`.
    async fn list_subfolders(&self, repository: ProjectId, parent: FolderId)
        -> ApiResult<Vec<Folder>>;

    /// Folders carrying the milestone marker.
    async fn list_milestones(&self, repository: ProjectId) -> ApiResult<Vec<Folder>>;

    async fn create(&self, draft: FolderDraft) -> ApiResult<Folder>;

    async fn update(&self, id: FolderId, patch: FolderPatch) -> ApiResult<Folder>;

    async fn remove(&self, id: FolderId) -> ApiResult<()>;
}

/// Uploaded files.
#[async_trait]
pub trait FileService: Send + Sync {
    /// Upload a file, reporting non-decreasing progress on `progress` before
    /// resolving.
    async fn upload(&self, upload: FileUpload, progress: ProgressSender) -> ApiResult<FileRecord>;

    async fn get(&self, id: FileId) -> ApiResult<FileRecord>;

    async fn list_by_folder(&self, folder: FolderId) -> ApiResult<Vec<FileRecord>>;

    async fn list_for_user(&self, user: UserId) -> ApiResult<Vec<FileRecord>>;

    async fn remove(&self, id: FileId) -> ApiResult<()>;

    async fn download(&self, id: FileId) -> ApiResult<Download>;

    /// Earlier versions of a file, oldest first.
    async fn history(&self, id: FileId) -> ApiResult<Vec<FileRecord>>;
}

/// Review comments.
#[async_trait]
pub trait CommentService: Send + Sync {
    async fn create(&self, draft: CommentDraft) -> ApiResult<Comment>;

    async fn get(&self, id: CommentId) -> ApiResult<Comment>;

    async fn update(&self, id: CommentId, patch: CommentPatch) -> ApiResult<Comment>;

    async fn remove(&self, id: CommentId) -> ApiResult<()>;

    async fn list_for_file(&self, file: FileId) -> ApiResult<Vec<Comment>>;

    /// Comments on `file` written by users of `role`.
    async fn list_for_file_by_role(&self, file: FileId, role: Role) -> ApiResult<Vec<Comment>>;
}

/// Notifications of the current user.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn list(&self) -> ApiResult<Vec<Notification>>;

    async fn unread_count(&self) -> ApiResult<usize>;

    async fn mark_read(&self, id: NotificationId) -> ApiResult<()>;

    async fn mark_all_read(&self) -> ApiResult<()>;

    async fn remove(&self, id: NotificationId) -> ApiResult<()>;

    async fn clear_all(&self) -> ApiResult<()>;
}
