//! Domain Services backed by the real HTTP API.

use crate::transport::HttpTransport;
use crate::traits::{
    AuthService, CommentService, FileService, FolderService, NotificationService, ProgressSender,
    ProjectService,
};
use async_trait::async_trait;
use gradtrack_core::{
    ApiError, ApiResult, Comment, CommentDraft, CommentId, CommentPatch, Credentials, Download,
    ErrorKind, FileId, FileRecord, FileUpload, Folder, FolderDraft, FolderId, FolderPatch,
    Milestone, MilestoneDraft, MilestoneId, MilestonePatch, Notification, NotificationId, Project,
    ProjectDraft, ProjectId, ProjectPatch, Registration, Role, Session, User, UserId,
};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;

/// Page requested when listing notifications.
pub const NOTIFICATION_PAGE: u32 = 1;
/// Page size when listing notifications.
pub const NOTIFICATION_PAGE_SIZE: u32 = 20;

/// `/auth/*`
pub struct HttpAuthService {
    transport: Arc<HttpTransport>,
}

impl HttpAuthService {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn login(&self, credentials: Credentials) -> ApiResult<Session> {
        self.transport
            .post("/auth/login", &credentials, "Login failed")
            .await
    }

    async fn register(&self, registration: Registration) -> ApiResult<Session> {
        self.transport
            .post("/auth/register", &registration, "Registration failed")
            .await
    }

    async fn current_user(&self) -> ApiResult<User> {
        self.transport.get("/auth/me", "Failed to get user data").await
    }
}

/// `/projects/*` and `/repositories/*`.
///
/// Milestones are milestone folders on the server; this service converts at
/// the boundary so callers only see [`Milestone`].
pub struct HttpProjectService {
    transport: Arc<HttpTransport>,
}

impl HttpProjectService {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

fn milestone_of(project: ProjectId, folder: Folder) -> ApiResult<Milestone> {
    if folder.repository_id != project {
        return Err(ApiError::new(
            ErrorKind::Unknown,
            format!(
                "milestone {} belongs to project {}, expected {}",
                folder.id, folder.repository_id, project
            ),
        ));
    }
    Milestone::try_from(folder)
}

#[async_trait]
impl ProjectService for HttpProjectService {
    async fn list(&self) -> ApiResult<Vec<Project>> {
        self.transport.get("/projects", "Failed to fetch projects").await
    }

    async fn list_for_user(&self, user: UserId) -> ApiResult<Vec<Project>> {
        self.transport
            .get(
                &format!("/repositories/user/{}", user),
                "Failed to fetch user repositories",
            )
            .await
    }

    async fn get(&self, id: ProjectId) -> ApiResult<Project> {
        self.transport
            .get(&format!("/projects/{}", id), "Failed to fetch project")
            .await
    }

    async fn create(&self, draft: ProjectDraft) -> ApiResult<Project> {
        self.transport
            .post("/projects", &draft, "Failed to create project")
            .await
    }

    async fn update(&self, id: ProjectId, patch: ProjectPatch) -> ApiResult<Project> {
        self.transport
            .put(&format!("/projects/{}", id), &patch, "Failed to update project")
            .await
    }

    async fn remove(&self, id: ProjectId) -> ApiResult<()> {
        self.transport
            .delete(&format!("/projects/{}", id), "Failed to delete project")
            .await
    }

    async fn search(&self, keyword: &str) -> ApiResult<Vec<Project>> {
        let builder = self
            .transport
            .request(Method::GET, "/projects/search")
            .await
            .query(&[("q", keyword)]);
        self.transport
            .send_json(builder, "Failed to search projects")
            .await
    }

    async fn create_milestone(
        &self,
        project: ProjectId,
        draft: MilestoneDraft,
    ) -> ApiResult<Milestone> {
        let folder: Folder = self
            .transport
            .post(
                "/repositories/folders",
                &draft.into_folder_draft(project),
                "Failed to add milestone",
            )
            .await?;
        milestone_of(project, folder)
    }

    async fn update_milestone(
        &self,
        project: ProjectId,
        milestone: MilestoneId,
        patch: MilestonePatch,
    ) -> ApiResult<Milestone> {
        let folder: Folder = self
            .transport
            .put(
                &format!("/repositories/folders/{}", milestone),
                &patch.into_folder_patch(),
                "Failed to update milestone",
            )
            .await?;
        milestone_of(project, folder)
    }

    async fn remove_milestone(&self, _project: ProjectId, milestone: MilestoneId) -> ApiResult<()> {
        self.transport
            .delete(
                &format!("/repositories/folders/{}", milestone),
                "Failed to delete milestone",
            )
            .await
    }
}

/// `/repositories/folders/*`
pub struct HttpFolderService {
    transport: Arc<HttpTransport>,
}

impl HttpFolderService {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl FolderService for HttpFolderService {
    async fn get(&self, id: FolderId) -> ApiResult<Folder> {
        self.transport
            .get(&format!("/repositories/folders/{}", id), "Failed to fetch folder")
            .await
    }

    async fn list_root(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        self.transport
            .get(
                &format!("/repositories/folders/repository/{}", repository),
                "Failed to fetch root folders",
            )
            .await
    }

    async fn list_subfolders(
        &self,
        repository: ProjectId,
        parent: FolderId,
    ) -> ApiResult<Vec<Folder>> {
        self.transport
            .get(
                &format!(
                    "/repositories/folders/repository/{}/subfolders/{}",
                    repository, parent
                ),
                "Failed to fetch subfolders",
            )
            .await
    }

    async fn list_milestones(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        self.transport
            .get(
                &format!("/repositories/folders/repository/{}/milestones", repository),
                "Failed to fetch milestone folders",
            )
            .await
    }

    async fn create(&self, draft: FolderDraft) -> ApiResult<Folder> {
        self.transport
            .post("/repositories/folders", &draft, "Failed to create folder")
            .await
    }

    async fn update(&self, id: FolderId, patch: FolderPatch) -> ApiResult<Folder> {
        self.transport
            .put(
                &format!("/repositories/folders/{}", id),
                &patch,
                "Failed to update folder",
            )
            .await
    }

    async fn remove(&self, id: FolderId) -> ApiResult<()> {
        self.transport
            .delete(&format!("/repositories/folders/{}", id), "Failed to delete folder")
            .await
    }
}

/// `/files/*`
pub struct HttpFileService {
    transport: Arc<HttpTransport>,
}

impl HttpFileService {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl FileService for HttpFileService {
    async fn upload(&self, upload: FileUpload, progress: ProgressSender) -> ApiResult<FileRecord> {
        self.transport
            .upload("/files", upload, progress, "File upload failed")
            .await
    }

    async fn get(&self, id: FileId) -> ApiResult<FileRecord> {
        self.transport
            .get(&format!("/files/{}", id), "Failed to fetch file details")
            .await
    }

    async fn list_by_folder(&self, folder: FolderId) -> ApiResult<Vec<FileRecord>> {
        self.transport
            .get(&format!("/files/folder/{}", folder), "Failed to fetch files")
            .await
    }

    async fn list_for_user(&self, user: UserId) -> ApiResult<Vec<FileRecord>> {
        self.transport
            .get(&format!("/files/user/{}", user), "Failed to fetch user files")
            .await
    }

    async fn remove(&self, id: FileId) -> ApiResult<()> {
        self.transport
            .delete(&format!("/files/{}", id), "Failed to delete file")
            .await
    }

    async fn download(&self, id: FileId) -> ApiResult<Download> {
        self.transport
            .download(&format!("/files/{}/download", id), "File download failed")
            .await
    }

    async fn history(&self, id: FileId) -> ApiResult<Vec<FileRecord>> {
        self.transport
            .get(&format!("/files/history/{}", id), "Failed to fetch file history")
            .await
    }
}

/// `/comments/*`
pub struct HttpCommentService {
    transport: Arc<HttpTransport>,
}

impl HttpCommentService {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl CommentService for HttpCommentService {
    async fn create(&self, draft: CommentDraft) -> ApiResult<Comment> {
        self.transport
            .post("/comments", &draft, "Failed to create comment")
            .await
    }

    async fn get(&self, id: CommentId) -> ApiResult<Comment> {
        self.transport
            .get(&format!("/comments/{}", id), "Failed to fetch comment")
            .await
    }

    async fn update(&self, id: CommentId, patch: CommentPatch) -> ApiResult<Comment> {
        self.transport
            .put(&format!("/comments/{}", id), &patch, "Failed to update comment")
            .await
    }

    async fn remove(&self, id: CommentId) -> ApiResult<()> {
        self.transport
            .delete(&format!("/comments/{}", id), "Failed to delete comment")
            .await
    }

    async fn list_for_file(&self, file: FileId) -> ApiResult<Vec<Comment>> {
        self.transport
            .get(&format!("/comments/file/{}", file), "Failed to fetch comments")
            .await
    }

    async fn list_for_file_by_role(&self, file: FileId, role: Role) -> ApiResult<Vec<Comment>> {
        self.transport
            .get(
                &format!("/comments/file/{}/{}", file, role.as_path()),
                &format!("Failed to fetch {} comments", role.as_path()),
            )
            .await
    }
}

/// `/notifications/*`
pub struct HttpNotificationService {
    transport: Arc<HttpTransport>,
}

impl HttpNotificationService {
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[derive(Deserialize)]
struct UnreadCount {
    count: usize,
}

#[async_trait]
impl NotificationService for HttpNotificationService {
    async fn list(&self) -> ApiResult<Vec<Notification>> {
        let builder = self
            .transport
            .request(Method::GET, "/notifications")
            .await
            .query(&[("page", NOTIFICATION_PAGE), ("limit", NOTIFICATION_PAGE_SIZE)]);
        self.transport
            .send_json(builder, "Failed to fetch notifications")
            .await
    }

    async fn unread_count(&self) -> ApiResult<usize> {
        let body: UnreadCount = self
            .transport
            .get("/notifications/unread-count", "Failed to fetch unread count")
            .await?;
        Ok(body.count)
    }

    async fn mark_read(&self, id: NotificationId) -> ApiResult<()> {
        self.transport
            .put_empty(
                &format!("/notifications/{}/read", id),
                "Failed to mark notification as read",
            )
            .await
    }

    async fn mark_all_read(&self) -> ApiResult<()> {
        self.transport
            .put_empty(
                "/notifications/read-all",
                "Failed to mark all notifications as read",
            )
            .await
    }

    async fn remove(&self, id: NotificationId) -> ApiResult<()> {
        self.transport
            .delete(&format!("/notifications/{}", id), "Failed to delete notification")
            .await
    }

    async fn clear_all(&self) -> ApiResult<()> {
        self.transport
            .delete("/notifications/clear-all", "Failed to clear notifications")
            .await
    }
}
