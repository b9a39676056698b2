//! In-memory Domain Services.
//!
//! One [`MockBackend`] implements every service trait over a shared
//! [`MockDatabase`]. It honours the same resolve/reject contract as the HTTP
//! services: requests need a valid token of a seeded or registered account,
//! unknown ids answer `NotFound`, bad credentials answer `Unauthorized`.

mod database;
mod seed;

pub use database::{MockAccount, MockDatabase, StoredFile};
pub use seed::{DEMO_PASSWORD, STUDENT_TOKEN, SUPERVISOR_TOKEN};

use crate::session::SessionContext;
use crate::traits::{
    AuthService, CommentService, FileService, FolderService, NotificationService, ProgressSender,
    ProjectService,
};
use async_trait::async_trait;
use gradtrack_core::{
    ApiError, ApiResult, Comment, CommentDraft, CommentId, CommentPatch, Credentials, Download,
    FileId, FileRecord, FileUpload, Folder, FolderDraft, FolderId, FolderPatch, Milestone,
    MilestoneDraft, MilestoneId, MilestonePatch, Notification, NotificationId, Project,
    ProjectDraft, ProjectId, ProjectPatch, Registration, Role, Session, User, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Progress step reported by mock uploads.
pub const UPLOAD_STEP: u8 = 10;

/// Every Domain Service, answered from memory.
#[derive(Clone)]
pub struct MockBackend {
    db: Arc<Mutex<MockDatabase>>,
    session: SessionContext,
    latency: Duration,
}

impl MockBackend {
    /// Backend over the demo dataset.
    pub fn new(session: SessionContext) -> Self {
        Self::with_database(MockDatabase::seeded(), session)
    }

    /// Backend over a custom dataset.
    pub fn with_database(db: MockDatabase, session: SessionContext) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            session,
            latency: Duration::ZERO,
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Shared handle on the backing data, for inspection in tests.
    pub fn database(&self) -> Arc<Mutex<MockDatabase>> {
        self.db.clone()
    }

    /// Fail the next call of any service with `err`. Queued failures are
    /// consumed in order.
    pub async fn fail_next(&self, err: ApiError) {
        self.db.lock().await.push_fault(err);
    }

    /// Hold the next call of any service back by `extra`, so a later call
    /// can overtake it.
    pub async fn delay_next(&self, extra: Duration) {
        self.db.lock().await.push_delay(extra);
    }

    /// Make the next upload report progress up to `percent`, then reject
    /// with `err`.
    pub async fn fail_upload_at(&self, percent: u8, err: ApiError) {
        self.db.lock().await.set_upload_fault(percent, err);
    }

    async fn open(&self) -> ApiResult<MutexGuard<'_, MockDatabase>> {
        let wait = self.latency + self.db.lock().await.take_delay();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        let mut db = self.db.lock().await;
        db.take_fault()?;
        Ok(db)
    }

    async fn open_as_user(&self) -> ApiResult<(MutexGuard<'_, MockDatabase>, User)> {
        let token = self.session.token().await;
        let db = self.open().await?;
        let user = db.authorize(token.as_deref())?;
        Ok((db, user))
    }
}

#[async_trait]
impl AuthService for MockBackend {
    async fn login(&self, credentials: Credentials) -> ApiResult<Session> {
        let db = self.open().await?;
        let session = db.login(&credentials)?;
        debug!("Mock login for {}", session.user.email);
        Ok(session)
    }

    async fn register(&self, registration: Registration) -> ApiResult<Session> {
        self.open().await?.register(registration)
    }

    async fn current_user(&self) -> ApiResult<User> {
        let (_, user) = self.open_as_user().await?;
        Ok(user)
    }
}

#[async_trait]
impl ProjectService for MockBackend {
    async fn list(&self) -> ApiResult<Vec<Project>> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.projects())
    }

    async fn list_for_user(&self, user: UserId) -> ApiResult<Vec<Project>> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.projects_for_user(user))
    }

    async fn get(&self, id: ProjectId) -> ApiResult<Project> {
        let (db, _) = self.open_as_user().await?;
        db.project(id)
    }

    async fn create(&self, draft: ProjectDraft) -> ApiResult<Project> {
        let (mut db, user) = self.open_as_user().await?;
        db.create_project(draft, &user)
    }

    async fn update(&self, id: ProjectId, patch: ProjectPatch) -> ApiResult<Project> {
        let (mut db, _) = self.open_as_user().await?;
        db.update_project(id, patch)
    }

    async fn remove(&self, id: ProjectId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.remove_project(id)
    }

    async fn search(&self, keyword: &str) -> ApiResult<Vec<Project>> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.search(keyword))
    }

    async fn create_milestone(
        &self,
        project: ProjectId,
        draft: MilestoneDraft,
    ) -> ApiResult<Milestone> {
        let (mut db, _) = self.open_as_user().await?;
        let folder = db.create_folder(draft.into_folder_draft(project))?;
        Milestone::try_from(folder)
    }

    async fn update_milestone(
        &self,
        project: ProjectId,
        milestone: MilestoneId,
        patch: MilestonePatch,
    ) -> ApiResult<Milestone> {
        let (mut db, _) = self.open_as_user().await?;
        let existing = db.folder(milestone.into())?;
        if !existing.is_milestone || existing.repository_id != project {
            return Err(ApiError::not_found(format!(
                "Milestone {} of project {}",
                milestone, project
            )));
        }
        let folder = db.update_folder(milestone.into(), patch.into_folder_patch())?;
        Milestone::try_from(folder)
    }

    async fn remove_milestone(&self, project: ProjectId, milestone: MilestoneId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        let existing = db.folder(milestone.into())?;
        if !existing.is_milestone || existing.repository_id != project {
            return Err(ApiError::not_found(format!(
                "Milestone {} of project {}",
                milestone, project
            )));
        }
        db.remove_folder(milestone.into())
    }
}

#[async_trait]
impl FolderService for MockBackend {
    async fn get(&self, id: FolderId) -> ApiResult<Folder> {
        let (db, _) = self.open_as_user().await?;
        db.folder(id)
    }

    async fn list_root(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        let (db, _) = self.open_as_user().await?;
        db.root_folders(repository)
    }

    async fn list_subfolders(
        &self,
        repository: ProjectId,
        parent: FolderId,
    ) -> ApiResult<Vec<Folder>> {
        let (db, _) = self.open_as_user().await?;
        db.subfolders(repository, parent)
    }

    async fn list_milestones(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        let (db, _) = self.open_as_user().await?;
        db.milestone_folders(repository)
    }

    async fn create(&self, draft: FolderDraft) -> ApiResult<Folder> {
        let (mut db, _) = self.open_as_user().await?;
        db.create_folder(draft)
    }

    async fn update(&self, id: FolderId, patch: FolderPatch) -> ApiResult<Folder> {
        let (mut db, _) = self.open_as_user().await?;
        db.update_folder(id, patch)
    }

    async fn remove(&self, id: FolderId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.remove_folder(id)
    }
}

#[async_trait]
impl FileService for MockBackend {
    async fn upload(&self, upload: FileUpload, progress: ProgressSender) -> ApiResult<FileRecord> {
        let (mut db, user) = self.open_as_user().await?;
        db.check_upload(&upload)?;
        let fault = db.take_upload_fault();
        drop(db);

        let stop_at = fault.as_ref().map_or(100, |(percent, _)| *percent);
        for step in (0..=100u8).step_by(UPLOAD_STEP as usize) {
            if step > stop_at {
                break;
            }
            let _ = progress.send(step);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency / 10).await;
            }
        }
        if let Some((percent, err)) = fault {
            debug!("Mock upload of {} rejected at {}%", upload.file_name, percent);
            return Err(err);
        }

        self.db.lock().await.store_upload(upload, &user)
    }

    async fn get(&self, id: FileId) -> ApiResult<FileRecord> {
        let (db, _) = self.open_as_user().await?;
        db.file(id)
    }

    async fn list_by_folder(&self, folder: FolderId) -> ApiResult<Vec<FileRecord>> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.files_in_folder(folder))
    }

    async fn list_for_user(&self, user: UserId) -> ApiResult<Vec<FileRecord>> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.files_of_user(user))
    }

    async fn remove(&self, id: FileId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.remove_file(id)
    }

    async fn download(&self, id: FileId) -> ApiResult<Download> {
        let (db, _) = self.open_as_user().await?;
        db.download(id)
    }

    async fn history(&self, id: FileId) -> ApiResult<Vec<FileRecord>> {
        let (db, _) = self.open_as_user().await?;
        db.history(id)
    }
}

#[async_trait]
impl CommentService for MockBackend {
    async fn create(&self, draft: CommentDraft) -> ApiResult<Comment> {
        let (mut db, user) = self.open_as_user().await?;
        db.create_comment(draft, &user)
    }

    async fn get(&self, id: CommentId) -> ApiResult<Comment> {
        let (db, _) = self.open_as_user().await?;
        db.comment(id)
    }

    async fn update(&self, id: CommentId, patch: CommentPatch) -> ApiResult<Comment> {
        let (mut db, user) = self.open_as_user().await?;
        db.update_comment(id, patch, &user)
    }

    async fn remove(&self, id: CommentId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.remove_comment(id)
    }

    async fn list_for_file(&self, file: FileId) -> ApiResult<Vec<Comment>> {
        let (db, _) = self.open_as_user().await?;
        db.comments_for_file(file, None)
    }

    async fn list_for_file_by_role(&self, file: FileId, role: Role) -> ApiResult<Vec<Comment>> {
        let (db, _) = self.open_as_user().await?;
        db.comments_for_file(file, Some(role))
    }
}

#[async_trait]
impl NotificationService for MockBackend {
    async fn list(&self) -> ApiResult<Vec<Notification>> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.notifications())
    }

    async fn unread_count(&self) -> ApiResult<usize> {
        let (db, _) = self.open_as_user().await?;
        Ok(db.unread_count())
    }

    async fn mark_read(&self, id: NotificationId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.mark_read(id)
    }

    async fn mark_all_read(&self) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.mark_all_read();
        Ok(())
    }

    async fn remove(&self, id: NotificationId) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.remove_notification(id)
    }

    async fn clear_all(&self) -> ApiResult<()> {
        let (mut db, _) = self.open_as_user().await?;
        db.clear_notifications();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::progress_channel;
    use chrono::NaiveDate;
    use gradtrack_core::ErrorKind;
    use gradtrack_storage::MemorySessionStore;

    async fn signed_in() -> MockBackend {
        let session = SessionContext::new(Arc::new(MemorySessionStore::new()));
        let backend = MockBackend::new(session.clone());
        let s = backend
            .login(Credentials {
                email: "student@test.com".to_string(),
                password: DEMO_PASSWORD.to_string(),
            })
            .await
            .unwrap();
        session.set(s).await.unwrap();
        backend
    }

    fn upload_to(folder: u64) -> FileUpload {
        FileUpload {
            file_name: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: vec![0u8; 2048],
            description: Some("Final report".to_string()),
            folder_id: FolderId(folder),
        }
    }

    #[tokio::test]
    async fn test_requests_need_a_session() {
        let backend = MockBackend::new(SessionContext::new(Arc::new(MemorySessionStore::new())));
        let err = ProjectService::list(&backend).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn test_milestone_round_trip_through_folders() {
        let backend = signed_in().await;
        let draft = MilestoneDraft {
            milestone_name: "Testing".to_string(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };
        let created = backend.create_milestone(ProjectId(2), draft).await.unwrap();

        let project = ProjectService::get(&backend, ProjectId(2)).await.unwrap();
        assert_eq!(project.milestones, vec![created.clone()]);

        let folders = backend.list_milestones(ProjectId(2)).await.unwrap();
        assert_eq!(folders[0].id, FolderId::from(created.id));

        let err = backend
            .remove_milestone(ProjectId(1), created.id)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        backend.remove_milestone(ProjectId(2), created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_reports_every_step() {
        let backend = signed_in().await;
        let (tx, mut rx) = progress_channel();
        let record = backend.upload(upload_to(2), tx).await.unwrap();

        let mut seen = Vec::new();
        while let Some(p) = rx.recv().await {
            seen.push(p);
        }
        assert_eq!(seen, (0..=100).step_by(10).collect::<Vec<u8>>());
        assert_eq!(record.milestone_id, Some(MilestoneId(2)));
        assert_eq!(record.uploaded_by.id, UserId(1));
        assert_eq!(record.file_size, 2048);
    }

    #[tokio::test]
    async fn test_upload_fault_stops_progress() {
        let backend = signed_in().await;
        backend
            .fail_upload_at(50, ApiError::network("connection reset"))
            .await;
        let (tx, mut rx) = progress_channel();
        let err = backend.upload(upload_to(3), tx).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NetworkUnreachable);

        let mut seen = Vec::new();
        while let Some(p) = rx.recv().await {
            seen.push(p);
        }
        assert_eq!(seen, vec![0, 10, 20, 30, 40, 50]);
        assert!(backend.list_by_folder(FolderId(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_next_hits_any_service() {
        let backend = signed_in().await;
        backend.fail_next(ApiError::unauthorized("Token expired")).await;
        let err = NotificationService::list(&backend).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(NotificationService::list(&backend).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_comment_role_comes_from_author() {
        let backend = signed_in().await;
        let comment = CommentService::create(
            &backend,
            CommentDraft {
                content: "Uploaded the revision".to_string(),
                file_id: FileId(2),
                rating: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(comment.user_role, Role::Student);

        let students = backend
            .list_for_file_by_role(FileId(2), Role::Student)
            .await
            .unwrap();
        assert_eq!(students, vec![comment]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let backend = signed_in().await.with_latency(Duration::from_millis(300));
        let started = tokio::time::Instant::now();
        backend.current_user().await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
