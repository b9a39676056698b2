//! The store façade: one async intent per user action.
//!
//! Every intent follows the same shape: lock the slice and reduce the request,
//! release the lock and await the Domain Service, then lock again and reduce
//! the settlement. No lock is held across a service call, so requests on
//! different slices, and concurrent requests on the same slice, never wait on
//! each other.
//!
//! A failure classified `Unauthorized` from any slice tears the session down:
//! the persisted and in-memory session are cleared and the auth slice reduces
//! [`AuthAction::SessionExpired`]. This happens once per rejected request.

use crate::auth::{AuthAction, AuthState};
use crate::comments::{CommentsAction, CommentsState};
use crate::files::{FilesAction, FilesState};
use crate::folders::{FoldersAction, FoldersState};
use crate::notifications::{NotificationsAction, NotificationsState};
use crate::projects::{ProjectFilter, ProjectsAction, ProjectsState};
use crate::slice::Reducer;
use gradtrack_core::{
    ApiError, ApiResult, Comment, CommentDraft, CommentId, CommentPatch, Credentials, Download,
    ErrorKind, FileId, FileRecord, FileScope, FileUpload, Folder, FolderDraft, FolderId,
    FolderPatch, Milestone, MilestoneDraft, MilestoneId, MilestonePatch, Notification,
    NotificationId, Project, ProjectDraft, ProjectId, ProjectPatch, Registration, Role, Session,
    UploadId, User,
};
use gradtrack_services::{progress_channel, Backend, SessionContext};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Client-side working copy of every entity family.
pub struct Store {
    backend: Backend,
    session: SessionContext,
    auth: Mutex<AuthState>,
    projects: Mutex<ProjectsState>,
    folders: Mutex<FoldersState>,
    files: Mutex<FilesState>,
    comments: Mutex<CommentsState>,
    notifications: Mutex<NotificationsState>,
}

impl Store {
    /// Create an empty store. Call [`Store::restore`] to pick up a persisted
    /// session.
    pub fn new(backend: Backend, session: SessionContext) -> Self {
        Self {
            backend,
            session,
            auth: Mutex::new(AuthState::default()),
            projects: Mutex::new(ProjectsState::default()),
            folders: Mutex::new(FoldersState::default()),
            files: Mutex::new(FilesState::default()),
            comments: Mutex::new(CommentsState::default()),
            notifications: Mutex::new(NotificationsState::default()),
        }
    }

    /// The session shared with the services.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn auth(&self) -> AuthState {
        self.auth.lock().await.clone()
    }

    pub async fn projects(&self) -> ProjectsState {
        self.projects.lock().await.clone()
    }

    pub async fn folders(&self) -> FoldersState {
        self.folders.lock().await.clone()
    }

    pub async fn files(&self) -> FilesState {
        self.files.lock().await.clone()
    }

    pub async fn comments(&self) -> CommentsState {
        self.comments.lock().await.clone()
    }

    pub async fn notifications(&self) -> NotificationsState {
        self.notifications.lock().await.clone()
    }

    async fn dispatch<S: Reducer>(slice: &Mutex<S>, action: S::Action) {
        slice.lock().await.reduce(action);
    }

    /// Reduce the outcome of a service call into `slice`.
    async fn settle<S, T>(
        &self,
        slice: &Mutex<S>,
        result: ApiResult<T>,
        success: impl FnOnce(&T) -> S::Action,
        failure: impl FnOnce(ApiError) -> S::Action,
    ) -> ApiResult<T>
    where
        S: Reducer,
    {
        match result {
            Ok(value) => {
                debug!("{} request succeeded", S::NAME);
                Self::dispatch(slice, success(&value)).await;
                Ok(value)
            }
            Err(err) => {
                debug!("{} request failed: {}", S::NAME, err);
                Self::dispatch(slice, failure(err.clone())).await;
                if err.is_unauthorized() {
                    self.expire_session().await;
                }
                Err(err)
            }
        }
    }

    async fn expire_session(&self) {
        warn!("Request rejected as unauthorized, signing out");
        if let Err(e) = self.session.clear().await {
            warn!("Failed to remove persisted session: {}", e);
        }
        Self::dispatch(&self.auth, AuthAction::SessionExpired).await;
    }

    async fn persist(&self, session: Session) -> ApiResult<Session> {
        self.session.set(session.clone()).await.map_err(|e| {
            ApiError::new(ErrorKind::Unknown, format!("Failed to save session: {}", e))
        })?;
        Ok(session)
    }

    // ---- auth ----

    pub async fn login(&self, credentials: Credentials) -> ApiResult<Session> {
        Self::dispatch(&self.auth, AuthAction::Pending).await;
        let result = match self.backend.auth.login(credentials).await {
            Ok(session) => self.persist(session).await,
            Err(err) => Err(err),
        };
        if let Ok(session) = &result {
            info!("Signed in as {}", session.user.email);
        }
        self.settle(
            &self.auth,
            result,
            |s| AuthAction::SignedIn(s.clone()),
            AuthAction::Failed,
        )
        .await
    }

    pub async fn register(&self, registration: Registration) -> ApiResult<Session> {
        Self::dispatch(&self.auth, AuthAction::Pending).await;
        let result = match self.backend.auth.register(registration).await {
            Ok(session) => self.persist(session).await,
            Err(err) => Err(err),
        };
        self.settle(
            &self.auth,
            result,
            |s| AuthAction::SignedIn(s.clone()),
            AuthAction::Failed,
        )
        .await
    }

    /// Load the persisted session into the auth slice.
    pub async fn restore(&self) -> ApiResult<Option<Session>> {
        Self::dispatch(&self.auth, AuthAction::Pending).await;
        let result = self.session.init().await.map_err(|e| {
            ApiError::new(ErrorKind::Unknown, format!("Failed to load session: {}", e))
        });
        self.settle(
            &self.auth,
            result,
            |s| AuthAction::Restored(s.clone()),
            AuthAction::Failed,
        )
        .await
    }

    /// Re-read the identity behind the current credential.
    pub async fn refresh_user(&self) -> ApiResult<User> {
        Self::dispatch(&self.auth, AuthAction::Pending).await;
        let result = self.backend.auth.current_user().await;
        if let (Ok(user), Some(mut session)) = (&result, self.session.current().await) {
            session.user = user.clone();
            if let Err(e) = self.session.set(session).await {
                warn!("Failed to persist refreshed user: {}", e);
            }
        }
        self.settle(
            &self.auth,
            result,
            |u| AuthAction::UserRefreshed(u.clone()),
            AuthAction::Failed,
        )
        .await
    }

    /// Sign out. The other slices keep their contents.
    pub async fn logout(&self) {
        if let Err(e) = self.session.clear().await {
            warn!("Failed to remove persisted session: {}", e);
        }
        info!("Signed out");
        Self::dispatch(&self.auth, AuthAction::SignedOut).await;
    }

    pub async fn clear_auth_error(&self) {
        Self::dispatch(&self.auth, AuthAction::ErrorCleared).await;
    }

    // ---- projects ----

    pub async fn fetch_projects(&self) -> ApiResult<Vec<Project>> {
        let ticket = self.projects.lock().await.begin_fetch();
        let result = self.backend.projects.list().await;
        self.settle(
            &self.projects,
            result,
            |projects| ProjectsAction::Fetched { ticket, projects: projects.clone() },
            |error| ProjectsAction::FetchFailed { ticket, error },
        )
        .await
    }

    /// Projects of the signed-in user.
    pub async fn fetch_user_projects(&self) -> ApiResult<Vec<Project>> {
        let ticket = self.projects.lock().await.begin_fetch();
        let result = match self.session.user().await {
            Some(user) => self.backend.projects.list_for_user(user.id).await,
            None => Err(ApiError::unauthorized("Not signed in")),
        };
        self.settle(
            &self.projects,
            result,
            |projects| ProjectsAction::Fetched { ticket, projects: projects.clone() },
            |error| ProjectsAction::FetchFailed { ticket, error },
        )
        .await
    }

    pub async fn fetch_project(&self, id: ProjectId) -> ApiResult<Project> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self.backend.projects.get(id).await;
        self.settle(
            &self.projects,
            result,
            |p| ProjectsAction::Loaded(p.clone()),
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn create_project(&self, draft: ProjectDraft) -> ApiResult<Project> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self.backend.projects.create(draft).await;
        self.settle(
            &self.projects,
            result,
            |p| ProjectsAction::Created(p.clone()),
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn update_project(&self, id: ProjectId, patch: ProjectPatch) -> ApiResult<Project> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self.backend.projects.update(id, patch).await;
        self.settle(
            &self.projects,
            result,
            |p| ProjectsAction::Updated(p.clone()),
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn delete_project(&self, id: ProjectId) -> ApiResult<()> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self.backend.projects.remove(id).await;
        self.settle(
            &self.projects,
            result,
            |_| ProjectsAction::Deleted(id),
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn search_projects(&self, keyword: &str) -> ApiResult<Vec<Project>> {
        let ticket = self.projects.lock().await.begin_search();
        let result = self.backend.projects.search(keyword).await;
        self.settle(
            &self.projects,
            result,
            |results| ProjectsAction::Searched { ticket, results: results.clone() },
            |error| ProjectsAction::SearchFailed { ticket, error },
        )
        .await
    }

    pub async fn clear_search_results(&self) {
        Self::dispatch(&self.projects, ProjectsAction::SearchCleared).await;
    }

    pub async fn create_milestone(
        &self,
        project: ProjectId,
        draft: MilestoneDraft,
    ) -> ApiResult<Milestone> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self.backend.projects.create_milestone(project, draft).await;
        self.settle(
            &self.projects,
            result,
            |m| ProjectsAction::MilestoneCreated { project, milestone: m.clone() },
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn update_milestone(
        &self,
        project: ProjectId,
        milestone: MilestoneId,
        patch: MilestonePatch,
    ) -> ApiResult<Milestone> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self
            .backend
            .projects
            .update_milestone(project, milestone, patch)
            .await;
        self.settle(
            &self.projects,
            result,
            |m| ProjectsAction::MilestoneUpdated { project, milestone: m.clone() },
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn delete_milestone(&self, project: ProjectId, milestone: MilestoneId) -> ApiResult<()> {
        Self::dispatch(&self.projects, ProjectsAction::Pending).await;
        let result = self.backend.projects.remove_milestone(project, milestone).await;
        self.settle(
            &self.projects,
            result,
            |_| ProjectsAction::MilestoneDeleted { project, milestone },
            ProjectsAction::Failed,
        )
        .await
    }

    pub async fn set_filter(&self, filter: ProjectFilter) {
        Self::dispatch(&self.projects, ProjectsAction::FilterSet(filter)).await;
    }

    pub async fn set_search_query(&self, query: impl Into<String>) {
        Self::dispatch(&self.projects, ProjectsAction::SearchQuerySet(query.into())).await;
    }

    pub async fn clear_selected_project(&self) {
        Self::dispatch(&self.projects, ProjectsAction::SelectionCleared).await;
    }

    pub async fn clear_project_error(&self) {
        Self::dispatch(&self.projects, ProjectsAction::ErrorCleared).await;
    }

    // ---- folders ----

    pub async fn fetch_folder(&self, id: FolderId) -> ApiResult<Folder> {
        Self::dispatch(&self.folders, FoldersAction::Pending).await;
        let result = self.backend.folders.get(id).await;
        self.settle(
            &self.folders,
            result,
            |f| FoldersAction::Loaded(f.clone()),
            FoldersAction::Failed,
        )
        .await
    }

    pub async fn fetch_root_folders(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        let ticket = self.folders.lock().await.begin_root_fetch();
        let result = self.backend.folders.list_root(repository).await;
        self.settle(
            &self.folders,
            result,
            |folders| FoldersAction::RootFetched { ticket, repository, folders: folders.clone() },
            |error| FoldersAction::RootFetchFailed { ticket, error },
        )
        .await
    }

    pub async fn fetch_subfolders(
        &self,
        repository: ProjectId,
        parent: FolderId,
    ) -> ApiResult<Vec<Folder>> {
        let ticket = self.folders.lock().await.begin_subfolder_fetch(parent);
        let result = self.backend.folders.list_subfolders(repository, parent).await;
        self.settle(
            &self.folders,
            result,
            |folders| FoldersAction::SubfoldersFetched { ticket, parent, folders: folders.clone() },
            |error| FoldersAction::SubfoldersFetchFailed { ticket, parent, error },
        )
        .await
    }

    pub async fn fetch_milestone_folders(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        let ticket = self.folders.lock().await.begin_milestone_fetch();
        let result = self.backend.folders.list_milestones(repository).await;
        self.settle(
            &self.folders,
            result,
            |folders| FoldersAction::MilestonesFetched { ticket, folders: folders.clone() },
            |error| FoldersAction::MilestonesFetchFailed { ticket, error },
        )
        .await
    }

    pub async fn create_folder(&self, draft: FolderDraft) -> ApiResult<Folder> {
        Self::dispatch(&self.folders, FoldersAction::Pending).await;
        let result = self.backend.folders.create(draft).await;
        self.settle(
            &self.folders,
            result,
            |f| FoldersAction::Created(f.clone()),
            FoldersAction::Failed,
        )
        .await
    }

    pub async fn update_folder(&self, id: FolderId, patch: FolderPatch) -> ApiResult<Folder> {
        Self::dispatch(&self.folders, FoldersAction::Pending).await;
        let result = self.backend.folders.update(id, patch).await;
        self.settle(
            &self.folders,
            result,
            |f| FoldersAction::Updated(f.clone()),
            FoldersAction::Failed,
        )
        .await
    }

    pub async fn delete_folder(&self, id: FolderId) -> ApiResult<()> {
        Self::dispatch(&self.folders, FoldersAction::Pending).await;
        let result = self.backend.folders.remove(id).await;
        self.settle(
            &self.folders,
            result,
            |_| FoldersAction::Deleted(id),
            FoldersAction::Failed,
        )
        .await
    }

    pub async fn set_selected_folder(&self, folder: Option<Folder>) {
        Self::dispatch(&self.folders, FoldersAction::Selected(folder)).await;
    }

    pub async fn clear_folders(&self) {
        Self::dispatch(&self.folders, FoldersAction::Cleared).await;
    }

    // ---- files ----

    /// Fetch the files of `scope`, keeping at most `limit` of them.
    pub async fn fetch_files(
        &self,
        scope: FileScope,
        limit: Option<usize>,
    ) -> ApiResult<Vec<FileRecord>> {
        let ticket = self.files.lock().await.begin_fetch();
        let result = match scope {
            FileScope::Folder(folder) => self.backend.files.list_by_folder(folder).await,
            FileScope::Milestone(milestone) => {
                self.backend.files.list_by_folder(milestone.into()).await
            }
            // no listing of project-root files exists server side
            FileScope::Project(_) => Ok(Vec::new()),
            FileScope::CurrentUser => match self.session.user().await {
                Some(user) => self.backend.files.list_for_user(user.id).await,
                None => Err(ApiError::unauthorized("Not signed in")),
            },
        };
        let result = result.map(|mut files| {
            if let Some(limit) = limit {
                files.truncate(limit);
            }
            files
        });
        self.settle(
            &self.files,
            result,
            |files| FilesAction::Fetched { ticket, files: files.clone() },
            |error| FilesAction::FetchFailed { ticket, error },
        )
        .await
    }

    pub async fn fetch_file(&self, id: FileId) -> ApiResult<FileRecord> {
        Self::dispatch(&self.files, FilesAction::Pending).await;
        let result = self.backend.files.get(id).await;
        self.settle(
            &self.files,
            result,
            |f| FilesAction::Loaded(f.clone()),
            FilesAction::Failed,
        )
        .await
    }

    /// Upload a file, reducing every progress report as it arrives.
    pub async fn upload_file(&self, upload: FileUpload) -> ApiResult<FileRecord> {
        let id = UploadId::new();
        info!("Uploading {} as {}", upload.file_name, id);
        Self::dispatch(&self.files, FilesAction::UploadStarted(id)).await;

        let (tx, mut rx) = progress_channel();
        let send = self.backend.files.upload(upload, tx);
        let track = async {
            while let Some(percent) = rx.recv().await {
                Self::dispatch(&self.files, FilesAction::UploadProgress { upload: id, percent }).await;
            }
        };
        // the sender lives inside `send`, so `track` ends once it settles
        let (result, ()) = tokio::join!(send, track);

        self.settle(
            &self.files,
            result,
            |file| FilesAction::Uploaded { upload: id, file: file.clone() },
            |error| FilesAction::UploadFailed { upload: id, error },
        )
        .await
    }

    pub async fn delete_file(&self, id: FileId) -> ApiResult<()> {
        Self::dispatch(&self.files, FilesAction::Pending).await;
        let result = self.backend.files.remove(id).await;
        self.settle(&self.files, result, |_| FilesAction::Deleted(id), FilesAction::Failed)
            .await
    }

    /// Download a file. The files collection is left untouched.
    pub async fn download_file(&self, id: FileId) -> ApiResult<Download> {
        Self::dispatch(&self.files, FilesAction::DownloadStarted).await;
        let result = self.backend.files.download(id).await;
        self.settle(
            &self.files,
            result,
            |_| FilesAction::Downloaded,
            FilesAction::DownloadFailed,
        )
        .await
    }

    pub async fn fetch_file_history(&self, id: FileId) -> ApiResult<Vec<FileRecord>> {
        let ticket = self.files.lock().await.begin_history_fetch();
        let result = self.backend.files.history(id).await;
        self.settle(
            &self.files,
            result,
            |versions| FilesAction::HistoryFetched { ticket, versions: versions.clone() },
            |error| FilesAction::HistoryFetchFailed { ticket, error },
        )
        .await
    }

    pub async fn reset_upload_progress(&self) {
        Self::dispatch(&self.files, FilesAction::ProgressReset).await;
    }

    pub async fn clear_file_error(&self) {
        Self::dispatch(&self.files, FilesAction::ErrorCleared).await;
    }

    // ---- comments ----

    pub async fn fetch_comments(&self, file: FileId) -> ApiResult<Vec<Comment>> {
        let ticket = self.comments.lock().await.begin_fetch();
        let result = self.backend.comments.list_for_file(file).await;
        self.settle(
            &self.comments,
            result,
            |comments| CommentsAction::Fetched { ticket, comments: comments.clone() },
            |error| CommentsAction::FetchFailed { ticket, error },
        )
        .await
    }

    pub async fn fetch_comments_by_role(&self, file: FileId, role: Role) -> ApiResult<Vec<Comment>> {
        let ticket = self.comments.lock().await.begin_role_fetch(file, role);
        let result = self.backend.comments.list_for_file_by_role(file, role).await;
        self.settle(
            &self.comments,
            result,
            |comments| CommentsAction::RoleFetched { ticket, file, role, comments: comments.clone() },
            |error| CommentsAction::RoleFetchFailed { ticket, file, role, error },
        )
        .await
    }

    pub async fn fetch_comment(&self, id: CommentId) -> ApiResult<Comment> {
        Self::dispatch(&self.comments, CommentsAction::Pending).await;
        let result = self.backend.comments.get(id).await;
        self.settle(
            &self.comments,
            result,
            |c| CommentsAction::Loaded(c.clone()),
            CommentsAction::Failed,
        )
        .await
    }

    pub async fn create_comment(&self, draft: CommentDraft) -> ApiResult<Comment> {
        Self::dispatch(&self.comments, CommentsAction::Pending).await;
        let result = self.backend.comments.create(draft).await;
        self.settle(
            &self.comments,
            result,
            |c| CommentsAction::Created(c.clone()),
            CommentsAction::Failed,
        )
        .await
    }

    pub async fn update_comment(&self, id: CommentId, patch: CommentPatch) -> ApiResult<Comment> {
        Self::dispatch(&self.comments, CommentsAction::Pending).await;
        let result = self.backend.comments.update(id, patch).await;
        self.settle(
            &self.comments,
            result,
            |c| CommentsAction::Updated(c.clone()),
            CommentsAction::Failed,
        )
        .await
    }

    pub async fn delete_comment(&self, id: CommentId) -> ApiResult<()> {
        Self::dispatch(&self.comments, CommentsAction::Pending).await;
        let result = self.backend.comments.remove(id).await;
        self.settle(
            &self.comments,
            result,
            |_| CommentsAction::Deleted(id),
            CommentsAction::Failed,
        )
        .await
    }

    pub async fn clear_comments(&self) {
        Self::dispatch(&self.comments, CommentsAction::Cleared).await;
    }

    // ---- notifications ----

    pub async fn fetch_notifications(&self) -> ApiResult<Vec<Notification>> {
        let ticket = self.notifications.lock().await.begin_fetch();
        let result = self.backend.notifications.list().await;
        self.settle(
            &self.notifications,
            result,
            |notifications| NotificationsAction::Fetched {
                ticket,
                notifications: notifications.clone(),
            },
            |error| NotificationsAction::FetchFailed { ticket, error },
        )
        .await
    }

    pub async fn mark_notification_read(&self, id: NotificationId) -> ApiResult<()> {
        Self::dispatch(&self.notifications, NotificationsAction::Pending).await;
        let result = self.backend.notifications.mark_read(id).await;
        self.settle(
            &self.notifications,
            result,
            |_| NotificationsAction::MarkedRead(id),
            NotificationsAction::Failed,
        )
        .await
    }

    pub async fn mark_all_notifications_read(&self) -> ApiResult<()> {
        Self::dispatch(&self.notifications, NotificationsAction::Pending).await;
        let result = self.backend.notifications.mark_all_read().await;
        self.settle(
            &self.notifications,
            result,
            |_| NotificationsAction::AllMarkedRead,
            NotificationsAction::Failed,
        )
        .await
    }

    pub async fn delete_notification(&self, id: NotificationId) -> ApiResult<()> {
        Self::dispatch(&self.notifications, NotificationsAction::Pending).await;
        let result = self.backend.notifications.remove(id).await;
        self.settle(
            &self.notifications,
            result,
            |_| NotificationsAction::Deleted(id),
            NotificationsAction::Failed,
        )
        .await
    }

    pub async fn clear_all_notifications(&self) -> ApiResult<()> {
        Self::dispatch(&self.notifications, NotificationsAction::Pending).await;
        let result = self.backend.notifications.clear_all().await;
        self.settle(
            &self.notifications,
            result,
            |_| NotificationsAction::AllCleared,
            NotificationsAction::Failed,
        )
        .await
    }

    /// Read the server's unread count and refetch the list when the local
    /// counter disagrees with it.
    pub async fn fetch_unread_count(&self) -> ApiResult<usize> {
        Self::dispatch(&self.notifications, NotificationsAction::Pending).await;
        let result = self.backend.notifications.unread_count().await;
        let remote = self
            .settle(
                &self.notifications,
                result,
                |_| NotificationsAction::CountChecked,
                NotificationsAction::Failed,
            )
            .await?;
        let local = self.notifications.lock().await.unread_count;
        if local != remote {
            debug!("Unread count drifted ({} held, {} on server), refetching", local, remote);
            self.fetch_notifications().await?;
        }
        Ok(remote)
    }

    /// A notification pushed by the server.
    pub async fn receive_notification(&self, notification: Notification) {
        debug!("Received notification {}", notification.id);
        Self::dispatch(&self.notifications, NotificationsAction::Received(notification)).await;
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
