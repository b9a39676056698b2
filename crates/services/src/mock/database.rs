//! State of the in-memory fake server.
//!
//! Milestones are stored the way the server stores them, as folders with the
//! milestone marker; project payloads get their milestones attached on read.

use chrono::Utc;
use gradtrack_core::{
    ApiError, ApiResult, Comment, CommentDraft, CommentId, CommentPatch, Credentials, Download,
    ErrorKind, FileId, FileRecord, FileUpload, Folder, FolderDraft, FolderId, FolderPatch,
    Milestone, Notification, NotificationId, Project, ProjectDraft, ProjectId, ProjectPatch,
    ProjectStatus, Registration, Role, Session, User, UserId, UserRef, rating_in_range,
};
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

/// A registered account.
#[derive(Debug, Clone)]
pub struct MockAccount {
    pub user: User,
    pub password: String,
    pub token: String,
}

/// A stored file: metadata plus content.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub record: FileRecord,
    pub bytes: Vec<u8>,
}

/// Monotonic id counters, one per family. Ids are never reused.
#[derive(Debug, Clone)]
pub(crate) struct Counters {
    pub user: u64,
    pub project: u64,
    pub folder: u64,
    pub file: u64,
    pub comment: u64,
    pub notification: u64,
}

fn bump(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}

/// Everything the fake server knows.
#[derive(Debug, Clone)]
pub struct MockDatabase {
    pub(crate) accounts: Vec<MockAccount>,
    pub(crate) projects: Vec<Project>,
    pub(crate) folders: Vec<Folder>,
    pub(crate) files: Vec<StoredFile>,
    pub(crate) comments: Vec<Comment>,
    pub(crate) notifications: Vec<Notification>,
    pub(crate) next: Counters,
    faults: VecDeque<ApiError>,
    upload_fault: Option<(u8, ApiError)>,
    delays: VecDeque<Duration>,
}

impl MockDatabase {
    /// An empty database with no accounts.
    pub fn empty() -> Self {
        Self {
            accounts: Vec::new(),
            projects: Vec::new(),
            folders: Vec::new(),
            files: Vec::new(),
            comments: Vec::new(),
            notifications: Vec::new(),
            next: Counters {
                user: 1,
                project: 1,
                folder: 1,
                file: 1,
                comment: 1,
                notification: 1,
            },
            faults: VecDeque::new(),
            upload_fault: None,
            delays: VecDeque::new(),
        }
    }

    // ---- fault injection ----

    /// Hold the next call back by `extra` on top of the backend latency.
    pub fn push_delay(&mut self, extra: Duration) {
        self.delays.push_back(extra);
    }

    /// Extra delay for the call being served, if one was queued.
    pub fn take_delay(&mut self) -> Duration {
        self.delays.pop_front().unwrap_or_default()
    }

    /// Queue a failure for the next call.
    pub fn push_fault(&mut self, err: ApiError) {
        self.faults.push_back(err);
    }

    /// Pop the queued failure, if any.
    pub fn take_fault(&mut self) -> ApiResult<()> {
        match self.faults.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Make the next upload stop at `percent` with `err`.
    pub fn set_upload_fault(&mut self, percent: u8, err: ApiError) {
        self.upload_fault = Some((percent.min(100), err));
    }

    /// Take the pending upload failure, if any.
    pub fn take_upload_fault(&mut self) -> Option<(u8, ApiError)> {
        self.upload_fault.take()
    }

    // ---- accounts ----

    /// Add an account, returning its user.
    pub fn add_account(&mut self, mut user: User, password: &str, token: &str) -> User {
        user.id = UserId(bump(&mut self.next.user));
        self.accounts.push(MockAccount {
            user: user.clone(),
            password: password.to_string(),
            token: token.to_string(),
        });
        user
    }

    /// Resolve a bearer token to its user.
    pub fn authorize(&self, token: Option<&str>) -> ApiResult<User> {
        let token = token.ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;
        self.accounts
            .iter()
            .find(|a| a.token == token)
            .map(|a| a.user.clone())
            .ok_or_else(|| ApiError::unauthorized("Session expired, please log in again"))
    }

    pub fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        self.accounts
            .iter()
            .find(|a| a.user.email == credentials.email && a.password == credentials.password)
            .map(|a| Session {
                token: a.token.clone(),
                user: a.user.clone(),
            })
            .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))
    }

    pub fn register(&mut self, registration: Registration) -> ApiResult<Session> {
        if registration.email.trim().is_empty() {
            return Err(ApiError::validation("email", "Email is required"));
        }
        if self.accounts.iter().any(|a| a.user.email == registration.email) {
            return Err(ApiError::new(ErrorKind::Conflict, "Email already registered"));
        }
        let token = format!("mock-token-{}", self.next.user);
        let user = User {
            id: UserId(0),
            name: registration.name,
            email: registration.email,
            role: registration.role,
            student_id: registration.student_id,
        };
        let user = self.add_account(user, &registration.password, &token);
        Ok(Session { token, user })
    }

    // ---- projects ----

    fn with_milestones(&self, project: &Project) -> Project {
        let mut project = project.clone();
        project.milestones = self
            .folders
            .iter()
            .filter(|f| f.repository_id == project.id && f.is_milestone)
            .filter_map(|f| Milestone::try_from(f.clone()).ok())
            .collect();
        project
    }

    fn project_index(&self, id: ProjectId) -> ApiResult<usize> {
        self.projects
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Project {}", id)))
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.iter().map(|p| self.with_milestones(p)).collect()
    }

    pub fn projects_for_user(&self, user: UserId) -> Vec<Project> {
        self.projects
            .iter()
            .filter(|p| {
                p.team.as_ref().is_some_and(|t| t.members.contains(&user))
                    || p.supervisor.as_ref().is_some_and(|s| s.id == user)
            })
            .map(|p| self.with_milestones(p))
            .collect()
    }

    pub fn project(&self, id: ProjectId) -> ApiResult<Project> {
        let idx = self.project_index(id)?;
        Ok(self.with_milestones(&self.projects[idx]))
    }

    pub fn create_project(&mut self, draft: ProjectDraft, creator: &User) -> ApiResult<Project> {
        if draft.name.trim().is_empty() {
            return Err(ApiError::validation("name", "Project name is required"));
        }
        let supervisor = match draft.supervisor_id {
            Some(id) => Some(
                self.accounts
                    .iter()
                    .find(|a| a.user.id == id && a.user.role == Role::Supervisor)
                    .map(|a| UserRef::from(&a.user))
                    .ok_or_else(|| ApiError::validation("supervisorId", "Unknown supervisor"))?,
            ),
            None if creator.role == Role::Supervisor => Some(UserRef::from(creator)),
            None => None,
        };
        let project = Project {
            id: ProjectId(bump(&mut self.next.project)),
            name: draft.name,
            short_description: draft.short_description,
            status: ProjectStatus::Active,
            start_date: draft.start_date,
            end_date: draft.end_date,
            supervisor,
            team: Some(gradtrack_core::Team {
                members: vec![creator.id],
            }),
            milestones: Vec::new(),
        };
        self.projects.push(project.clone());
        Ok(project)
    }

    pub fn update_project(&mut self, id: ProjectId, patch: ProjectPatch) -> ApiResult<Project> {
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ApiError::validation("name", "Project name is required"));
        }
        let idx = self.project_index(id)?;
        self.projects[idx].apply(patch);
        Ok(self.with_milestones(&self.projects[idx]))
    }

    /// Remove a project together with its folders and files.
    pub fn remove_project(&mut self, id: ProjectId) -> ApiResult<()> {
        let idx = self.project_index(id)?;
        self.projects.remove(idx);
        self.folders.retain(|f| f.repository_id != id);
        let orphaned: BTreeSet<FileId> = self
            .files
            .iter()
            .filter(|f| f.record.project_id == Some(id))
            .map(|f| f.record.id)
            .collect();
        self.drop_files(&orphaned);
        Ok(())
    }

    pub fn search(&self, keyword: &str) -> Vec<Project> {
        let needle = keyword.trim().to_lowercase();
        self.projects
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.short_description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            })
            .map(|p| self.with_milestones(p))
            .collect()
    }

    // ---- folders ----

    fn folder_index(&self, id: FolderId) -> ApiResult<usize> {
        self.folders
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Folder {}", id)))
    }

    pub fn folder(&self, id: FolderId) -> ApiResult<Folder> {
        Ok(self.folders[self.folder_index(id)?].clone())
    }

    pub fn root_folders(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        self.project_index(repository)?;
        Ok(self
            .folders
            .iter()
            .filter(|f| f.repository_id == repository && f.is_root())
            .cloned()
            .collect())
    }

    pub fn subfolders(&self, repository: ProjectId, parent: FolderId) -> ApiResult<Vec<Folder>> {
        self.folder_index(parent)?;
        Ok(self
            .folders
            .iter()
            .filter(|f| f.repository_id == repository && f.parent_folder_id == Some(parent))
            .cloned()
            .collect())
    }

    pub fn milestone_folders(&self, repository: ProjectId) -> ApiResult<Vec<Folder>> {
        self.project_index(repository)?;
        Ok(self
            .folders
            .iter()
            .filter(|f| f.repository_id == repository && f.is_milestone)
            .cloned()
            .collect())
    }

    pub fn create_folder(&mut self, draft: FolderDraft) -> ApiResult<Folder> {
        if draft.name.trim().is_empty() {
            return Err(ApiError::validation("name", "Folder name is required"));
        }
        if draft.is_milestone && draft.due_date.is_none() {
            return Err(ApiError::validation("dueDate", "Due date is required"));
        }
        self.project_index(draft.repository_id)?;
        if let Some(parent) = draft.parent_folder_id {
            let parent = self.folder(parent)?;
            if parent.repository_id != draft.repository_id {
                return Err(ApiError::validation(
                    "parentFolderId",
                    "Parent folder belongs to another project",
                ));
            }
        }
        let folder = Folder {
            id: FolderId(bump(&mut self.next.folder)),
            name: draft.name,
            description: draft.description,
            parent_folder_id: draft.parent_folder_id,
            repository_id: draft.repository_id,
            is_milestone: draft.is_milestone,
            due_date: draft.due_date,
            status: draft.is_milestone.then(Default::default),
            progress: draft.is_milestone.then_some(0),
        };
        self.folders.push(folder.clone());
        Ok(folder)
    }

    pub fn update_folder(&mut self, id: FolderId, patch: FolderPatch) -> ApiResult<Folder> {
        let idx = self.folder_index(id)?;
        if let Some(Some(parent)) = patch.parent_folder_id {
            if parent == id || self.descendants(id).contains(&parent) {
                return Err(ApiError::validation(
                    "parentFolderId",
                    "A folder cannot be moved into itself",
                ));
            }
            self.folder_index(parent)?;
        }
        if patch.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(ApiError::validation("name", "Folder name is required"));
        }
        self.folders[idx].apply(patch);
        Ok(self.folders[idx].clone())
    }

    /// Remove a folder, its descendants and the files inside them.
    pub fn remove_folder(&mut self, id: FolderId) -> ApiResult<()> {
        self.folder_index(id)?;
        let mut doomed = self.descendants(id);
        doomed.insert(id);
        self.folders.retain(|f| !doomed.contains(&f.id));
        let orphaned: BTreeSet<FileId> = self
            .files
            .iter()
            .filter(|f| f.record.container().is_some_and(|c| doomed.contains(&c)))
            .map(|f| f.record.id)
            .collect();
        self.drop_files(&orphaned);
        Ok(())
    }

    fn descendants(&self, id: FolderId) -> BTreeSet<FolderId> {
        let mut found = BTreeSet::new();
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            for child in self.folders.iter().filter(|f| f.parent_folder_id == Some(parent)) {
                if found.insert(child.id) {
                    frontier.push(child.id);
                }
            }
        }
        found
    }

    // ---- files ----

    fn file_index(&self, id: FileId) -> ApiResult<usize> {
        self.files
            .iter()
            .position(|f| f.record.id == id)
            .ok_or_else(|| ApiError::not_found(format!("File {}", id)))
    }

    fn drop_files(&mut self, ids: &BTreeSet<FileId>) {
        self.files.retain(|f| !ids.contains(&f.record.id));
        self.comments.retain(|c| !ids.contains(&c.file_id));
    }

    /// Check an upload can be stored before any progress is reported.
    pub fn check_upload(&self, upload: &FileUpload) -> ApiResult<()> {
        if upload.file_name.trim().is_empty() {
            return Err(ApiError::validation("file", "A file is required"));
        }
        self.folder(upload.folder_id).map(|_| ())
    }

    pub fn store_upload(&mut self, upload: FileUpload, uploader: &User) -> ApiResult<FileRecord> {
        let folder = self.folder(upload.folder_id)?;
        let record = FileRecord {
            id: FileId(bump(&mut self.next.file)),
            file_name: upload.file_name,
            file_size: upload.bytes.len() as u64,
            file_type: upload.content_type,
            description: upload.description,
            upload_date: Utc::now(),
            uploaded_by: UserRef::from(uploader),
            folder_id: (!folder.is_milestone).then_some(folder.id),
            milestone_id: folder.is_milestone.then(|| folder.id.into()),
            project_id: Some(folder.repository_id),
        };
        self.files.push(StoredFile {
            record: record.clone(),
            bytes: upload.bytes,
        });
        Ok(record)
    }

    pub fn file(&self, id: FileId) -> ApiResult<FileRecord> {
        Ok(self.files[self.file_index(id)?].record.clone())
    }

    pub fn files_in_folder(&self, folder: FolderId) -> Vec<FileRecord> {
        self.files
            .iter()
            .filter(|f| f.record.container() == Some(folder))
            .map(|f| f.record.clone())
            .collect()
    }

    pub fn files_of_user(&self, user: UserId) -> Vec<FileRecord> {
        self.files
            .iter()
            .filter(|f| f.record.uploaded_by.id == user)
            .map(|f| f.record.clone())
            .collect()
    }

    pub fn remove_file(&mut self, id: FileId) -> ApiResult<()> {
        self.file_index(id)?;
        self.drop_files(&BTreeSet::from([id]));
        Ok(())
    }

    pub fn download(&self, id: FileId) -> ApiResult<Download> {
        let stored = &self.files[self.file_index(id)?];
        Ok(Download {
            file_name: stored.record.file_name.clone(),
            content_type: Some(stored.record.file_type.clone()),
            bytes: stored.bytes.clone(),
        })
    }

    /// Every upload with the same name in the same container, oldest first.
    pub fn history(&self, id: FileId) -> ApiResult<Vec<FileRecord>> {
        let target = self.file(id)?;
        let mut versions: Vec<FileRecord> = self
            .files
            .iter()
            .map(|f| &f.record)
            .filter(|r| r.file_name == target.file_name && r.container() == target.container())
            .cloned()
            .collect();
        versions.sort_by(|a, b| a.upload_date.cmp(&b.upload_date).then(a.id.cmp(&b.id)));
        Ok(versions)
    }

    // ---- comments ----

    fn comment_index(&self, id: CommentId) -> ApiResult<usize> {
        self.comments
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Comment {}", id)))
    }

    fn check_rating(rating: Option<u8>, author: &User) -> ApiResult<()> {
        match rating {
            Some(_) if author.role != Role::Supervisor => Err(ApiError::validation(
                "rating",
                "Only supervisors can rate a file",
            )),
            Some(r) if !rating_in_range(r) => {
                Err(ApiError::validation("rating", "Rating must be between 1 and 5"))
            }
            _ => Ok(()),
        }
    }

    pub fn create_comment(&mut self, draft: CommentDraft, author: &User) -> ApiResult<Comment> {
        if draft.content.trim().is_empty() {
            return Err(ApiError::validation("content", "Comment text is required"));
        }
        Self::check_rating(draft.rating, author)?;
        self.file_index(draft.file_id)?;
        let comment = Comment {
            id: CommentId(bump(&mut self.next.comment)),
            content: draft.content,
            file_id: draft.file_id,
            user_role: author.role,
            rating: draft.rating,
        };
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn comment(&self, id: CommentId) -> ApiResult<Comment> {
        Ok(self.comments[self.comment_index(id)?].clone())
    }

    pub fn update_comment(
        &mut self,
        id: CommentId,
        patch: CommentPatch,
        author: &User,
    ) -> ApiResult<Comment> {
        let idx = self.comment_index(id)?;
        Self::check_rating(patch.rating, author)?;
        let comment = &mut self.comments[idx];
        if let Some(content) = patch.content {
            comment.content = content;
        }
        if let Some(rating) = patch.rating {
            comment.rating = Some(rating);
        }
        Ok(comment.clone())
    }

    pub fn remove_comment(&mut self, id: CommentId) -> ApiResult<()> {
        let idx = self.comment_index(id)?;
        self.comments.remove(idx);
        Ok(())
    }

    pub fn comments_for_file(&self, file: FileId, role: Option<Role>) -> ApiResult<Vec<Comment>> {
        self.file_index(file)?;
        Ok(self
            .comments
            .iter()
            .filter(|c| c.file_id == file && role.map_or(true, |r| c.user_role == r))
            .cloned()
            .collect())
    }

    // ---- notifications ----

    fn notification_index(&self, id: NotificationId) -> ApiResult<usize> {
        self.notifications
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| ApiError::not_found(format!("Notification {}", id)))
    }

    /// Emit a notification, as the server would after some event.
    pub fn notify(&mut self, title: &str, message: &str, kind: Option<&str>) -> Notification {
        let mut notification = Notification::new(
            NotificationId(bump(&mut self.next.notification)),
            title,
            message,
        );
        notification.kind = kind.map(str::to_string);
        self.notifications.push(notification.clone());
        notification
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.clone()
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.read).count()
    }

    pub fn mark_read(&mut self, id: NotificationId) -> ApiResult<()> {
        let idx = self.notification_index(id)?;
        self.notifications[idx].read = true;
        Ok(())
    }

    pub fn mark_all_read(&mut self) {
        for n in &mut self.notifications {
            n.read = true;
        }
    }

    pub fn remove_notification(&mut self, id: NotificationId) -> ApiResult<()> {
        let idx = self.notification_index(id)?;
        self.notifications.remove(idx);
        Ok(())
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }
}
