//! End-to-end behaviour of the store against the in-memory backend.

use chrono::NaiveDate;
use gradtrack_core::{
    ApiError, CommentDraft, CommentPatch, Credentials, ErrorKind, FileId, FileScope, FileUpload,
    FolderDraft, FolderId, FolderPatch, MilestoneDraft, MilestoneId, MilestonePatch,
    MilestoneStatus, Notification, NotificationId, ProjectId, ProjectPatch, Role,
};
use gradtrack_services::mock::{DEMO_PASSWORD, SUPERVISOR_TOKEN};
use gradtrack_services::{Backend, MockBackend, SessionContext};
use gradtrack_storage::{MemorySessionStore, SessionStore};
use gradtrack_store::Store;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: Arc<Store>,
    mock: Arc<MockBackend>,
    persisted: Arc<MemorySessionStore>,
}

fn harness_with(mock: impl FnOnce(SessionContext) -> MockBackend) -> Harness {
    let persisted = Arc::new(MemorySessionStore::new());
    let session = SessionContext::new(persisted.clone());
    let mock = Arc::new(mock(session.clone()));
    let store = Arc::new(Store::new(Backend::mock(mock.clone()), session));
    Harness {
        store,
        mock,
        persisted,
    }
}

async fn signed_in_as(email: &str) -> Harness {
    let h = harness_with(MockBackend::new);
    h.store
        .login(Credentials {
            email: email.to_string(),
            password: DEMO_PASSWORD.to_string(),
        })
        .await
        .unwrap();
    h
}

async fn student() -> Harness {
    signed_in_as("student@test.com").await
}

async fn supervisor() -> Harness {
    signed_in_as("supervisor@test.com").await
}

fn upload(name: &str, folder: u64) -> FileUpload {
    FileUpload {
        file_name: name.to_string(),
        content_type: "application/pdf".to_string(),
        bytes: vec![7; 2048],
        description: Some("Chapter draft".to_string()),
        folder_id: FolderId(folder),
    }
}

fn server_down() -> ApiError {
    ApiError::from_status(503, None, "Service unavailable")
}

#[tokio::test]
async fn test_create_milestone_lands_on_its_project() {
    let h = student().await;
    let projects = h.store.fetch_projects().await.unwrap();
    assert_eq!(projects.len(), 2);

    let due = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let milestone = h
        .store
        .create_milestone(
            ProjectId(1),
            MilestoneDraft {
                milestone_name: "Design".to_string(),
                description: None,
                due_date: due,
            },
        )
        .await
        .unwrap();

    let state = h.store.projects().await;
    assert!(!state.slice.is_loading);
    assert!(state.slice.last_error.is_none());
    let first = &state.slice.items[0];
    assert_eq!(first.milestones.len(), 3);
    let added = first.milestones.last().unwrap();
    assert_eq!(added.id, milestone.id);
    assert_eq!(added.milestone_name, "Design");
    assert_eq!(added.due_date, due);
    assert_eq!(added.status, MilestoneStatus::NotStarted);
    assert!(state.slice.items[1].milestones.is_empty());
}

#[tokio::test]
async fn test_upload_failure_midway_leaves_files_untouched() {
    let h = student().await;
    let before = h
        .store
        .fetch_files(FileScope::Milestone(MilestoneId(1)), None)
        .await
        .unwrap();

    h.mock
        .fail_upload_at(50, ApiError::network("connection reset"))
        .await;
    let err = h.store.upload_file(upload("chapter1.pdf", 1)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NetworkUnreachable);

    let files = h.store.files().await;
    assert_eq!(files.slice.items, before);
    assert_eq!(files.upload_progress, 0);
    assert!(!files.is_uploading());
    assert!(!files.slice.is_loading);
    assert_eq!(
        files.slice.last_error.map(|e| e.kind),
        Some(ErrorKind::NetworkUnreachable)
    );
    // a network failure does not sign anyone out
    assert!(h.store.auth().await.is_authenticated());
}

#[tokio::test]
async fn test_upload_success_appends_and_completes() {
    let h = student().await;
    h.store
        .fetch_files(FileScope::Milestone(MilestoneId(1)), None)
        .await
        .unwrap();

    let file = h.store.upload_file(upload("chapter1.pdf", 1)).await.unwrap();
    let files = h.store.files().await;
    assert_eq!(files.upload_progress, 100);
    assert_eq!(files.slice.items.last(), Some(&file));
    assert_eq!(files.slice.selected.as_ref(), Some(&file));
    assert_eq!(file.milestone_id, Some(MilestoneId(1)));

    h.store.reset_upload_progress().await;
    assert_eq!(h.store.files().await.upload_progress, 0);
}

#[tokio::test(start_paused = true)]
async fn test_upload_progress_never_goes_backwards() {
    let h = harness_with(|session| {
        MockBackend::new(session).with_latency(Duration::from_millis(100))
    });
    h.store
        .login(Credentials {
            email: "student@test.com".to_string(),
            password: DEMO_PASSWORD.to_string(),
        })
        .await
        .unwrap();

    let store = h.store.clone();
    let task = tokio::spawn(async move { store.upload_file(upload("slides.pdf", 3)).await });

    let mut samples = Vec::new();
    for _ in 0..30 {
        tokio::time::sleep(Duration::from_millis(7)).await;
        samples.push(h.store.files().await.upload_progress);
    }
    task.await.unwrap().unwrap();
    samples.push(h.store.files().await.upload_progress);

    assert!(samples.windows(2).all(|w| w[0] <= w[1]), "{:?}", samples);
    assert_eq!(samples.last(), Some(&100));
}

#[tokio::test]
async fn test_unauthorized_from_any_slice_signs_out() {
    let h = student().await;
    assert!(h.persisted.load().await.unwrap().is_some());

    h.mock
        .fail_next(ApiError::unauthorized("Token expired"))
        .await;
    let err = h.store.fetch_notifications().await.unwrap_err();
    assert!(err.is_unauthorized());

    let auth = h.store.auth().await;
    assert!(!auth.is_authenticated());
    assert!(!auth.is_loading);
    assert!(h.store.session().current().await.is_none());
    assert!(h.persisted.load().await.unwrap().is_none());

    let notifications = h.store.notifications().await;
    assert_eq!(
        notifications.slice.last_error.map(|e| e.kind),
        Some(ErrorKind::Unauthorized)
    );
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let h = harness_with(MockBackend::new);
    let err = h.store.fetch_projects().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unauthorized);
    assert!(!h.store.auth().await.is_authenticated());
}

#[tokio::test]
async fn test_restore_picks_up_persisted_session() {
    let h = supervisor().await;

    // a second client over the same persisted state
    let session = SessionContext::new(h.persisted.clone());
    let mock = Arc::new(MockBackend::new(session.clone()));
    let store = Store::new(Backend::mock(mock), session);

    let restored = store.restore().await.unwrap();
    assert_eq!(restored.map(|s| s.token).as_deref(), Some(SUPERVISOR_TOKEN));
    assert_eq!(store.auth().await.role(), Some(Role::Supervisor));
    assert_eq!(store.fetch_projects().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_milestone_changes_reach_list_and_detail() {
    let h = student().await;
    h.store.fetch_projects().await.unwrap();
    h.store.fetch_project(ProjectId(1)).await.unwrap();

    let created = h
        .store
        .create_milestone(
            ProjectId(1),
            MilestoneDraft {
                milestone_name: "Testing".to_string(),
                description: None,
                due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            },
        )
        .await
        .unwrap();
    let state = h.store.projects().await;
    let selected = state.slice.selected.clone().unwrap();
    assert_eq!(state.slice.items[0].milestones, selected.milestones);
    assert!(selected.milestones.contains(&created));

    h.store
        .update_milestone(
            ProjectId(1),
            created.id,
            MilestonePatch {
                status: Some(MilestoneStatus::InProgress),
                progress: Some(40),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let state = h.store.projects().await;
    let selected = state.slice.selected.clone().unwrap();
    assert_eq!(state.slice.items[0].milestones, selected.milestones);
    let updated = selected.milestones.iter().find(|m| m.id == created.id).unwrap();
    assert_eq!(updated.status, MilestoneStatus::InProgress);
    assert_eq!(updated.progress, Some(40));

    h.store.delete_milestone(ProjectId(1), created.id).await.unwrap();
    let state = h.store.projects().await;
    let selected = state.slice.selected.clone().unwrap();
    assert_eq!(state.slice.items[0].milestones, selected.milestones);
    assert_eq!(selected.milestones.len(), 2);
}

#[tokio::test]
async fn test_project_update_and_delete_keep_copies_in_step() {
    let h = student().await;
    h.store.fetch_projects().await.unwrap();
    h.store.fetch_project(ProjectId(2)).await.unwrap();

    h.store
        .update_project(
            ProjectId(2),
            ProjectPatch {
                name: Some("Online marketplace".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let state = h.store.projects().await;
    assert_eq!(state.slice.items[1].name, "Online marketplace");
    assert_eq!(state.slice.selected.as_ref().unwrap().name, "Online marketplace");

    h.store.delete_project(ProjectId(2)).await.unwrap();
    let state = h.store.projects().await;
    assert_eq!(state.slice.items.len(), 1);
    assert!(state.slice.selected.is_none());
}

#[tokio::test]
async fn test_failures_never_mutate_collections() {
    let h = supervisor().await;
    h.store.fetch_projects().await.unwrap();
    h.store.fetch_project(ProjectId(1)).await.unwrap();
    h.store.fetch_root_folders(ProjectId(1)).await.unwrap();
    h.store.fetch_folder(FolderId(3)).await.unwrap();
    h.store
        .fetch_files(FileScope::Milestone(MilestoneId(1)), None)
        .await
        .unwrap();
    h.store.fetch_file(FileId(1)).await.unwrap();
    h.store.fetch_comments(FileId(1)).await.unwrap();
    h.store.fetch_comment(gradtrack_core::CommentId(1)).await.unwrap();
    h.store.fetch_notifications().await.unwrap();

    let projects = h.store.projects().await.slice;
    let folders = h.store.folders().await.slice;
    let files = h.store.files().await.slice;
    let comments = h.store.comments().await.slice;
    let notifications = h.store.notifications().await.slice;
    assert!(projects.selected.is_some());
    assert!(folders.selected.is_some());
    assert!(files.selected.is_some());
    assert!(comments.selected.is_some());

    // projects and milestones
    h.mock.fail_next(server_down()).await;
    assert!(h.store.fetch_projects().await.is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h.store.delete_project(ProjectId(1)).await.is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h
        .store
        .update_milestone(
            ProjectId(1),
            MilestoneId(2),
            MilestonePatch {
                status: Some(MilestoneStatus::Completed),
                progress: Some(100),
                ..Default::default()
            }
        )
        .await
        .is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h
        .store
        .create_milestone(
            ProjectId(1),
            MilestoneDraft {
                milestone_name: "Testing".to_string(),
                description: None,
                due_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            }
        )
        .await
        .is_err());

    // folders
    h.mock.fail_next(server_down()).await;
    assert!(h.store.fetch_root_folders(ProjectId(1)).await.is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h
        .store
        .update_folder(
            FolderId(3),
            FolderPatch {
                name: Some("Renamed".to_string()),
                ..Default::default()
            }
        )
        .await
        .is_err());

    // files
    h.mock.fail_next(server_down()).await;
    assert!(h
        .store
        .fetch_files(FileScope::Milestone(MilestoneId(2)), None)
        .await
        .is_err());
    h.mock
        .fail_upload_at(30, ApiError::network("Connection reset"))
        .await;
    assert!(h.store.upload_file(upload("late.pdf", 1)).await.is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h.store.delete_file(FileId(1)).await.is_err());

    // comments
    h.mock.fail_next(server_down()).await;
    assert!(h.store.fetch_comments(FileId(1)).await.is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h
        .store
        .create_comment(CommentDraft {
            content: "Looks good".to_string(),
            file_id: FileId(1),
            rating: Some(5),
        })
        .await
        .is_err());

    // notifications
    h.mock.fail_next(server_down()).await;
    assert!(h.store.fetch_notifications().await.is_err());
    h.mock.fail_next(server_down()).await;
    assert!(h.store.mark_all_notifications_read().await.is_err());

    let state = h.store.projects().await;
    assert_eq!(state.slice.items, projects.items);
    assert_eq!(state.slice.selected, projects.selected);
    let selected = state.slice.selected.as_ref().unwrap();
    let listed = state.slice.items.iter().find(|p| p.id == ProjectId(1)).unwrap();
    assert_eq!(listed.milestones, selected.milestones);

    let state = h.store.folders().await;
    assert_eq!(state.slice.items, folders.items);
    assert_eq!(state.slice.selected, folders.selected);

    let state = h.store.files().await;
    assert_eq!(state.slice.items, files.items);
    assert_eq!(state.slice.selected, files.selected);
    assert_eq!(state.upload_progress, 0);
    assert_eq!(
        state.slice.last_error.map(|e| e.kind),
        Some(ErrorKind::ServerUnavailable)
    );

    let state = h.store.comments().await;
    assert_eq!(state.slice.items, comments.items);
    assert_eq!(state.slice.selected, comments.selected);

    let state = h.store.notifications().await;
    assert_eq!(state.slice.items, notifications.items);
    assert_eq!(state.slice.selected, notifications.selected);
    assert_eq!(state.unread_count, 1);
    assert_eq!(
        state.slice.last_error.map(|e| e.kind),
        Some(ErrorKind::ServerUnavailable)
    );
    assert!(!state.slice.is_loading);
    assert!(h.store.auth().await.is_authenticated());
}

#[tokio::test]
async fn test_validation_errors_carry_fields() {
    let h = student().await;
    let err = h
        .store
        .create_comment(CommentDraft {
            content: "I rate myself".to_string(),
            file_id: FileId(1),
            rating: Some(5),
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::ValidationRejected);
    assert!(err.field_errors.contains_key("rating"));
    assert_eq!(h.store.comments().await.slice.last_error, Some(err));
    assert!(h.store.auth().await.is_authenticated());
}

#[tokio::test]
async fn test_updates_keep_positions() {
    let h = supervisor().await;
    h.store.fetch_notifications().await.unwrap();
    let ids: Vec<NotificationId> = h
        .store
        .notifications()
        .await
        .slice
        .items
        .iter()
        .map(|n| n.id)
        .collect();

    h.store.mark_notification_read(ids[0]).await.unwrap();
    let state = h.store.notifications().await;
    assert_eq!(state.slice.items.iter().map(|n| n.id).collect::<Vec<_>>(), ids);
    assert_eq!(state.unread_count, 0);

    h.store.fetch_comments(FileId(1)).await.unwrap();
    h.store
        .update_comment(
            gradtrack_core::CommentId(1),
            CommentPatch {
                content: Some("Revised feedback".to_string()),
                rating: Some(5),
            },
        )
        .await
        .unwrap();
    let comments = h.store.comments().await;
    assert_eq!(comments.slice.items[0].content, "Revised feedback");
    assert_eq!(comments.slice.items[1].id.get(), 2);
    assert_eq!(comments.average_rating(), Some(5.0));
}

#[tokio::test]
async fn test_deleting_unlisted_entity_is_silent() {
    let h = student().await;
    h.store
        .fetch_files(FileScope::Milestone(MilestoneId(1)), None)
        .await
        .unwrap();
    let before = h.store.files().await.slice.items;

    // file 2 exists on the server but is not in the loaded list
    h.store.delete_file(FileId(2)).await.unwrap();
    let files = h.store.files().await;
    assert_eq!(files.slice.items, before);
    assert!(files.slice.last_error.is_none());
    assert!(!files.slice.is_loading);
}

#[tokio::test(start_paused = true)]
async fn test_latest_fetch_wins() {
    let h = student().await;
    // the first listing answers after the second one
    h.mock.delay_next(Duration::from_millis(200)).await;
    let (first, second) = tokio::join!(
        h.store.fetch_files(FileScope::Milestone(MilestoneId(1)), None),
        h.store.fetch_files(FileScope::Milestone(MilestoneId(2)), None),
    );
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.iter().map(|f| f.id).collect::<Vec<_>>(), vec![FileId(1)]);
    assert_eq!(second.iter().map(|f| f.id).collect::<Vec<_>>(), vec![FileId(2)]);

    let files = h.store.files().await;
    assert_eq!(files.slice.items, second);
    assert!(files.slice.last_error.is_none());
}

#[tokio::test]
async fn test_folder_tree_operations() {
    let h = student().await;
    h.store.fetch_root_folders(ProjectId(1)).await.unwrap();
    h.store.fetch_subfolders(ProjectId(1), FolderId(3)).await.unwrap();
    h.store.fetch_milestone_folders(ProjectId(1)).await.unwrap();

    let folders = h.store.folders().await;
    assert_eq!(folders.subfolders(FolderId(3)).map(<[_]>::len), Some(1));
    assert_eq!(folders.milestone_folders.len(), 2);

    let created = h
        .store
        .create_folder(FolderDraft {
            name: "Sketches".to_string(),
            repository_id: ProjectId(1),
            parent_folder_id: Some(FolderId(3)),
            is_milestone: false,
            description: None,
            due_date: None,
        })
        .await
        .unwrap();
    assert_eq!(
        h.store.folders().await.subfolders(FolderId(3)).map(<[_]>::len),
        Some(2)
    );

    // move it to the project root
    h.store
        .update_folder(
            created.id,
            FolderPatch {
                parent_folder_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let folders = h.store.folders().await;
    assert_eq!(folders.all_placed().filter(|f| f.id == created.id).count(), 1);
    assert_eq!(folders.slice.items.last().map(|f| f.id), Some(created.id));

    h.store.delete_folder(FolderId(3)).await.unwrap();
    let folders = h.store.folders().await;
    assert!(folders.subfolders(FolderId(3)).is_none());
    assert!(folders.slice.items.iter().all(|f| f.id != FolderId(3)));
}

#[tokio::test]
async fn test_role_views_and_role_fetch() {
    let h = supervisor().await;
    h.store.fetch_comments(FileId(1)).await.unwrap();
    let comments = h.store.comments().await;
    assert_eq!(comments.by_role(Role::Supervisor).len(), 1);
    assert_eq!(comments.by_role(Role::Student).len(), 1);

    h.store
        .create_comment(CommentDraft {
            content: "Please add a glossary.".to_string(),
            file_id: FileId(1),
            rating: Some(3),
        })
        .await
        .unwrap();
    h.store
        .fetch_comments_by_role(FileId(1), Role::Supervisor)
        .await
        .unwrap();
    let comments = h.store.comments().await;
    assert_eq!(comments.supervisor.len(), 2);
    assert_eq!(comments.student.len(), 1);
    assert_eq!(comments.slice.items.len(), 3);
}

#[tokio::test]
async fn test_pushed_notification_counts_as_unread() {
    let h = student().await;
    h.store.fetch_notifications().await.unwrap();
    assert_eq!(h.store.notifications().await.unread_count, 1);

    h.store
        .receive_notification(Notification::new(
            NotificationId(99),
            "File uploaded",
            "A teammate uploaded design.pdf",
        ))
        .await;
    let state = h.store.notifications().await;
    assert_eq!(state.unread_count, 2);
    assert_eq!(state.slice.items.last().map(|n| n.id), Some(NotificationId(99)));

    h.store.clear_all_notifications().await.unwrap();
    assert_eq!(h.store.notifications().await.unread_count, 0);
}

#[tokio::test]
async fn test_history_and_search() {
    let h = student().await;
    h.store.upload_file(upload("requirements.pdf", 1)).await.unwrap();
    let versions = h.store.fetch_file_history(FileId(1)).await.unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(h.store.files().await.history, versions);

    let results = h.store.search_projects("hospital").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(h.store.projects().await.search_results, results);
    h.store.clear_search_results().await;
    assert!(h.store.projects().await.search_results.is_empty());
}
