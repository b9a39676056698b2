//! Demo data the mock backend starts with.

use super::database::{MockDatabase, StoredFile};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use gradtrack_core::{
    Comment, CommentId, FileId, FileRecord, Folder, FolderId, MilestoneId, MilestoneStatus,
    Project, ProjectId, ProjectStatus, Role, Team, User, UserId, UserRef,
};

/// Password of both demo accounts.
pub const DEMO_PASSWORD: &str = "password123";
/// Token of the demo student.
pub const STUDENT_TOKEN: &str = "mock-student-token-123";
/// Token of the demo supervisor.
pub const SUPERVISOR_TOKEN: &str = "mock-supervisor-token-456";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    date(y, m, d).and_time(NaiveTime::MIN).and_utc()
}

fn milestone_folder(
    id: u64,
    name: &str,
    description: &str,
    due: NaiveDate,
    status: MilestoneStatus,
    progress: u8,
) -> Folder {
    Folder {
        id: FolderId(id),
        name: name.to_string(),
        description: Some(description.to_string()),
        parent_folder_id: None,
        repository_id: ProjectId(1),
        is_milestone: true,
        due_date: Some(due),
        status: Some(status),
        progress: Some(progress),
    }
}

fn plain_folder(id: u64, name: &str, parent: Option<u64>) -> Folder {
    Folder {
        id: FolderId(id),
        name: name.to_string(),
        description: None,
        parent_folder_id: parent.map(FolderId),
        repository_id: ProjectId(1),
        is_milestone: false,
        due_date: None,
        status: None,
        progress: None,
    }
}

#[allow(clippy::too_many_arguments)]
fn seeded_file(
    id: u64,
    name: &str,
    size: u64,
    mime: &str,
    description: &str,
    uploaded: DateTime<Utc>,
    uploader: UserRef,
    milestone: u64,
) -> StoredFile {
    StoredFile {
        record: FileRecord {
            id: FileId(id),
            file_name: name.to_string(),
            file_size: size,
            file_type: mime.to_string(),
            description: Some(description.to_string()),
            upload_date: uploaded,
            uploaded_by: uploader,
            folder_id: None,
            milestone_id: Some(MilestoneId(milestone)),
            project_id: Some(ProjectId(1)),
        },
        bytes: format!("placeholder content of {}", name).into_bytes(),
    }
}

impl MockDatabase {
    /// The demo dataset: a student and a supervisor account, two projects
    /// (the first with two milestones and a small folder tree), two files,
    /// a couple of comments and notifications.
    pub fn seeded() -> Self {
        let mut db = MockDatabase::empty();

        let student = db.add_account(
            User {
                id: UserId(0),
                name: "Test Student".to_string(),
                email: "student@test.com".to_string(),
                role: Role::Student,
                student_id: Some("ST001".to_string()),
            },
            DEMO_PASSWORD,
            STUDENT_TOKEN,
        );
        let supervisor = db.add_account(
            User {
                id: UserId(0),
                name: "Test Supervisor".to_string(),
                email: "supervisor@test.com".to_string(),
                role: Role::Supervisor,
                student_id: None,
            },
            DEMO_PASSWORD,
            SUPERVISOR_TOKEN,
        );

        db.projects = vec![
            Project {
                id: ProjectId(1),
                name: "Hospital management system".to_string(),
                short_description: Some(
                    "Integrated system for managing hospitals and clinics".to_string(),
                ),
                status: ProjectStatus::Active,
                start_date: Some(date(2024, 1, 1)),
                end_date: Some(date(2024, 6, 30)),
                supervisor: Some(UserRef::from(&supervisor)),
                team: Some(Team {
                    members: vec![student.id, supervisor.id, UserId(3)],
                }),
                milestones: Vec::new(),
            },
            Project {
                id: ProjectId(2),
                name: "E-commerce application".to_string(),
                short_description: Some("Online shopping platform".to_string()),
                status: ProjectStatus::Active,
                start_date: Some(date(2024, 2, 1)),
                end_date: Some(date(2024, 7, 31)),
                supervisor: Some(UserRef::from(&supervisor)),
                team: Some(Team {
                    members: vec![student.id, supervisor.id],
                }),
                milestones: Vec::new(),
            },
        ];
        db.next.project = 3;

        db.folders = vec![
            milestone_folder(
                1,
                "Requirements analysis",
                "Collect and analyse the system requirements",
                date(2024, 2, 1),
                MilestoneStatus::Completed,
                100,
            ),
            milestone_folder(
                2,
                "System design",
                "Design the user interface and the database",
                date(2024, 3, 1),
                MilestoneStatus::InProgress,
                60,
            ),
            plain_folder(3, "Documents", None),
            plain_folder(4, "Diagrams", Some(3)),
        ];
        db.next.folder = 5;

        db.files = vec![
            seeded_file(
                1,
                "requirements.pdf",
                1_024_000,
                "application/pdf",
                "System requirements document",
                midnight(2024, 1, 15),
                UserRef::from(&student),
                1,
            ),
            seeded_file(
                2,
                "database-design.docx",
                2_048_000,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "Database design",
                midnight(2024, 2, 20),
                UserRef {
                    id: UserId(3),
                    name: "Sara Ahmed".to_string(),
                },
                2,
            ),
        ];
        db.next.file = 3;

        db.comments = vec![
            Comment {
                id: CommentId(1),
                content: "Clear and complete requirements.".to_string(),
                file_id: FileId(1),
                user_role: Role::Supervisor,
                rating: Some(4),
            },
            Comment {
                id: CommentId(2),
                content: "Updated section 3 as requested.".to_string(),
                file_id: FileId(1),
                user_role: Role::Student,
                rating: None,
            },
        ];
        db.next.comment = 3;

        db.notify(
            "New comment",
            "Your supervisor commented on requirements.pdf",
            Some("comment"),
        );
        let reminder = db.notify(
            "Upcoming deadline",
            "System design is due on 2024-03-01",
            Some("deadline"),
        );
        // the reminder was already seen
        let _ = db.mark_read(reminder.id);

        db
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradtrack_core::Credentials;

    #[test]
    fn test_seeded_accounts_log_in() {
        let db = MockDatabase::seeded();
        let session = db
            .login(&Credentials {
                email: "student@test.com".to_string(),
                password: DEMO_PASSWORD.to_string(),
            })
            .unwrap();
        assert_eq!(session.token, STUDENT_TOKEN);
        assert_eq!(session.user.id, UserId(1));

        let bad = db.login(&Credentials {
            email: "student@test.com".to_string(),
            password: "wrong".to_string(),
        });
        assert!(bad.unwrap_err().is_unauthorized());
    }

    #[test]
    fn test_seeded_projects() {
        let db = MockDatabase::seeded();
        let projects = db.projects();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].milestones.len(), 2);
        assert_eq!(projects[0].completed_milestones(), 1);
        assert!(projects[1].milestones.is_empty());
    }

    #[test]
    fn test_seeded_files_sit_in_milestones() {
        let db = MockDatabase::seeded();
        assert_eq!(db.files_in_folder(FolderId(1)).len(), 1);
        assert_eq!(db.files_in_folder(FolderId(2)).len(), 1);
        assert_eq!(db.unread_count(), 1);
    }
}
