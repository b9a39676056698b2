//! GradTrack CLI - follow capstone projects from the terminal.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gradtrack_core::{
    bare_file_name, ApiError, CommentDraft, CommentId, Credentials, FileId, FileScope, FileUpload,
    FolderDraft, FolderId, MilestoneDraft, MilestoneId, MilestonePatch, MilestoneStatus,
    NotificationId, ProjectDraft, ProjectId, Registration, Role, DEFAULT_DOWNLOAD_NAME,
};
use gradtrack_progress::{project_progress, DashboardSnapshot};
use gradtrack_services::{Backend, ClientConfig, SessionContext};
use gradtrack_storage::JsonSessionStore;
use gradtrack_store::{ProjectFilter, Store};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gradtrack")]
#[command(about = "Capstone project tracker", long_about = None)]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(long, default_value = "gradtrack")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
        /// student or supervisor
        #[arg(long, default_value = "student")]
        role: Role,
        #[arg(long)]
        student_id: Option<String>,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Projects
    #[command(subcommand)]
    Projects(ProjectCommands),
    /// Milestones of a project
    #[command(subcommand)]
    Milestones(MilestoneCommands),
    /// Folder tree of a project
    #[command(subcommand)]
    Folders(FolderCommands),
    /// Uploaded files
    #[command(subcommand)]
    Files(FileCommands),
    /// Review comments on a file
    #[command(subcommand)]
    Comments(CommentCommands),
    /// Notifications
    #[command(subcommand)]
    Notifications(NotificationCommands),
    /// Summary of projects, deadlines and recent files
    Dashboard,
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List projects
    List {
        /// all, active, pending or completed
        #[arg(long, default_value = "all")]
        status: ProjectFilter,
        /// Only projects of the signed-in user
        #[arg(long)]
        mine: bool,
    },
    /// Show one project
    Show { id: ProjectId },
    /// Create a project
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Delete a project
    Delete { id: ProjectId },
    /// Search projects by keyword
    Search { keyword: String },
}

#[derive(Subcommand)]
enum MilestoneCommands {
    /// Add a milestone
    Add {
        project: ProjectId,
        name: String,
        #[arg(long)]
        due: NaiveDate,
        #[arg(long)]
        description: Option<String>,
    },
    /// Change a milestone
    Update {
        project: ProjectId,
        milestone: MilestoneId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        due: Option<NaiveDate>,
        /// not_started, in_progress, completed or overdue
        #[arg(long)]
        status: Option<MilestoneStatus>,
        #[arg(long)]
        progress: Option<u8>,
    },
    /// Remove a milestone
    Remove {
        project: ProjectId,
        milestone: MilestoneId,
    },
}

#[derive(Subcommand)]
enum FolderCommands {
    /// Root folders of a project
    List { project: ProjectId },
    /// Children of a folder
    Subfolders { project: ProjectId, parent: FolderId },
    /// Create a folder
    Create {
        project: ProjectId,
        name: String,
        #[arg(long)]
        parent: Option<FolderId>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a folder and everything under it
    Delete { id: FolderId },
}

#[derive(Subcommand)]
enum FileCommands {
    /// List files; defaults to the signed-in user's uploads
    List {
        #[arg(long, conflicts_with_all = ["milestone", "project"])]
        folder: Option<FolderId>,
        #[arg(long, conflicts_with = "project")]
        milestone: Option<MilestoneId>,
        #[arg(long)]
        project: Option<ProjectId>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Upload a file into a folder or milestone
    Upload {
        path: PathBuf,
        #[arg(long)]
        folder: FolderId,
        #[arg(long)]
        description: Option<String>,
    },
    /// Download a file
    Download {
        id: FileId,
        /// Output path; defaults to the server-provided name
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete a file
    Delete { id: FileId },
    /// Earlier versions of a file
    History { id: FileId },
}

#[derive(Subcommand)]
enum CommentCommands {
    /// Comments on a file
    List {
        file: FileId,
        #[arg(long)]
        role: Option<Role>,
    },
    /// Comment on a file
    Add {
        file: FileId,
        content: String,
        /// 1 to 5, supervisors only
        #[arg(long)]
        rating: Option<u8>,
    },
    /// Delete a comment
    Delete { id: CommentId },
}

#[derive(Subcommand)]
enum NotificationCommands {
    /// List notifications
    List,
    /// Mark one notification read
    Read { id: NotificationId },
    /// Mark every notification read
    ReadAll,
    /// Delete every notification
    Clear,
    /// Unread count as reported by the server
    Count,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = ClientConfig::load_from(&cli.config).context("Failed to load configuration")?;
    debug!("Using configuration {:?}", config);

    let persisted = JsonSessionStore::new(&config.session_path)
        .await
        .with_context(|| format!("Failed to open {}", config.session_path.display()))?;
    let session = SessionContext::new(Arc::new(persisted));
    let backend = Backend::from_config(&config, session.clone()).map_err(api)?;
    let store = Store::new(backend, session);
    store.restore().await.map_err(api)?;

    run(&store, cli.command).await
}

async fn run(store: &Store, command: Commands) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let session = store
                .login(Credentials { email, password })
                .await
                .map_err(api)?;
            println!("Signed in as {} ({:?})", session.user.name, session.user.role);
        }
        Commands::Register {
            name,
            email,
            password,
            role,
            student_id,
        } => {
            let session = store
                .register(Registration {
                    name,
                    email,
                    password,
                    role,
                    student_id,
                })
                .await
                .map_err(api)?;
            println!("Registered {}", session.user.email);
        }
        Commands::Logout => {
            store.logout().await;
            println!("Signed out");
        }
        Commands::Whoami => {
            let user = store.refresh_user().await.map_err(api)?;
            print_json(&user)?;
        }
        Commands::Projects(cmd) => projects(store, cmd).await?,
        Commands::Milestones(cmd) => milestones(store, cmd).await?,
        Commands::Folders(cmd) => folders(store, cmd).await?,
        Commands::Files(cmd) => files(store, cmd).await?,
        Commands::Comments(cmd) => comments(store, cmd).await?,
        Commands::Notifications(cmd) => notifications(store, cmd).await?,
        Commands::Dashboard => {
            store.fetch_projects().await.map_err(api)?;
            store
                .fetch_files(FileScope::CurrentUser, None)
                .await
                .map_err(api)?;
            let projects = store.projects().await.slice.items;
            let files = store.files().await.slice.items;
            let today = chrono::Local::now().date_naive();
            let snapshot = DashboardSnapshot::build(&projects, &files, today);
            print_json(&snapshot)?;
        }
    }
    Ok(())
}

async fn projects(store: &Store, cmd: ProjectCommands) -> Result<()> {
    match cmd {
        ProjectCommands::List { status, mine } => {
            if mine {
                store.fetch_user_projects().await.map_err(api)?;
            } else {
                store.fetch_projects().await.map_err(api)?;
            }
            store.set_filter(status).await;
            let state = store.projects().await;
            for project in state.visible() {
                println!(
                    "{:>4}  {:<9} {:>3}%  {}",
                    project.id,
                    format!("{:?}", project.status).to_uppercase(),
                    project_progress(project),
                    project.name
                );
            }
        }
        ProjectCommands::Show { id } => {
            store.fetch_project(id).await.map_err(api)?;
            print_json(&store.projects().await.slice.selected)?;
        }
        ProjectCommands::Create {
            name,
            description,
            start,
            end,
        } => {
            let mut draft = ProjectDraft::named(name);
            draft.short_description = description;
            draft.start_date = start;
            draft.end_date = end;
            let project = store.create_project(draft).await.map_err(api)?;
            info!("Created project {}", project.id);
            print_json(&project)?;
        }
        ProjectCommands::Delete { id } => {
            store.delete_project(id).await.map_err(api)?;
            println!("Deleted project {}", id);
        }
        ProjectCommands::Search { keyword } => {
            store.search_projects(&keyword).await.map_err(api)?;
            print_json(&store.projects().await.search_results)?;
        }
    }
    Ok(())
}

async fn milestones(store: &Store, cmd: MilestoneCommands) -> Result<()> {
    match cmd {
        MilestoneCommands::Add {
            project,
            name,
            due,
            description,
        } => {
            let milestone = store
                .create_milestone(
                    project,
                    MilestoneDraft {
                        milestone_name: name,
                        description,
                        due_date: due,
                    },
                )
                .await
                .map_err(api)?;
            print_json(&milestone)?;
        }
        MilestoneCommands::Update {
            project,
            milestone,
            name,
            due,
            status,
            progress,
        } => {
            let patch = MilestonePatch {
                milestone_name: name,
                description: None,
                due_date: due,
                status,
                progress,
            };
            let milestone = store
                .update_milestone(project, milestone, patch)
                .await
                .map_err(api)?;
            print_json(&milestone)?;
        }
        MilestoneCommands::Remove { project, milestone } => {
            store
                .delete_milestone(project, milestone)
                .await
                .map_err(api)?;
            println!("Removed milestone {}", milestone);
        }
    }
    Ok(())
}

async fn folders(store: &Store, cmd: FolderCommands) -> Result<()> {
    match cmd {
        FolderCommands::List { project } => {
            store.fetch_root_folders(project).await.map_err(api)?;
            print_json(&store.folders().await.slice.items)?;
        }
        FolderCommands::Subfolders { project, parent } => {
            let children = store.fetch_subfolders(project, parent).await.map_err(api)?;
            print_json(&children)?;
        }
        FolderCommands::Create {
            project,
            name,
            parent,
            description,
        } => {
            let folder = store
                .create_folder(FolderDraft {
                    name,
                    repository_id: project,
                    parent_folder_id: parent,
                    is_milestone: false,
                    description,
                    due_date: None,
                })
                .await
                .map_err(api)?;
            print_json(&folder)?;
        }
        FolderCommands::Delete { id } => {
            store.delete_folder(id).await.map_err(api)?;
            println!("Deleted folder {}", id);
        }
    }
    Ok(())
}

async fn files(store: &Store, cmd: FileCommands) -> Result<()> {
    match cmd {
        FileCommands::List {
            folder,
            milestone,
            project,
            limit,
        } => {
            let scope = match (folder, milestone, project) {
                (Some(folder), _, _) => FileScope::Folder(folder),
                (_, Some(milestone), _) => FileScope::Milestone(milestone),
                (_, _, Some(project)) => FileScope::Project(project),
                _ => FileScope::CurrentUser,
            };
            store.fetch_files(scope, limit).await.map_err(api)?;
            print_json(&store.files().await.slice.items)?;
        }
        FileCommands::Upload {
            path,
            folder,
            description,
        } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let upload = upload_from(&path, bytes, folder, description)?;
            let file = store.upload_file(upload).await.map_err(api)?;
            print_json(&file)?;
        }
        FileCommands::Download { id, out } => {
            let download = store.download_file(id).await.map_err(api)?;
            let target = out.unwrap_or_else(|| {
                PathBuf::from(
                    bare_file_name(&download.file_name)
                        .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string()),
                )
            });
            tokio::fs::write(&target, &download.bytes)
                .await
                .with_context(|| format!("Failed to write {}", target.display()))?;
            println!("Saved {} ({} bytes)", target.display(), download.bytes.len());
        }
        FileCommands::Delete { id } => {
            store.delete_file(id).await.map_err(api)?;
            println!("Deleted file {}", id);
        }
        FileCommands::History { id } => {
            let versions = store.fetch_file_history(id).await.map_err(api)?;
            print_json(&versions)?;
        }
    }
    Ok(())
}

async fn comments(store: &Store, cmd: CommentCommands) -> Result<()> {
    match cmd {
        CommentCommands::List { file, role } => {
            let fetched = match role {
                Some(role) => store.fetch_comments_by_role(file, role).await,
                None => store.fetch_comments(file).await,
            };
            fetched.map_err(api)?;
            let state = store.comments().await;
            match role {
                Some(role) => print_json(&state.by_role(role))?,
                None => print_json(&state)?,
            }
        }
        CommentCommands::Add {
            file,
            content,
            rating,
        } => {
            let comment = store
                .create_comment(CommentDraft {
                    content,
                    file_id: file,
                    rating,
                })
                .await
                .map_err(api)?;
            print_json(&comment)?;
        }
        CommentCommands::Delete { id } => {
            store.delete_comment(id).await.map_err(api)?;
            println!("Deleted comment {}", id);
        }
    }
    Ok(())
}

async fn notifications(store: &Store, cmd: NotificationCommands) -> Result<()> {
    match cmd {
        NotificationCommands::List => {
            store.fetch_notifications().await.map_err(api)?;
        }
        NotificationCommands::Read { id } => {
            store.fetch_notifications().await.map_err(api)?;
            store.mark_notification_read(id).await.map_err(api)?;
        }
        NotificationCommands::ReadAll => {
            store.fetch_notifications().await.map_err(api)?;
            store.mark_all_notifications_read().await.map_err(api)?;
        }
        NotificationCommands::Clear => {
            store.clear_all_notifications().await.map_err(api)?;
        }
        NotificationCommands::Count => {
            let unread = store.fetch_unread_count().await.map_err(api)?;
            println!("{} unread", unread);
            return Ok(());
        }
    }
    print_json(&store.notifications().await)
}

/// Describe a local file as an upload, guessing its MIME type from the name.
fn upload_from(
    path: &Path,
    bytes: Vec<u8>,
    folder: FolderId,
    description: Option<String>,
) -> Result<FileUpload> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("Upload path has no file name")?;
    Ok(FileUpload {
        content_type: mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .to_string(),
        file_name,
        bytes,
        description,
        folder_id: folder,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Turn a service failure into a report that includes field messages.
fn api(err: ApiError) -> anyhow::Error {
    let mut report = err.to_string();
    for (field, message) in &err.field_errors {
        report.push_str(&format!("\n  {}: {}", field, message));
    }
    if err.kind.is_retryable() {
        report.push_str("\n  (try again later)");
    }
    anyhow::anyhow!(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type(name: &str) -> String {
        upload_from(Path::new(name), Vec::new(), FolderId(1), None)
            .unwrap()
            .content_type
    }

    #[test]
    fn test_upload_content_type_follows_extension() {
        assert_eq!(content_type("reports/final.pdf"), "application/pdf");
        assert_eq!(content_type("data.csv"), "text/csv");
        assert_eq!(
            content_type("sheet.xlsx"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(content_type("demo.mp4"), "video/mp4");
        assert_eq!(content_type("blob.unknownext"), "application/octet-stream");
    }

    #[test]
    fn test_upload_keeps_only_the_file_name() {
        let upload = upload_from(
            Path::new("/home/student/thesis/chapter1.docx"),
            vec![1, 2, 3],
            FolderId(4),
            Some("First chapter".to_string()),
        )
        .unwrap();
        assert_eq!(upload.file_name, "chapter1.docx");
        assert_eq!(upload.folder_id, FolderId(4));
        assert_eq!(upload.size(), 3);
        assert!(upload_from(Path::new("/"), Vec::new(), FolderId(4), None).is_err());
    }
}
