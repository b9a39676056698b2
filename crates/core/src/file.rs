//! File model - uploaded deliverables attached to folders and milestones.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use std::sync::OnceLock;
use crate::id::{FileId, FolderId, MilestoneId, ProjectId};
use crate::user::UserRef;

/// Metadata of an uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier
    pub id: FileId,

    /// Original file name
    pub file_name: String,

    /// Size in bytes
    pub file_size: u64,

    /// MIME type
    pub file_type: String,

    /// Uploader supplied description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// When it was uploaded
    pub upload_date: DateTime<Utc>,

    /// Who uploaded it
    pub uploaded_by: UserRef,

    /// Containing folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,

    /// Containing milestone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<MilestoneId>,

    /// Owning project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
}

impl FileRecord {
    /// Folder the file lives in, treating a milestone as its folder.
    pub fn container(&self) -> Option<FolderId> {
        self.folder_id.or_else(|| self.milestone_id.map(FolderId::from))
    }
}

/// An upload request: the binary payload plus metadata.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// File name sent with the multipart part
    pub file_name: String,

    /// MIME type of the payload
    pub content_type: String,

    /// Raw bytes
    pub bytes: Vec<u8>,

    /// Optional description
    pub description: Option<String>,

    /// Target folder or milestone
    pub folder_id: FolderId,
}

impl FileUpload {
    /// Size of the payload in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Which files a fetch should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileScope {
    /// Files inside a folder
    Folder(FolderId),
    /// Files inside a milestone (a milestone is a folder on the server)
    Milestone(MilestoneId),
    /// Files at a project root. The server has no such listing; resolves empty.
    Project(ProjectId),
    /// Everything the current user uploaded
    CurrentUser,
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct Download {
    /// File name recovered from the response headers
    pub file_name: String,

    /// MIME type, if the server sent one
    pub content_type: Option<String>,

    /// Raw bytes
    pub bytes: Vec<u8>,
}

/// Name used when the response carries no usable content-disposition.
pub const DEFAULT_DOWNLOAD_NAME: &str = "download";

/// Extract the file name from a `content-disposition` header value.
///
/// Only the last path component is kept, so the result is always a bare
/// name that can be joined onto a local directory.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    static FILENAME: OnceLock<Option<Regex>> = OnceLock::new();
    let re = FILENAME
        .get_or_init(|| Regex::new(r#"(?i)filename\*?=(?:UTF-8'')?"?([^";]+)"?"#).ok())
        .as_ref()?;
    re.captures(header)
        .and_then(|caps| caps.get(1))
        .and_then(|m| bare_file_name(m.as_str().trim()))
}

/// Reduce a server-supplied name to a single normal path component.
pub fn bare_file_name(name: &str) -> Option<String> {
    // servers on windows send backslash separators
    let name = name.rsplit(['/', '\\']).next()?.trim();
    match Path::new(name).components().next() {
        Some(Component::Normal(part)) if part == name => Some(name.to_string()),
        _ => None,
    }
}
