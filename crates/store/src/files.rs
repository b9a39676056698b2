//! Files slice, with upload progress and version history.

use crate::slice::{FetchFence, Reducer, Slice, Ticket};
use gradtrack_core::{ApiError, FileId, FileRecord, UploadId};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize)]
pub struct FilesState {
    #[serde(flatten)]
    pub slice: Slice<FileRecord>,
    /// Versions of the file whose history was fetched last
    pub history: Vec<FileRecord>,
    /// Progress of the most recently reported upload; 100 after a success,
    /// 0 after a failure
    pub upload_progress: u8,
    /// Progress of every upload still in flight
    pub uploads: BTreeMap<UploadId, u8>,
    pub download_in_progress: bool,
    #[serde(skip)]
    history_fence: FetchFence,
}

#[derive(Debug, Clone)]
pub enum FilesAction {
    Pending,
    Failed(ApiError),
    Fetched { ticket: Ticket, files: Vec<FileRecord> },
    FetchFailed { ticket: Ticket, error: ApiError },
    Loaded(FileRecord),
    UploadStarted(UploadId),
    UploadProgress { upload: UploadId, percent: u8 },
    Uploaded { upload: UploadId, file: FileRecord },
    UploadFailed { upload: UploadId, error: ApiError },
    Deleted(FileId),
    DownloadStarted,
    Downloaded,
    DownloadFailed(ApiError),
    HistoryFetched { ticket: Ticket, versions: Vec<FileRecord> },
    HistoryFetchFailed { ticket: Ticket, error: ApiError },
    ProgressReset,
    ErrorCleared,
}

impl FilesState {
    pub fn begin_fetch(&mut self) -> Ticket {
        self.slice.begin_fetch()
    }

    pub fn begin_history_fetch(&mut self) -> Ticket {
        self.slice.begin();
        self.history_fence.issue(())
    }

    /// Whether any upload is still in flight.
    pub fn is_uploading(&self) -> bool {
        !self.uploads.is_empty()
    }
}

impl Reducer for FilesState {
    type Action = FilesAction;
    const NAME: &'static str = "files";

    fn reduce(&mut self, action: FilesAction) {
        match action {
            FilesAction::Pending => self.slice.begin(),
            FilesAction::Failed(err) => self.slice.fail(err),
            FilesAction::Fetched { ticket, files } => {
                if !self.slice.settle_fetch(ticket, files) {
                    debug!("Discarding superseded file list");
                }
            }
            FilesAction::FetchFailed { ticket, error } => {
                self.slice.fail_fetch(ticket, error);
            }
            FilesAction::Loaded(file) => self.slice.select(file),
            FilesAction::UploadStarted(upload) => {
                self.slice.begin();
                self.uploads.insert(upload, 0);
                self.upload_progress = 0;
            }
            // reports for settled or unknown uploads are ignored; progress
            // never goes backwards
            FilesAction::UploadProgress { upload, percent } => {
                if let Some(current) = self.uploads.get_mut(&upload) {
                    *current = (*current).max(percent.min(100));
                    self.upload_progress = *current;
                }
            }
            FilesAction::Uploaded { upload, file } => {
                self.uploads.remove(&upload);
                self.upload_progress = 100;
                self.slice.append(file);
            }
            FilesAction::UploadFailed { upload, error } => {
                self.uploads.remove(&upload);
                self.upload_progress = 0;
                self.slice.fail(error);
            }
            FilesAction::Deleted(id) => {
                self.history.retain(|f| f.id != id);
                self.slice.remove(id);
            }
            FilesAction::DownloadStarted => {
                self.slice.begin();
                self.download_in_progress = true;
            }
            FilesAction::Downloaded => {
                self.slice.settle();
                self.download_in_progress = false;
            }
            FilesAction::DownloadFailed(err) => {
                self.download_in_progress = false;
                self.slice.fail(err);
            }
            FilesAction::HistoryFetched { ticket, versions } => {
                if self.history_fence.is_latest(&(), ticket) {
                    self.slice.settle();
                    self.history = versions;
                }
            }
            FilesAction::HistoryFetchFailed { ticket, error } => {
                if self.history_fence.is_latest(&(), ticket) {
                    self.slice.fail(error);
                }
            }
            FilesAction::ProgressReset => self.upload_progress = 0,
            FilesAction::ErrorCleared => self.slice.clear_error(),
        }
    }
}
