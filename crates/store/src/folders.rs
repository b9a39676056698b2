//! Folders slice: root folders of the open project, loaded subfolder buckets
//! and the milestone folders.
//!
//! A folder lives in at most one location: the root list when it has no
//! parent, otherwise the bucket of its current parent. Every create and update
//! goes through [`FoldersState::place`], which is the only code that moves a
//! folder between locations.

use crate::slice::{FetchFence, Reducer, Slice, Ticket};
use gradtrack_core::{ApiError, Folder, FolderId, ProjectId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Root,
    Bucket(FolderId),
}

impl Location {
    fn of(folder: &Folder) -> Self {
        match folder.parent_folder_id {
            None => Location::Root,
            Some(parent) => Location::Bucket(parent),
        }
    }
}

/// How [`FoldersState::place`] treats a folder it does not hold yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// A new folder: always added, creating its parent bucket if needed.
    Created,
    /// A changed folder: added only where its location is already loaded.
    Updated,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FoldersState {
    /// Root folders of `repository`
    #[serde(flatten)]
    pub slice: Slice<Folder>,
    /// Project whose root folders are loaded
    pub repository: Option<ProjectId>,
    pub milestone_folders: Vec<Folder>,
    pub subfolders_by_parent: BTreeMap<FolderId, Vec<Folder>>,
    #[serde(skip)]
    milestone_fence: FetchFence,
    #[serde(skip)]
    subfolder_fence: FetchFence<FolderId>,
}

#[derive(Debug, Clone)]
pub enum FoldersAction {
    Pending,
    Failed(ApiError),
    Loaded(Folder),
    RootFetched { ticket: Ticket, repository: ProjectId, folders: Vec<Folder> },
    RootFetchFailed { ticket: Ticket, error: ApiError },
    SubfoldersFetched { ticket: Ticket, parent: FolderId, folders: Vec<Folder> },
    SubfoldersFetchFailed { ticket: Ticket, parent: FolderId, error: ApiError },
    MilestonesFetched { ticket: Ticket, folders: Vec<Folder> },
    MilestonesFetchFailed { ticket: Ticket, error: ApiError },
    Created(Folder),
    Updated(Folder),
    Deleted(FolderId),
    Selected(Option<Folder>),
    Cleared,
    ErrorCleared,
}

impl FoldersState {
    pub fn begin_root_fetch(&mut self) -> Ticket {
        self.slice.begin_fetch()
    }

    pub fn begin_subfolder_fetch(&mut self, parent: FolderId) -> Ticket {
        self.slice.begin();
        self.subfolder_fence.issue(parent)
    }

    pub fn begin_milestone_fetch(&mut self) -> Ticket {
        self.slice.begin();
        self.milestone_fence.issue(())
    }

    /// Loaded children of `parent`, if that bucket was fetched.
    pub fn subfolders(&self, parent: FolderId) -> Option<&[Folder]> {
        self.subfolders_by_parent.get(&parent).map(Vec::as_slice)
    }

    /// Every folder held in the tree index, in root-then-bucket order.
    pub fn all_placed(&self) -> impl Iterator<Item = &Folder> {
        self.slice
            .items
            .iter()
            .chain(self.subfolders_by_parent.values().flatten())
    }

    fn locate(&self, id: FolderId) -> Option<(Location, usize)> {
        if let Some(idx) = self.slice.position(id) {
            return Some((Location::Root, idx));
        }
        self.subfolders_by_parent.iter().find_map(|(parent, bucket)| {
            bucket
                .iter()
                .position(|f| f.id == id)
                .map(|idx| (Location::Bucket(*parent), idx))
        })
    }

    fn holds(&self, location: Location, folder: &Folder) -> bool {
        match location {
            Location::Root => self
                .repository
                .map_or(true, |loaded| loaded == folder.repository_id),
            Location::Bucket(parent) => self.subfolders_by_parent.contains_key(&parent),
        }
    }

    fn insert_at(&mut self, location: Location, folder: Folder) {
        match location {
            Location::Root => self.slice.items.push(folder),
            Location::Bucket(parent) => self
                .subfolders_by_parent
                .entry(parent)
                .or_default()
                .push(folder),
        }
    }

    fn take_at(&mut self, location: Location, idx: usize) {
        match location {
            Location::Root => {
                self.slice.items.remove(idx);
            }
            Location::Bucket(parent) => {
                if let Some(bucket) = self.subfolders_by_parent.get_mut(&parent) {
                    bucket.remove(idx);
                }
            }
        }
    }

    /// Put `folder` where its parent says it belongs.
    ///
    /// A folder that stays put is replaced in place; a folder whose parent
    /// changed leaves its old location and is appended to the new one. The
    /// milestone view follows the folder's marker.
    pub fn place(&mut self, folder: Folder, placement: Placement) {
        let target = Location::of(&folder);
        match self.locate(folder.id) {
            Some((current, idx)) if current == target => match target {
                Location::Root => self.slice.items[idx] = folder.clone(),
                Location::Bucket(parent) => {
                    if let Some(bucket) = self.subfolders_by_parent.get_mut(&parent) {
                        bucket[idx] = folder.clone();
                    }
                }
            },
            found => {
                if let Some((current, idx)) = found {
                    self.take_at(current, idx);
                }
                if placement == Placement::Created || self.holds(target, &folder) {
                    self.insert_at(target, folder.clone());
                }
            }
        }

        let pos = self.milestone_folders.iter().position(|f| f.id == folder.id);
        match (pos, folder.is_milestone) {
            (Some(idx), true) => self.milestone_folders[idx] = folder,
            (Some(idx), false) => {
                self.milestone_folders.remove(idx);
            }
            (None, true) => self.milestone_folders.push(folder),
            (None, false) => {}
        }
    }

    /// Remove a folder everywhere, along with the buckets of it and its
    /// loaded descendants.
    fn forget(&mut self, id: FolderId) {
        let mut doomed = BTreeSet::from([id]);
        let mut frontier = vec![id];
        while let Some(parent) = frontier.pop() {
            if let Some(children) = self.subfolders_by_parent.get(&parent) {
                for child in children {
                    if doomed.insert(child.id) {
                        frontier.push(child.id);
                    }
                }
            }
        }

        self.slice.remove(id);
        for bucket in self.subfolders_by_parent.values_mut() {
            bucket.retain(|f| f.id != id);
        }
        self.subfolders_by_parent.retain(|parent, _| !doomed.contains(parent));
        self.milestone_folders.retain(|f| !doomed.contains(&f.id));
        if self.slice.selected.as_ref().is_some_and(|f| doomed.contains(&f.id)) {
            self.slice.selected = None;
        }
    }
}

impl Reducer for FoldersState {
    type Action = FoldersAction;
    const NAME: &'static str = "folders";

    fn reduce(&mut self, action: FoldersAction) {
        match action {
            FoldersAction::Pending => self.slice.begin(),
            FoldersAction::Failed(err) => self.slice.fail(err),
            FoldersAction::Loaded(folder) => self.slice.select(folder),
            FoldersAction::RootFetched { ticket, repository, folders } => {
                if self.slice.settle_fetch(ticket, folders) {
                    self.repository = Some(repository);
                } else {
                    debug!("Discarding superseded root folders");
                }
            }
            FoldersAction::RootFetchFailed { ticket, error } => {
                self.slice.fail_fetch(ticket, error);
            }
            FoldersAction::SubfoldersFetched { ticket, parent, folders } => {
                if self.subfolder_fence.is_latest(&parent, ticket) {
                    self.slice.settle();
                    self.subfolders_by_parent.insert(parent, folders);
                } else {
                    debug!("Discarding superseded subfolders of {}", parent);
                }
            }
            FoldersAction::SubfoldersFetchFailed { ticket, parent, error } => {
                if self.subfolder_fence.is_latest(&parent, ticket) {
                    self.slice.fail(error);
                }
            }
            FoldersAction::MilestonesFetched { ticket, folders } => {
                if self.milestone_fence.is_latest(&(), ticket) {
                    self.slice.settle();
                    self.milestone_folders = folders;
                } else {
                    debug!("Discarding superseded milestone folders");
                }
            }
            FoldersAction::MilestonesFetchFailed { ticket, error } => {
                if self.milestone_fence.is_latest(&(), ticket) {
                    self.slice.fail(error);
                }
            }
            FoldersAction::Created(folder) => {
                self.slice.settle();
                self.slice.selected = Some(folder.clone());
                self.place(folder, Placement::Created);
            }
            FoldersAction::Updated(folder) => {
                self.slice.settle();
                if self.slice.selected.as_ref().is_some_and(|f| f.id == folder.id) {
                    self.slice.selected = Some(folder.clone());
                }
                self.place(folder, Placement::Updated);
            }
            FoldersAction::Deleted(id) => {
                self.slice.settle();
                self.forget(id);
            }
            FoldersAction::Selected(folder) => self.slice.selected = folder,
            FoldersAction::Cleared => {
                self.slice.clear();
                self.repository = None;
                self.subfolders_by_parent.clear();
            }
            FoldersAction::ErrorCleared => self.slice.clear_error(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gradtrack_core::FolderPatch;

    fn folder(id: u64, parent: Option<u64>) -> Folder {
        Folder {
            id: FolderId(id),
            name: format!("folder {}", id),
            description: None,
            parent_folder_id: parent.map(FolderId),
            repository_id: ProjectId(1),
            is_milestone: false,
            due_date: None,
            status: None,
            progress: None,
        }
    }

    fn loaded() -> FoldersState {
        let mut state = FoldersState::default();
        let ticket = state.begin_root_fetch();
        state.reduce(FoldersAction::RootFetched {
            ticket,
            repository: ProjectId(1),
            folders: vec![folder(1, None), folder(2, None)],
        });
        let ticket = state.begin_subfolder_fetch(FolderId(1));
        state.reduce(FoldersAction::SubfoldersFetched {
            ticket,
            parent: FolderId(1),
            folders: vec![folder(3, Some(1)), folder(4, Some(1))],
        });
        state
    }

    fn locations(state: &FoldersState, id: u64) -> usize {
        state.all_placed().filter(|f| f.id == FolderId(id)).count()
    }

    #[test]
    fn test_subfolder_fetch_replaces_only_its_bucket() {
        let mut state = loaded();
        let ticket = state.begin_subfolder_fetch(FolderId(2));
        state.reduce(FoldersAction::SubfoldersFetched {
            ticket,
            parent: FolderId(2),
            folders: vec![folder(5, Some(2))],
        });
        assert_eq!(state.subfolders(FolderId(1)).map(<[Folder]>::len), Some(2));
        assert_eq!(state.subfolders(FolderId(2)).map(<[Folder]>::len), Some(1));
    }

    #[test]
    fn test_moving_a_folder_keeps_one_location() {
        let mut state = loaded();
        let mut moved = folder(3, Some(1));
        moved.apply(FolderPatch {
            parent_folder_id: Some(Some(FolderId(2))),
            ..Default::default()
        });
        state.reduce(FoldersAction::Updated(moved.clone()));

        // bucket 2 was never loaded, so the folder just leaves bucket 1
        assert_eq!(locations(&state, 3), 0);
        assert_eq!(state.subfolders(FolderId(1)).unwrap(), &[folder(4, Some(1))]);

        let mut to_root = moved;
        to_root.parent_folder_id = None;
        state.reduce(FoldersAction::Updated(to_root));
        assert_eq!(locations(&state, 3), 1);
        assert_eq!(state.slice.items.last().map(|f| f.id), Some(FolderId(3)));
    }

    #[test]
    fn test_update_in_place_keeps_position() {
        let mut state = loaded();
        let mut renamed = folder(3, Some(1));
        renamed.name = "Renamed".to_string();
        state.reduce(FoldersAction::Updated(renamed));
        let bucket = state.subfolders(FolderId(1)).unwrap();
        assert_eq!(bucket[0].name, "Renamed");
        assert_eq!(bucket[1].id, FolderId(4));
    }

    #[test]
    fn test_create_into_unloaded_bucket_creates_it() {
        let mut state = loaded();
        state.reduce(FoldersAction::Created(folder(9, Some(2))));
        assert_eq!(state.subfolders(FolderId(2)).map(<[Folder]>::len), Some(1));
        assert_eq!(state.slice.selected.as_ref().map(|f| f.id), Some(FolderId(9)));
    }

    #[test]
    fn test_delete_drops_descendant_buckets() {
        let mut state = loaded();
        state.reduce(FoldersAction::Created(folder(7, Some(3))));
        state.reduce(FoldersAction::Deleted(FolderId(1)));

        assert!(state.subfolders(FolderId(1)).is_none());
        assert!(state.subfolders(FolderId(3)).is_none());
        assert_eq!(state.slice.items, vec![folder(2, None)]);
        assert!(state.slice.selected.is_none());
    }

    #[test]
    fn test_milestone_view_follows_marker() {
        let mut state = loaded();
        let mut milestone = folder(8, None);
        milestone.is_milestone = true;
        milestone.due_date = NaiveDate::from_ymd_opt(2024, 6, 1);
        state.reduce(FoldersAction::Created(milestone.clone()));
        assert_eq!(state.milestone_folders, vec![milestone.clone()]);

        milestone.is_milestone = false;
        state.reduce(FoldersAction::Updated(milestone));
        assert!(state.milestone_folders.is_empty());
        assert_eq!(locations(&state, 8), 1);
    }
}
