//! The state machine every slice shares.
//!
//! A slice holds an ordered collection, the selected entity and the request
//! lifecycle (`is_loading`, `last_error`). Requests begin with [`Slice::begin`],
//! settle with one of the merge rules or with [`Slice::fail`]. A failure never
//! touches `items` or `selected`.

use gradtrack_core::{ApiError, Entity};
use serde::Serialize;
use std::collections::BTreeMap;

/// Ticket of a wholesale fetch; only the latest ticket for a key may settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

/// Latest-request-wins guard for wholesale fetches, keyed by fetch scope.
#[derive(Debug, Clone)]
pub struct FetchFence<K: Ord = ()> {
    issued: u64,
    latest: BTreeMap<K, u64>,
}

impl<K: Ord> Default for FetchFence<K> {
    fn default() -> Self {
        Self {
            issued: 0,
            latest: BTreeMap::new(),
        }
    }
}

impl<K: Ord> FetchFence<K> {
    /// Issue a ticket for `key`, superseding earlier tickets for that key.
    pub fn issue(&mut self, key: K) -> Ticket {
        self.issued += 1;
        self.latest.insert(key, self.issued);
        Ticket(self.issued)
    }

    /// Whether `ticket` is the latest issued for `key`.
    pub fn is_latest(&self, key: &K, ticket: Ticket) -> bool {
        self.latest.get(key) == Some(&ticket.0)
    }
}

/// Reduction target of a slice.
pub trait Reducer: Send {
    /// Outcome the slice reduces
    type Action: Send;

    /// Name used in logs.
    const NAME: &'static str;

    /// Apply one action atomically.
    fn reduce(&mut self, action: Self::Action);
}

/// Collection state of one entity family.
#[derive(Debug, Clone, Serialize)]
pub struct Slice<T: Entity> {
    /// Ordered collection, ids unique
    pub items: Vec<T>,
    /// Entity shown by detail views
    pub selected: Option<T>,
    /// A request of this family is in flight
    pub is_loading: bool,
    /// Failure of the last settled request
    pub last_error: Option<ApiError>,
    #[serde(skip)]
    fence: FetchFence,
}

impl<T: Entity> Default for Slice<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            is_loading: false,
            last_error: None,
            fence: FetchFence::default(),
        }
    }
}

impl<T: Entity> Slice<T> {
    /// Request started.
    pub fn begin(&mut self) {
        self.is_loading = true;
        self.last_error = None;
    }

    /// Wholesale fetch started. The returned ticket settles it.
    pub fn begin_fetch(&mut self) -> Ticket {
        self.begin();
        self.fence.issue(())
    }

    /// Whether `ticket` is the latest wholesale fetch.
    pub fn accepts(&self, ticket: Ticket) -> bool {
        self.fence.is_latest(&(), ticket)
    }

    /// Request settled, whatever the outcome.
    pub fn settle(&mut self) {
        self.is_loading = false;
    }

    /// Request failed. The collection is left as it was.
    pub fn fail(&mut self, err: ApiError) {
        self.is_loading = false;
        self.last_error = Some(err);
    }

    /// Replace the collection wholesale, keeping payload order.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.settle();
        self.items = items;
    }

    /// Settle a wholesale fetch. Returns false if a newer fetch superseded it.
    pub fn settle_fetch(&mut self, ticket: Ticket, items: Vec<T>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.replace_all(items);
        true
    }

    /// Fail a wholesale fetch. Returns false if a newer fetch superseded it.
    pub fn fail_fetch(&mut self, ticket: Ticket, err: ApiError) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.fail(err);
        true
    }

    /// Detail fetch: select without touching the list.
    pub fn select(&mut self, item: T) {
        self.settle();
        self.selected = Some(item);
    }

    /// Create: append at the end and select.
    pub fn append(&mut self, item: T) {
        self.settle();
        self.items.push(item.clone());
        self.selected = Some(item);
    }

    /// Update: replace in place, and `selected` when it is the same entity.
    /// Returns whether the list held it.
    pub fn replace(&mut self, item: T) -> bool {
        self.settle();
        if self.selected.as_ref().is_some_and(|s| s.id() == item.id()) {
            self.selected = Some(item.clone());
        }
        match self.position(item.id()) {
            Some(idx) => {
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    /// Delete: drop from the list and clear `selected` when it matches.
    /// Deleting an absent id changes nothing.
    pub fn remove(&mut self, id: T::Id) -> Option<T> {
        self.settle();
        if self.selected.as_ref().is_some_and(|s| s.id() == id) {
            self.selected = None;
        }
        self.position(id).map(|idx| self.items.remove(idx))
    }

    /// Look an entity up by id.
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Position of an entity in the list.
    pub fn position(&self, id: T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn clear_selected(&mut self) {
        self.selected = None;
    }

    /// Drop everything but the fence, so in-flight fetches stay ordered.
    pub fn clear(&mut self) {
        self.items.clear();
        self.selected = None;
        self.last_error = None;
    }
}
