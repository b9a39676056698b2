//! Notifications slice with its unread counter.

use crate::slice::{Reducer, Slice, Ticket};
use gradtrack_core::{ApiError, Notification, NotificationId};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize)]
pub struct NotificationsState {
    #[serde(flatten)]
    pub slice: Slice<Notification>,
    /// Always `unread_count(&slice.items)`
    pub unread_count: usize,
}

#[derive(Debug, Clone)]
pub enum NotificationsAction {
    Pending,
    Failed(ApiError),
    Fetched { ticket: Ticket, notifications: Vec<Notification> },
    FetchFailed { ticket: Ticket, error: ApiError },
    MarkedRead(NotificationId),
    AllMarkedRead,
    Deleted(NotificationId),
    AllCleared,
    /// Pushed by the server outside any request
    Received(Notification),
    /// The server's unread count was read; nothing is merged
    CountChecked,
    ErrorCleared,
}

/// Number of unread notifications.
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.read).count()
}

impl NotificationsState {
    pub fn begin_fetch(&mut self) -> Ticket {
        self.slice.begin_fetch()
    }

    pub fn unread(&self) -> impl Iterator<Item = &Notification> {
        self.slice.items.iter().filter(|n| !n.read)
    }
}

impl Reducer for NotificationsState {
    type Action = NotificationsAction;
    const NAME: &'static str = "notifications";

    fn reduce(&mut self, action: NotificationsAction) {
        match action {
            NotificationsAction::Pending => self.slice.begin(),
            NotificationsAction::Failed(err) => self.slice.fail(err),
            NotificationsAction::Fetched { ticket, notifications } => {
                if !self.slice.settle_fetch(ticket, notifications) {
                    debug!("Discarding superseded notifications");
                }
            }
            NotificationsAction::FetchFailed { ticket, error } => {
                self.slice.fail_fetch(ticket, error);
            }
            NotificationsAction::MarkedRead(id) => {
                self.slice.settle();
                if let Some(idx) = self.slice.position(id) {
                    self.slice.items[idx].read = true;
                }
                if let Some(selected) = self.slice.selected.as_mut().filter(|n| n.id == id) {
                    selected.read = true;
                }
            }
            NotificationsAction::AllMarkedRead => {
                self.slice.settle();
                for n in self.slice.items.iter_mut().chain(self.slice.selected.iter_mut()) {
                    n.read = true;
                }
            }
            NotificationsAction::Deleted(id) => {
                self.slice.remove(id);
            }
            NotificationsAction::CountChecked => self.slice.settle(),
            NotificationsAction::AllCleared => {
                self.slice.settle();
                self.slice.items.clear();
                self.slice.selected = None;
            }
            // a push for a notification already held replaces it
            NotificationsAction::Received(notification) => {
                match self.slice.position(notification.id) {
                    Some(idx) => self.slice.items[idx] = notification,
                    None => self.slice.items.push(notification),
                }
            }
            NotificationsAction::ErrorCleared => self.slice.clear_error(),
        }
        self.unread_count = unread_count(&self.slice.items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: u64, read: bool) -> Notification {
        let mut n = Notification::new(NotificationId(id), "New comment", "");
        n.read = read;
        n
    }

    fn loaded() -> NotificationsState {
        let mut state = NotificationsState::default();
        let ticket = state.begin_fetch();
        state.reduce(NotificationsAction::Fetched {
            ticket,
            notifications: vec![note(1, false), note(2, true), note(3, false)],
        });
        state
    }

    #[test]
    fn test_counter_follows_every_mutation() {
        let mut state = loaded();
        assert_eq!(state.unread_count, 2);

        state.reduce(NotificationsAction::MarkedRead(NotificationId(1)));
        assert_eq!(state.unread_count, 1);

        // marking twice does not double count
        state.reduce(NotificationsAction::MarkedRead(NotificationId(1)));
        assert_eq!(state.unread_count, 1);

        state.reduce(NotificationsAction::Received(note(4, false)));
        assert_eq!(state.unread_count, 2);
        assert_eq!(state.slice.items.last().map(|n| n.id), Some(NotificationId(4)));

        state.reduce(NotificationsAction::Deleted(NotificationId(2)));
        assert_eq!(state.unread_count, 2);

        state.reduce(NotificationsAction::AllMarkedRead);
        assert_eq!(state.unread_count, 0);
        assert_eq!(state.slice.items.len(), 3);

        state.reduce(NotificationsAction::AllCleared);
        assert!(state.slice.items.is_empty());
    }

    #[test]
    fn test_repeated_push_replaces() {
        let mut state = loaded();
        state.reduce(NotificationsAction::Received(note(3, true)));
        assert_eq!(state.slice.items.len(), 3);
        assert_eq!(state.unread_count, 1);
        assert_eq!(state.unread().count(), 1);
    }
}
