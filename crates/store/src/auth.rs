//! Auth slice: the live session as the views see it.

use crate::slice::Reducer;
use gradtrack_core::{ApiError, Role, Session, User};
use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuthState {
    pub session: Option<Session>,
    pub is_loading: bool,
    pub last_error: Option<ApiError>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn role(&self) -> Option<Role> {
        self.user().map(|u| u.role)
    }
}

#[derive(Debug, Clone)]
pub enum AuthAction {
    Pending,
    Failed(ApiError),
    /// Login or registration succeeded
    SignedIn(Session),
    /// Session loaded from persisted storage on start-up
    Restored(Option<Session>),
    /// Fresh identity for the current credential
    UserRefreshed(User),
    SignedOut,
    /// Some request was rejected as unauthorized
    SessionExpired,
    ErrorCleared,
}

impl Reducer for AuthState {
    type Action = AuthAction;
    const NAME: &'static str = "auth";

    fn reduce(&mut self, action: AuthAction) {
        match action {
            AuthAction::Pending => {
                self.is_loading = true;
                self.last_error = None;
            }
            AuthAction::Failed(err) => {
                self.is_loading = false;
                self.last_error = Some(err);
            }
            AuthAction::SignedIn(session) => {
                self.is_loading = false;
                self.session = Some(session);
            }
            AuthAction::Restored(session) => {
                self.is_loading = false;
                self.session = session;
            }
            AuthAction::UserRefreshed(user) => {
                self.is_loading = false;
                if let Some(session) = self.session.as_mut() {
                    session.user = user;
                }
            }
            AuthAction::SignedOut => {
                self.is_loading = false;
                self.session = None;
                self.last_error = None;
            }
            // keeps last_error: an auth request may be the one that was rejected
            AuthAction::SessionExpired => {
                self.is_loading = false;
                self.session = None;
            }
            AuthAction::ErrorCleared => self.last_error = None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradtrack_core::UserId;

    fn session() -> Session {
        Session {
            token: "t".to_string(),
            user: User {
                id: UserId(1),
                name: "Test Student".to_string(),
                email: "student@test.com".to_string(),
                role: Role::Student,
                student_id: None,
            },
        }
    }

    #[test]
    fn test_sign_in_and_out() {
        let mut state = AuthState::default();
        state.reduce(AuthAction::Pending);
        assert!(state.is_loading);
        state.reduce(AuthAction::SignedIn(session()));
        assert!(state.is_authenticated());
        assert_eq!(state.role(), Some(Role::Student));

        state.reduce(AuthAction::SignedOut);
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_expiry_keeps_the_failure() {
        let mut state = AuthState::default();
        state.reduce(AuthAction::SignedIn(session()));
        state.reduce(AuthAction::Pending);
        state.reduce(AuthAction::Failed(ApiError::unauthorized("Token expired")));
        state.reduce(AuthAction::SessionExpired);

        assert!(state.session.is_none());
        assert!(state.last_error.as_ref().is_some_and(|e| e.is_unauthorized()));
    }

    #[test]
    fn test_refresh_replaces_user_only() {
        let mut state = AuthState::default();
        state.reduce(AuthAction::SignedIn(session()));
        let mut user = session().user;
        user.name = "Renamed".to_string();
        state.reduce(AuthAction::UserRefreshed(user));
        assert_eq!(state.user().map(|u| u.name.as_str()), Some("Renamed"));
        assert_eq!(state.session.as_ref().map(|s| s.token.as_str()), Some("t"));
    }
}
