//! Users, roles and the authenticated session.

use serde::{Deserialize, Serialize};
use crate::id::UserId;

/// Role of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// A student
    Student,
    /// A supervisor
    Supervisor,
}

impl Role {
    /// Lowercase path segment used by role-scoped endpoints.
    pub fn as_path(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Supervisor => "supervisor",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "supervisor" => Ok(Role::Supervisor),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// Display name
    pub name: String,

    /// Login email
    pub email: String,

    /// Account role
    pub role: Role,

    /// Student registration number, students only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

/// Compact reference to a user embedded in other entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// User id
    pub id: UserId,
    /// Display name
    pub name: String,
}

impl From<&User> for UserRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// The live authenticated session: identity plus bearer credential.
///
/// The two halves are always persisted and cleared together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token
    pub token: String,

    /// Who the token belongs to
    pub user: User,
}

impl Session {
    /// Whether the session belongs to a given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.user.role == role
    }
}

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Plain password, sent once
    pub password: String,
}

/// Registration request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    /// Display name
    pub name: String,
    /// Account email
    pub email: String,
    /// Chosen password
    pub password: String,
    /// Account role
    pub role: Role,
    /// University student number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}
