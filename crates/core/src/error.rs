//! Failure taxonomy shared by every service and slice.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Payload shape or business rule rejected by the server (400/422).
    ValidationRejected,
    /// Credential missing, expired or rejected (401). Tears down the session.
    Unauthorized,
    /// Authenticated but not allowed (403).
    Forbidden,
    /// The referenced entity does not exist (404), usually a stale local reference.
    NotFound,
    /// Duplicate entry or concurrent modification (409).
    Conflict,
    /// The server answered with a 5xx.
    ServerUnavailable,
    /// No response was received at all.
    NetworkUnreachable,
    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Classify an HTTP status code. Success codes map to `Unknown` since they
    /// should never reach the classifier.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::ValidationRejected,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            409 => Self::Conflict,
            500..=599 => Self::ServerUnavailable,
            _ => Self::Unknown,
        }
    }

    /// Whether the user may sensibly re-issue the request unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::ServerUnavailable | Self::NetworkUnreachable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationRejected => write!(f, "VALIDATION_REJECTED"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::ServerUnavailable => write!(f, "SERVER_UNAVAILABLE"),
            Self::NetworkUnreachable => write!(f, "NETWORK_UNREACHABLE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// A settled failure as surfaced in a slice's `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Classified kind
    pub kind: ErrorKind,

    /// Human readable message (server provided or a per-operation fallback)
    pub message: String,

    /// HTTP status, when a response was received
    pub status: Option<u16>,

    /// Field-level messages for `ValidationRejected`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl ApiError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            field_errors: BTreeMap::new(),
        }
    }

    /// Build from an HTTP status and an optional server message.
    pub fn from_status(status: u16, message: Option<String>, fallback: &str) -> Self {
        Self {
            kind: ErrorKind::from_status(status),
            message: message.unwrap_or_else(|| fallback.to_string()),
            status: Some(status),
            field_errors: BTreeMap::new(),
        }
    }

    /// Validation failure with a single field message.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut err = Self::new(ErrorKind::ValidationRejected, message.clone());
        err.field_errors.insert(field.into(), message);
        err
    }

    /// Credential rejected.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Missing entity.
    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(ErrorKind::NotFound, format!("{} not found", what))
    }

    /// No response received.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NetworkUnreachable, message)
    }

    /// Attach field-level messages.
    pub fn with_field_errors(mut self, fields: BTreeMap<String, String>) -> Self {
        self.field_errors = fields;
        self
    }

    /// Shorthand for `self.kind == ErrorKind::Unauthorized`.
    pub fn is_unauthorized(&self) -> bool {
        self.kind == ErrorKind::Unauthorized
    }
}

/// Result alias for service calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(ErrorKind::from_status(400), ErrorKind::ValidationRejected);
        assert_eq!(ErrorKind::from_status(422), ErrorKind::ValidationRejected);
        assert_eq!(ErrorKind::from_status(401), ErrorKind::Unauthorized);
        assert_eq!(ErrorKind::from_status(403), ErrorKind::Forbidden);
        assert_eq!(ErrorKind::from_status(404), ErrorKind::NotFound);
        assert_eq!(ErrorKind::from_status(409), ErrorKind::Conflict);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::ServerUnavailable);
        assert_eq!(ErrorKind::from_status(418), ErrorKind::Unknown);
    }

    #[test]
    fn test_fallback_message_used_without_server_message() {
        let err = ApiError::from_status(500, None, "Failed to fetch projects");
        assert_eq!(err.message, "Failed to fetch projects");
        assert_eq!(err.status, Some(500));
        assert!(err.kind.is_retryable());

        let err = ApiError::from_status(404, Some("Project not found".into()), "Failed to fetch project");
        assert_eq!(err.message, "Project not found");
        assert!(!err.kind.is_retryable());
    }

    #[test]
    fn test_display_includes_kind() {
        let err = ApiError::network("connection refused");
        assert_eq!(err.to_string(), "NETWORK_UNREACHABLE: connection refused");
    }

    #[test]
    fn test_validation_carries_field() {
        let err = ApiError::validation("dueDate", "Due date is required");
        assert_eq!(err.kind, ErrorKind::ValidationRejected);
        assert_eq!(err.field_errors.get("dueDate").map(String::as_str), Some("Due date is required"));
    }
}
