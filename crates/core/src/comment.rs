//! Comment model - review feedback attached to a file.

use serde::{Deserialize, Serialize};
use crate::id::{CommentId, FileId};
use crate::user::Role;

/// A comment on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Unique identifier
    pub id: CommentId,

    /// Comment text
    pub content: String,

    /// File being commented on
    pub file_id: FileId,

    /// Role of the author
    pub user_role: Role,

    /// Grade 1..=5, supervisors only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Lowest accepted rating.
pub const MIN_RATING: u8 = 1;
/// Highest accepted rating.
pub const MAX_RATING: u8 = 5;

/// Fields for creating a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    /// Comment text
    pub content: String,
    /// File the comment is about
    pub file_id: FileId,
    /// Rating from 1 to 5, supervisors only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Field-wise update of a comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPatch {
    /// New text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New rating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
}

/// Whether a rating is inside the accepted scale.
pub fn rating_in_range(rating: u8) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&rating)
}
