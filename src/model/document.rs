//! Uploaded study document and its processing status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Opaque document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Analysis lifecycle of a document. Clients poll this until it is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// An uploaded study document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub owner: UserId,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    /// Failure message when `status` is `Failed`.
    pub error: Option<String>,
}

impl Document {
    pub fn new(id: DocumentId, title: impl Into<String>, owner: UserId) -> Self {
        Self {
            id,
            title: title.into(),
            owner,
            status: DocumentStatus::Pending,
            created_at: Utc::now(),
            error: None,
        }
    }
}
