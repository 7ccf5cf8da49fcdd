//! Per-user understanding of individual concepts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConceptId;

/// Opaque user identifier issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Understanding score in `0..=100`. Construction clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8")]
pub struct UnderstandingLevel(u8);

impl UnderstandingLevel {
    pub const MAX: Self = Self(100);
    pub const MIN: Self = Self(0);

    pub fn new(level: u8) -> Self {
        Self(level.min(100))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for UnderstandingLevel {
    fn from(level: u8) -> Self {
        Self::new(level)
    }
}

/// A user's current understanding of one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnderstandingRecord {
    pub user: UserId,
    pub concept: ConceptId,
    pub level: UnderstandingLevel,
    pub updated_at: DateTime<Utc>,
}

impl UnderstandingRecord {
    pub fn new(user: UserId, concept: ConceptId, level: UnderstandingLevel) -> Self {
        Self { user, concept, level, updated_at: Utc::now() }
    }
}
