//! Concept node in a document's knowledge graph.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::DocumentId;

/// Prerequisite names. Most concepts list only a handful.
pub type Prerequisites = SmallVec<[String; 4]>;

/// Opaque concept identifier, unique per store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConceptId(pub u64);

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted learning concept extracted from a document.
///
/// Prerequisites are stored by *name*, not by id: the analysis step only
/// knows names, and nothing guarantees names are unique or that every name
/// resolves. The sequencer copes with both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: ConceptId,
    pub document_id: DocumentId,
    /// Tree-shape hint from the analysis. Not used for ordering.
    pub parent_id: Option<ConceptId>,
    pub name: String,
    pub description: Option<String>,
    /// Coarse depth/difficulty hint.
    pub level: u32,
    /// Insertion-order hint among siblings.
    pub position: u32,
    #[serde(default)]
    pub prerequisites: Prerequisites,
}

impl ConceptNode {
    pub fn new(id: ConceptId, document_id: DocumentId, name: impl Into<String>) -> Self {
        Self {
            id,
            document_id,
            parent_id: None,
            name: name.into(),
            description: None,
            level: 0,
            position: 0,
            prerequisites: Prerequisites::new(),
        }
    }

    pub fn with_prerequisites(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.prerequisites = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent: ConceptId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    /// A root lists no prerequisites at all.
    pub fn is_root(&self) -> bool {
        self.prerequisites.is_empty()
    }
}

/// A concept produced by analysis that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptDraft {
    pub name: String,
    pub description: Option<String>,
    pub level: u32,
    pub position: u32,
    /// Index of the parent draft in the same batch.
    pub parent: Option<usize>,
    #[serde(default)]
    pub prerequisites: Prerequisites,
}

/// Read access to the fields the sequencer orders by.
///
/// Implemented for stored nodes and for drafts so an analysis result can be
/// previewed in assessment order before it is persisted.
pub trait ConceptRef {
    fn name(&self) -> &str;
    fn level(&self) -> u32;
    fn position(&self) -> u32;
    fn prerequisites(&self) -> &[String];
}

impl ConceptRef for ConceptNode {
    fn name(&self) -> &str { &self.name }
    fn level(&self) -> u32 { self.level }
    fn position(&self) -> u32 { self.position }
    fn prerequisites(&self) -> &[String] { &self.prerequisites }
}

impl ConceptRef for ConceptDraft {
    fn name(&self) -> &str { &self.name }
    fn level(&self) -> u32 { self.level }
    fn position(&self) -> u32 { self.position }
    fn prerequisites(&self) -> &[String] { &self.prerequisites }
}

impl<T: ConceptRef + ?Sized> ConceptRef for &T {
    fn name(&self) -> &str { (**self).name() }
    fn level(&self) -> u32 { (**self).level() }
    fn position(&self) -> u32 { (**self).position() }
    fn prerequisites(&self) -> &[String] { (**self).prerequisites() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let node = ConceptNode::new(ConceptId(7), DocumentId(1), "적분")
            .with_level(1)
            .with_position(2)
            .with_prerequisites(["미분", "극한"])
            .with_parent(ConceptId(3));

        assert_eq!(node.name, "적분");
        assert_eq!(node.level, 1);
        assert_eq!(node.position, 2);
        assert_eq!(node.prerequisites.as_slice(), ["미분", "극한"]);
        assert_eq!(node.parent_id, Some(ConceptId(3)));
        assert!(!node.is_root());
    }

    #[test]
    fn missing_prerequisites_deserialize_as_root() {
        let json = r#"{"id":1,"document_id":1,"parent_id":null,"name":"극한",
                       "description":null,"level":0,"position":0}"#;
        let node: ConceptNode = serde_json::from_str(json).unwrap();
        assert!(node.is_root());
    }
}
