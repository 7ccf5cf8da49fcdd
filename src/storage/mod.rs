//! # Storage Backend Trait
//!
//! The contract between studygraph and the record store that holds
//! documents, extracted concepts and understanding levels.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory for testing/embedding |

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::model::*;
use crate::Result;

pub use memory::MemoryBackend;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Configuration for connecting to a storage backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-memory (no persistence)
    #[default]
    Memory,
}

// ============================================================================
// Backend capabilities
// ============================================================================

/// What a backend can do.
///
/// All fields default to false / empty. Backends override via `capabilities()`.
#[derive(Debug, Clone, Default)]
pub struct BackendCapabilities {
    pub persistent: bool,
    pub supports_batch_writes: bool,
    pub max_batch_size: Option<usize>,
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The record-store contract.
///
/// Concepts are written once, in bulk, right after analysis and are only
/// read or deleted with their document afterwards. There is deliberately no
/// per-concept update.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    // ========================================================================
    // Documents
    // ========================================================================

    /// Register a new document in `Pending` state.
    async fn create_document(&self, title: &str, owner: &UserId) -> Result<DocumentId>;

    /// Get a document by ID. Returns None if not found.
    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>>;

    /// Update the processing status. `error` is stored as given, so passing
    /// `None` clears a previous failure message.
    async fn set_document_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        error: Option<String>,
    ) -> Result<()>;

    /// Delete a document together with its concepts and any understanding
    /// records for them. Returns true if it existed.
    async fn delete_document(&self, id: DocumentId) -> Result<bool>;

    /// All documents of one owner, oldest first.
    async fn documents_by_owner(&self, owner: &UserId) -> Result<Vec<Document>>;

    // ========================================================================
    // Concepts
    // ========================================================================

    /// Bulk insert analysed concepts. Draft `parent` indices are resolved to
    /// the newly assigned ids. Returns ids in draft order.
    async fn insert_concepts(
        &self,
        document: DocumentId,
        drafts: Vec<ConceptDraft>,
    ) -> Result<Vec<ConceptId>>;

    /// All concepts of a document, in insertion order.
    async fn concepts_by_document(&self, document: DocumentId) -> Result<Vec<ConceptNode>>;

    /// Get a concept by ID. Returns None if not found.
    async fn get_concept(&self, id: ConceptId) -> Result<Option<ConceptNode>>;

    /// Total number of concepts across all documents.
    async fn concept_count(&self) -> Result<u64>;

    // ========================================================================
    // Understanding
    // ========================================================================

    /// Upsert a user's understanding of one concept.
    async fn set_understanding(
        &self,
        user: &UserId,
        concept: ConceptId,
        level: UnderstandingLevel,
    ) -> Result<()>;

    /// A user's understanding records for the concepts of one document,
    /// ordered by concept id.
    async fn understanding_for(
        &self,
        user: &UserId,
        document: DocumentId,
    ) -> Result<Vec<UnderstandingRecord>>;

    /// Batch upsert. Default falls back to sequential `set_understanding`.
    async fn set_understanding_batch(&self, records: &[UnderstandingRecord]) -> Result<()> {
        for record in records {
            self.set_understanding(&record.user, record.concept, record.level).await?;
        }
        Ok(())
    }

    // ========================================================================
    // Capability negotiation
    // ========================================================================

    /// Report what this backend can do.
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities::default()
    }
}
