//! # studygraph — Concept Graphs for Study Material
//!
//! Extracts a knowledge tree from an uploaded document, stores its concepts,
//! and serves them to learners in prerequisite order for an O/X assessment.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` and `ContentGenerator` are the only
//!    contracts with the outside world
//! 2. **Clean DTOs**: `ConceptNode`, `Document`, `UnderstandingRecord` cross
//!    all boundaries
//! 3. **Sequencer owns nothing**: concepts → order is a pure function that
//!    never fails
//! 4. **LLM output is untrusted**: dangling, duplicate and cyclic
//!    prerequisites degrade the order, never the request
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use studygraph::{StudyGraph, StudyConfig, UserId, OxAnswer};
//! # use studygraph::analysis::ContentGenerator;
//!
//! # async fn example(gemini: &dyn ContentGenerator, pdf: &[u8]) -> studygraph::Result<()> {
//! let graph = StudyGraph::open_memory(StudyConfig::default());
//! let learner = UserId::new("learner-1");
//!
//! let doc = graph.ingest("미적분 1단원", &learner, gemini, pdf).await?;
//!
//! let mut session = graph.begin_assessment(&learner, doc).await?;
//! while let Some(concept) = session.current() {
//!     println!("{}을(를) 알고 있나요?", concept.name);
//!     session.answer(OxAnswer::Know)?;
//! }
//! graph.submit_assessment(session.finish()).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod sequencer;
pub mod analysis;
pub mod assessment;
pub mod storage;
pub mod config;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    ConceptNode, ConceptId, ConceptDraft, ConceptRef,
    Document, DocumentId, DocumentStatus,
    UnderstandingLevel, UnderstandingRecord, UserId,
};

// ============================================================================
// Re-exports: Sequencing, analysis, assessment
// ============================================================================

pub use sequencer::{sequence, sequence_with_report, Sequenced, SequenceReport};
pub use analysis::{ContentGenerator, KnowledgeTree, RetryPolicy};
pub use assessment::{AssessmentConfig, AssessmentOutcome, AssessmentSession, OxAnswer};
pub use config::StudyConfig;

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{StorageBackend, BackendConfig, BackendCapabilities, MemoryBackend};

// ============================================================================
// Top-level StudyGraph handle
// ============================================================================

/// The primary entry point. A `StudyGraph` wraps a storage backend and
/// runs the ingest → sequence → assess flows against it.
pub struct StudyGraph<B: StorageBackend> {
    backend: B,
    config: StudyConfig,
}

impl<B: StorageBackend> StudyGraph<B> {
    /// Create a StudyGraph with the given backend.
    pub fn with_backend(backend: B, config: StudyConfig) -> Self {
        Self { backend, config }
    }

    /// Analyse `pdf` and store its concepts under a new document.
    ///
    /// The document is visible as `Processing` while the model runs, and
    /// ends `Completed` or `Failed` (with the error message) either way.
    pub async fn ingest<G>(
        &self,
        title: &str,
        owner: &UserId,
        generator: &G,
        pdf: &[u8],
    ) -> Result<DocumentId>
    where
        G: ContentGenerator + ?Sized,
    {
        let doc = self.backend.create_document(title, owner).await?;
        self.backend.set_document_status(doc, DocumentStatus::Processing, None).await?;
        tracing::info!(document = %doc, %owner, bytes = pdf.len(), "analysing document");

        match self.analyze_and_store(doc, generator, pdf).await {
            Ok(count) => {
                self.backend.set_document_status(doc, DocumentStatus::Completed, None).await?;
                tracing::info!(document = %doc, concepts = count, "document analysed");
                Ok(doc)
            }
            Err(e) => {
                tracing::warn!(document = %doc, error = %e, "document analysis failed");
                self.backend
                    .set_document_status(doc, DocumentStatus::Failed, Some(e.to_string()))
                    .await?;
                Err(e)
            }
        }
    }

    async fn analyze_and_store<G>(&self, doc: DocumentId, generator: &G, pdf: &[u8]) -> Result<usize>
    where
        G: ContentGenerator + ?Sized,
    {
        let tree = analysis::analyze_document(generator, &self.config.retry, pdf).await?;
        let drafts = tree.flatten();
        let report = sequencer::sequence_with_report(&drafts).report;
        if !report.is_clean() {
            tracing::info!(
                document = %doc,
                dangling = report.dangling.len(),
                cyclic = ?report.cyclic_concepts(),
                duplicates = ?report.duplicate_names,
                "extracted prerequisites are inconsistent"
            );
        }
        let ids = self.backend.insert_concepts(doc, drafts).await?;
        Ok(ids.len())
    }

    /// The document's concepts in assessment order.
    pub async fn assessment_order(&self, document: DocumentId) -> Result<Sequenced<ConceptNode>> {
        let nodes = self.ready_concepts(document).await?;
        Ok(sequencer::sequence_with_report(&nodes))
    }

    /// Start an O/X assessment over a completed document.
    pub async fn begin_assessment(
        &self,
        user: &UserId,
        document: DocumentId,
    ) -> Result<AssessmentSession> {
        let nodes = self.ready_concepts(document).await?;
        Ok(AssessmentSession::new(user.clone(), &nodes, self.config.assessment))
    }

    /// Persist the understanding levels a finished session produced.
    pub async fn submit_assessment(&self, outcome: AssessmentOutcome) -> Result<()> {
        self.backend.set_understanding_batch(&outcome.records).await
    }

    /// Access the active configuration.
    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn ready_concepts(&self, document: DocumentId) -> Result<Vec<ConceptNode>> {
        let doc = self
            .backend
            .get_document(document)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Document {document}")))?;
        if doc.status != DocumentStatus::Completed {
            return Err(Error::NotReady { document, status: doc.status });
        }
        self.backend.concepts_by_document(document).await
    }
}

/// In-memory study graph for testing and embedding.
impl StudyGraph<MemoryBackend> {
    pub fn open_memory(config: StudyConfig) -> Self {
        Self::with_backend(MemoryBackend::new(), config)
    }

    /// Open the backend the config names.
    pub fn open(config: StudyConfig) -> Result<Self> {
        config.validate()?;
        match config.backend {
            BackendConfig::Memory => Ok(Self::open_memory(config)),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Document {document} is not ready: {status:?}")]
    NotReady { document: DocumentId, status: DocumentStatus },

    #[error("Invalid analysis: {0}")]
    InvalidAnalysis(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Assessment session already finished")]
    SessionFinished,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether calling the content generator again could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::InvalidAnalysis(_) | Self::Json(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
