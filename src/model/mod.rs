//! # Study Graph Model
//!
//! Plain DTOs that define documents, extracted concepts and per-user
//! understanding. These types cross every boundary:
//! analysis ↔ storage ↔ sequencer ↔ assessment.
//!
//! Design rule: this module is pure data — no I/O, no state, no async.

pub mod concept;
pub mod document;
pub mod understanding;

pub use concept::{ConceptNode, ConceptId, ConceptDraft, ConceptRef, Prerequisites};
pub use document::{Document, DocumentId, DocumentStatus};
pub use understanding::{UnderstandingLevel, UnderstandingRecord, UserId};
