//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//! It uses simple hash maps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No persistence**: everything is gone when the backend is dropped.
//! - **Per-collection locks**: a multi-collection write (e.g. cascading
//!   delete) is not atomic with respect to concurrent readers.
//!
//! Use this backend for:
//! - Testing the sequencer, analysis and assessment flows
//! - Embedding studygraph in applications that don't need persistence

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::model::*;
use crate::{Error, Result};
use super::{BackendCapabilities, StorageBackend};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory record store.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    documents: RwLock<HashMap<DocumentId, Document>>,
    concepts: RwLock<HashMap<ConceptId, ConceptNode>>,
    /// document_id → concept IDs in insertion order
    document_concepts: RwLock<HashMap<DocumentId, Vec<ConceptId>>>,
    /// (user, concept) → record
    understanding: RwLock<HashMap<(UserId, ConceptId), UnderstandingRecord>>,
    next_document_id: AtomicU64,
    next_concept_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                documents: RwLock::new(HashMap::new()),
                concepts: RwLock::new(HashMap::new()),
                document_concepts: RwLock::new(HashMap::new()),
                understanding: RwLock::new(HashMap::new()),
                next_document_id: AtomicU64::new(1),
                next_concept_id: AtomicU64::new(1),
            }),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    // ========================================================================
    // Documents
    // ========================================================================

    async fn create_document(&self, title: &str, owner: &UserId) -> Result<DocumentId> {
        let id = DocumentId(self.inner.next_document_id.fetch_add(1, Ordering::Relaxed));
        let doc = Document::new(id, title, owner.clone());
        self.inner.documents.write().insert(id, doc);
        self.inner.document_concepts.write().insert(id, Vec::new());
        Ok(id)
    }

    async fn get_document(&self, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.inner.documents.read().get(&id).cloned())
    }

    async fn set_document_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        error: Option<String>,
    ) -> Result<()> {
        let mut docs = self.inner.documents.write();
        let doc = docs.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Document {id}")))?;
        doc.status = status;
        doc.error = error;
        Ok(())
    }

    async fn delete_document(&self, id: DocumentId) -> Result<bool> {
        let removed = self.inner.documents.write().remove(&id);
        let concept_ids = self.inner.document_concepts.write().remove(&id).unwrap_or_default();

        if !concept_ids.is_empty() {
            {
                let mut concepts = self.inner.concepts.write();
                for cid in &concept_ids {
                    concepts.remove(cid);
                }
            }
            self.inner
                .understanding
                .write()
                .retain(|(_, cid), _| !concept_ids.contains(cid));
        }

        Ok(removed.is_some())
    }

    async fn documents_by_owner(&self, owner: &UserId) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> = self
            .inner
            .documents
            .read()
            .values()
            .filter(|d| &d.owner == owner)
            .cloned()
            .collect();
        docs.sort_by_key(|d| (d.created_at, d.id));
        Ok(docs)
    }

    // ========================================================================
    // Concepts
    // ========================================================================

    async fn insert_concepts(
        &self,
        document: DocumentId,
        drafts: Vec<ConceptDraft>,
    ) -> Result<Vec<ConceptId>> {
        // Held until the index is updated so a concurrent delete cannot
        // slip in between the check and the insert.
        let documents = self.inner.documents.read();
        if !documents.contains_key(&document) {
            return Err(Error::NotFound(format!("Document {document}")));
        }
        if let Some((i, parent)) = drafts
            .iter()
            .enumerate()
            .find_map(|(i, d)| d.parent.filter(|&p| p >= drafts.len()).map(|p| (i, p)))
        {
            return Err(Error::InvalidAnalysis(format!(
                "concept #{i} names parent #{parent}, but only {} concepts were extracted",
                drafts.len()
            )));
        }

        let first = self
            .inner
            .next_concept_id
            .fetch_add(drafts.len() as u64, Ordering::Relaxed);
        let ids: Vec<ConceptId> = (0..drafts.len() as u64).map(|k| ConceptId(first + k)).collect();

        {
            let mut concepts = self.inner.concepts.write();
            for (draft, &id) in drafts.into_iter().zip(&ids) {
                concepts.insert(id, ConceptNode {
                    id,
                    document_id: document,
                    parent_id: draft.parent.map(|p| ids[p]),
                    name: draft.name,
                    description: draft.description,
                    level: draft.level,
                    position: draft.position,
                    prerequisites: draft.prerequisites,
                });
            }
        }
        self.inner
            .document_concepts
            .write()
            .entry(document)
            .or_default()
            .extend_from_slice(&ids);
        drop(documents);

        tracing::debug!(%document, count = ids.len(), "inserted concepts");
        Ok(ids)
    }

    async fn concepts_by_document(&self, document: DocumentId) -> Result<Vec<ConceptNode>> {
        let index = self.inner.document_concepts.read();
        let Some(ids) = index.get(&document) else {
            return Ok(Vec::new());
        };
        let concepts = self.inner.concepts.read();
        Ok(ids.iter().filter_map(|id| concepts.get(id).cloned()).collect())
    }

    async fn get_concept(&self, id: ConceptId) -> Result<Option<ConceptNode>> {
        Ok(self.inner.concepts.read().get(&id).cloned())
    }

    async fn concept_count(&self) -> Result<u64> {
        Ok(self.inner.concepts.read().len() as u64)
    }

    // ========================================================================
    // Understanding
    // ========================================================================

    async fn set_understanding(
        &self,
        user: &UserId,
        concept: ConceptId,
        level: UnderstandingLevel,
    ) -> Result<()> {
        let concepts = self.inner.concepts.read();
        if !concepts.contains_key(&concept) {
            return Err(Error::NotFound(format!("Concept {concept}")));
        }
        let record = UnderstandingRecord::new(user.clone(), concept, level);
        self.inner.understanding.write().insert((user.clone(), concept), record);
        Ok(())
    }

    /// All-or-nothing: every concept is checked before anything is written.
    async fn set_understanding_batch(&self, records: &[UnderstandingRecord]) -> Result<()> {
        let concepts = self.inner.concepts.read();
        if let Some(missing) = records.iter().find(|r| !concepts.contains_key(&r.concept)) {
            return Err(Error::NotFound(format!("Concept {}", missing.concept)));
        }
        let mut understanding = self.inner.understanding.write();
        for record in records {
            understanding.insert((record.user.clone(), record.concept), record.clone());
        }
        Ok(())
    }

    async fn understanding_for(
        &self,
        user: &UserId,
        document: DocumentId,
    ) -> Result<Vec<UnderstandingRecord>> {
        let ids = self
            .inner
            .document_concepts
            .read()
            .get(&document)
            .cloned()
            .unwrap_or_default();
        let understanding = self.inner.understanding.read();
        let mut records: Vec<UnderstandingRecord> = ids
            .into_iter()
            .filter_map(|cid| understanding.get(&(user.clone(), cid)).cloned())
            .collect();
        records.sort_by_key(|r| r.concept);
        Ok(records)
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            persistent: false,
            supports_batch_writes: true,
            max_batch_size: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, parent: Option<usize>) -> ConceptDraft {
        ConceptDraft {
            name: name.into(),
            description: None,
            level: parent.map_or(0, |_| 1),
            position: 0,
            parent,
            prerequisites: Prerequisites::new(),
        }
    }

    #[tokio::test]
    async fn parent_indices_resolve_to_ids() {
        let store = MemoryBackend::new();
        let doc = store.create_document("미적분", &UserId::new("u1")).await.unwrap();
        let ids = store
            .insert_concepts(doc, vec![draft("미분", None), draft("도함수", Some(0))])
            .await
            .unwrap();

        let child = store.get_concept(ids[1]).await.unwrap().unwrap();
        assert_eq!(child.parent_id, Some(ids[0]));
        assert_eq!(child.document_id, doc);
    }

    #[tokio::test]
    async fn out_of_range_parent_is_rejected() {
        let store = MemoryBackend::new();
        let doc = store.create_document("doc", &UserId::new("u1")).await.unwrap();
        let err = store.insert_concepts(doc, vec![draft("a", Some(3))]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidAnalysis(_)));
        assert_eq!(store.concept_count().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn insert_racing_delete_leaves_no_orphans() {
        let store = MemoryBackend::new();
        for _ in 0..200 {
            let doc = store.create_document("race", &UserId::new("u1")).await.unwrap();
            let writer = store.clone();
            let deleter = store.clone();
            let insert = tokio::spawn(async move {
                writer.insert_concepts(doc, vec![draft("a", None), draft("b", Some(0))]).await
            });
            let delete = tokio::spawn(async move { deleter.delete_document(doc).await });

            let _ = insert.await.unwrap();
            assert!(delete.await.unwrap().unwrap());
            assert!(store.concepts_by_document(doc).await.unwrap().is_empty());
            assert!(!store.inner.document_concepts.read().contains_key(&doc));
        }
        assert_eq!(store.concept_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn batch_understanding_is_all_or_nothing() {
        let store = MemoryBackend::new();
        let user = UserId::new("u1");
        let doc = store.create_document("doc", &user).await.unwrap();
        let ids = store.insert_concepts(doc, vec![draft("a", None), draft("b", None)]).await.unwrap();

        let level = UnderstandingLevel::new(60);
        let bad = vec![
            UnderstandingRecord::new(user.clone(), ids[0], level),
            UnderstandingRecord::new(user.clone(), ConceptId(9_999), level),
        ];
        let err = store.set_understanding_batch(&bad).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(store.understanding_for(&user, doc).await.unwrap().is_empty());

        let good: Vec<_> = ids.iter().map(|&id| UnderstandingRecord::new(user.clone(), id, level)).collect();
        store.set_understanding_batch(&good).await.unwrap();
        let stored = store.understanding_for(&user, doc).await.unwrap();
        assert_eq!(stored.iter().map(|r| r.concept).collect::<Vec<_>>(), ids);
    }

    #[tokio::test]
    async fn insert_into_unknown_document_fails() {
        let store = MemoryBackend::new();
        let err = store.insert_concepts(DocumentId(99), vec![draft("a", None)]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
