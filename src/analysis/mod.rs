//! # Document Analysis
//!
//! Turns an uploaded PDF into a knowledge tree by way of an LLM.
//!
//! The model is an external collaborator behind [`ContentGenerator`]: it
//! takes an instruction plus the document bytes and answers with free-form
//! text that is expected to contain a JSON knowledge tree. Calls go through
//! [`retry`] because both the transport and the model's output format are
//! unreliable.

pub mod retry;
pub mod tree;

use async_trait::async_trait;

use crate::Result;

pub use retry::{retry, RetryPolicy};
pub use tree::{extract_json, parse_knowledge_tree, KnowledgeTree, TreeConcept};

/// Instruction sent alongside the document.
pub const KNOWLEDGE_TREE_INSTRUCTION: &str = "Extract the knowledge tree of this document as JSON: \
{\"concepts\": [{\"name\", \"description\", \"prerequisites\": [names], \"children\": [...]}]}";

/// The LLM provider.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Send `prompt` (and optionally a document) and return the raw reply.
    async fn generate(&self, prompt: &str, file: Option<&[u8]>) -> Result<String>;
}

/// Ask the generator for a knowledge tree of `pdf` and parse the reply.
///
/// Unparseable replies count as retryable failures.
pub async fn analyze_document<G>(
    generator: &G,
    policy: &RetryPolicy,
    pdf: &[u8],
) -> Result<KnowledgeTree>
where
    G: ContentGenerator + ?Sized,
{
    retry(policy, move |attempt| async move {
        tracing::debug!(attempt, bytes = pdf.len(), "requesting knowledge tree");
        let reply = generator.generate(KNOWLEDGE_TREE_INSTRUCTION, Some(pdf)).await?;
        parse_knowledge_tree(&reply)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use crate::Error;

    /// Replies with garbage until `good_after` calls have been made.
    struct Flaky {
        calls: AtomicU32,
        good_after: u32,
    }

    #[async_trait]
    impl ContentGenerator for Flaky {
        async fn generate(&self, _prompt: &str, file: Option<&[u8]>) -> Result<String> {
            assert!(file.is_some());
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < self.good_after {
                Ok("죄송합니다, 다시 시도해 주세요.".into())
            } else {
                Ok(r#"```json
{"concepts": [{"name": "극한"}]}
```"#.into())
            }
        }
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn unparseable_reply_is_retried() {
        let generator = Flaky { calls: AtomicU32::new(0), good_after: 3 };
        let tree = analyze_document(&generator, &fast(3), b"%PDF-1.7").await.unwrap();
        assert_eq!(tree.concepts[0].name, "극한");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let generator = Flaky { calls: AtomicU32::new(0), good_after: 10 };
        let err = analyze_document(&generator, &fast(2), b"%PDF-1.7").await.unwrap_err();
        assert!(matches!(err, Error::InvalidAnalysis(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }
}
