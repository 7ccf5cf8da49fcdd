//! Knowledge-tree payload returned by the model, and its flattening into
//! storable concept drafts.

use serde::{Deserialize, Serialize};

use crate::model::{ConceptDraft, Prerequisites};
use crate::{Error, Result};

/// Top-level knowledge tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeTree {
    pub concepts: Vec<TreeConcept>,
}

/// One concept and its sub-concepts as the model nests them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConcept {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Names of concepts this one builds on. Models sometimes send `null`.
    #[serde(default)]
    pub prerequisites: Option<Vec<String>>,
    #[serde(default)]
    pub children: Option<Vec<TreeConcept>>,
}

impl TreeConcept {
    fn children(&self) -> &[TreeConcept] {
        self.children.as_deref().unwrap_or_default()
    }
}

impl KnowledgeTree {
    /// Number of concepts at every depth.
    pub fn len(&self) -> usize {
        fn count(c: &TreeConcept) -> usize {
            1 + c.children().iter().map(count).sum::<usize>()
        }
        self.concepts.iter().map(count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Pre-order flattening: `level` is the depth, `position` the index
    /// among siblings, `parent` the index of the parent draft.
    ///
    /// Names and prerequisite entries are trimmed; blank prerequisite
    /// entries are dropped.
    pub fn flatten(&self) -> Vec<ConceptDraft> {
        let mut out = Vec::with_capacity(self.len());
        for (position, concept) in self.concepts.iter().enumerate() {
            flatten_into(concept, 0, position as u32, None, &mut out);
        }
        out
    }

    fn validate(&self) -> Result<()> {
        fn check(c: &TreeConcept, path: &str) -> Result<()> {
            if c.name.trim().is_empty() {
                return Err(Error::InvalidAnalysis(format!("concept at {path} has no name")));
            }
            for (i, child) in c.children().iter().enumerate() {
                check(child, &format!("{path}.children[{i}]"))?;
            }
            Ok(())
        }

        if self.concepts.is_empty() {
            return Err(Error::InvalidAnalysis("knowledge tree has no concepts".into()));
        }
        for (i, c) in self.concepts.iter().enumerate() {
            check(c, &format!("concepts[{i}]"))?;
        }
        Ok(())
    }
}

fn flatten_into(
    concept: &TreeConcept,
    level: u32,
    position: u32,
    parent: Option<usize>,
    out: &mut Vec<ConceptDraft>,
) {
    let prerequisites: Prerequisites = concept
        .prerequisites
        .iter()
        .flatten()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();

    let index = out.len();
    out.push(ConceptDraft {
        name: concept.name.trim().to_string(),
        description: concept.description.clone(),
        level,
        position,
        parent,
        prerequisites,
    });

    for (i, child) in concept.children().iter().enumerate() {
        flatten_into(child, level + 1, i as u32, Some(index), out);
    }
}

/// Locate the JSON object inside a model reply.
///
/// Prefers a fenced code block; otherwise takes everything from the first
/// `{` to the last `}`.
pub fn extract_json(text: &str) -> Result<&str> {
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        // Skip the info string (`json`, `JSON`, ...) up to the newline.
        let body_start = after.find('\n').map_or(0, |n| n + 1);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            let inner = body[..end].trim();
            if inner.starts_with('{') {
                return Ok(inner);
            }
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(open), Some(close)) if open < close => Ok(&text[open..=close]),
        _ => Err(Error::InvalidAnalysis("no JSON object in model output".into())),
    }
}

/// Parse and validate a knowledge tree out of a raw model reply.
pub fn parse_knowledge_tree(text: &str) -> Result<KnowledgeTree> {
    let json = extract_json(text)?;
    let tree: KnowledgeTree = serde_json::from_str(json)?;
    tree.validate()?;
    Ok(tree)
}
