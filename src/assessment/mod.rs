//! # O/X Knowledge Assessment
//!
//! A session walks a learner through a document's concepts one at a time,
//! in sequencer order, and records whether they already know each one.
//! The order is fixed when the session starts and never re-queried.

use serde::{Deserialize, Serialize};

use crate::model::{ConceptId, ConceptNode, UnderstandingLevel, UnderstandingRecord, UserId};
use crate::sequencer::{self, SequenceReport};
use crate::{Error, Result};

/// Scoring knobs for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Level recorded for an `O` answer.
    pub know_level: u8,
    /// Level recorded for an `X` answer.
    pub dont_know_level: u8,
    /// Concepts strictly below this level count as weak.
    pub weak_threshold: u8,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self { know_level: 100, dont_know_level: 0, weak_threshold: 50 }
    }
}

/// The learner's answer to "do you know this concept?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OxAnswer {
    /// O
    Know,
    /// X
    DontKnow,
}

/// What a finished session produced.
#[derive(Debug, Clone)]
pub struct AssessmentOutcome {
    pub records: Vec<UnderstandingRecord>,
    /// Weak concepts in presentation order. Study-guide input.
    pub weak: Vec<ConceptNode>,
}

/// One learner's pass over one document.
#[derive(Debug)]
pub struct AssessmentSession {
    user: UserId,
    config: AssessmentConfig,
    order: Vec<ConceptNode>,
    report: SequenceReport,
    answers: Vec<Option<OxAnswer>>,
    cursor: usize,
}

impl AssessmentSession {
    /// Sequence `nodes` and start at the first concept.
    pub fn new(user: UserId, nodes: &[ConceptNode], config: AssessmentConfig) -> Self {
        let sequenced = sequencer::sequence_with_report(nodes);
        if !sequenced.report.is_clean() {
            tracing::debug!(
                dangling = sequenced.report.dangling.len(),
                cycle_edges = sequenced.report.cycle_edges.len(),
                duplicates = sequenced.report.duplicate_names.len(),
                "assessment order built from imperfect prerequisites"
            );
        }
        let total = sequenced.order.len();
        Self {
            user,
            config,
            order: sequenced.order,
            report: sequenced.report,
            answers: vec![None; total],
            cursor: 0,
        }
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// All concepts in presentation order.
    pub fn order(&self) -> &[ConceptNode] {
        &self.order
    }

    pub fn report(&self) -> &SequenceReport {
        &self.report
    }

    /// The concept awaiting an answer, or None when finished.
    pub fn current(&self) -> Option<&ConceptNode> {
        self.order.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.order.len()
    }

    /// `(presented so far, total)`; skips count as presented.
    pub fn progress(&self) -> (usize, usize) {
        (self.cursor.min(self.order.len()), self.order.len())
    }

    /// Answer the current concept and advance.
    pub fn answer(&mut self, answer: OxAnswer) -> Result<ConceptId> {
        let id = self.current().map(|c| c.id).ok_or(Error::SessionFinished)?;
        self.answers[self.cursor] = Some(answer);
        self.cursor += 1;
        Ok(id)
    }

    /// Move past the current concept without recording anything.
    pub fn skip(&mut self) -> Result<ConceptId> {
        let id = self.current().map(|c| c.id).ok_or(Error::SessionFinished)?;
        self.cursor += 1;
        Ok(id)
    }

    /// Close the session. Unanswered concepts yield no record.
    pub fn finish(self) -> AssessmentOutcome {
        let mut records = Vec::new();
        let mut weak = Vec::new();

        for (concept, answer) in self.order.into_iter().zip(self.answers) {
            let Some(answer) = answer else { continue };
            let level = UnderstandingLevel::new(match answer {
                OxAnswer::Know => self.config.know_level,
                OxAnswer::DontKnow => self.config.dont_know_level,
            });
            records.push(UnderstandingRecord::new(self.user.clone(), concept.id, level));
            if level.get() < self.config.weak_threshold {
                weak.push(concept);
            }
        }

        tracing::debug!(user = %self.user, answered = records.len(), weak = weak.len(), "assessment finished");
        AssessmentOutcome { records, weak }
    }
}
