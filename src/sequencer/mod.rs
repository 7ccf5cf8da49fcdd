//! # Concept Dependency Sequencer
//!
//! Orders the concepts of one document so that, wherever the prerequisite
//! graph is acyclic, a concept's prerequisites come before it. The
//! assessment flow serves concepts strictly in this order.
//!
//! ```text
//! roots sorted by (level, position)  ──►  visit each root
//! original input order               ──►  visit every node (catch-all)
//! visit(n): seen? stop. mark. visit resolvable prerequisites. emit n.
//! ```
//!
//! Prerequisites are joined by *name*. The input is LLM-generated, so names
//! may dangle, collide, or form cycles. None of that is an error: the result
//! is always a permutation of the input and every oddity is recorded in the
//! [`SequenceReport`].
//!
//! Visited state is tracked per input node, not per name, so two nodes that
//! share a name are both emitted. Name resolution is last-writer-wins.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::ConceptRef;

// ============================================================================
// Diagnostics
// ============================================================================

/// A prerequisite name that matched no concept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanglingRef {
    pub concept: String,
    pub missing: String,
}

/// A prerequisite edge that closed a cycle: `concept` requires `requires`,
/// but `requires` was still waiting on `concept` (directly or transitively).
/// Self-loops appear with `concept == requires`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleEdge {
    pub concept: String,
    pub requires: String,
}

/// Everything the sequencer tolerated while ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceReport {
    pub dangling: Vec<DanglingRef>,
    pub cycle_edges: Vec<CycleEdge>,
    /// Concepts on at least one cycle, in discovery order.
    pub cycle_members: Vec<String>,
    /// Names carried by more than one concept, each listed once.
    pub duplicate_names: Vec<String>,
}

impl SequenceReport {
    /// True when the input was a clean DAG with unique, resolvable names.
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.cycle_edges.is_empty() && self.duplicate_names.is_empty()
    }

    /// Sorted, deduplicated names of every concept on a cycle.
    pub fn cyclic_concepts(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cycle_members.iter().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Sequenced concepts plus the diagnostics gathered on the way.
#[derive(Debug, Clone)]
pub struct Sequenced<T> {
    pub order: Vec<T>,
    pub report: SequenceReport,
}

// ============================================================================
// Public entry points
// ============================================================================

/// Order concepts so resolvable prerequisites precede their dependents.
///
/// Always returns a permutation of `nodes`.
pub fn sequence<T: ConceptRef + Clone>(nodes: &[T]) -> Vec<T> {
    sequence_with_report(nodes).order
}

/// Like [`sequence`], but also returns what was tolerated along the way.
pub fn sequence_with_report<T: ConceptRef + Clone>(nodes: &[T]) -> Sequenced<T> {
    let (indices, report) = sequence_indices(nodes);
    let order = indices.into_iter().map(|i| nodes[i].clone()).collect();
    Sequenced { order, report }
}

/// Core ordering over input indices. `result.0` is a permutation of
/// `0..nodes.len()`.
pub fn sequence_indices<T: ConceptRef>(nodes: &[T]) -> (Vec<usize>, SequenceReport) {
    let mut walk = Walk::new(nodes);

    let mut roots: Vec<usize> = (0..nodes.len())
        .filter(|&i| nodes[i].prerequisites().is_empty())
        .collect();
    // Stable: equal (level, position) keep input order.
    roots.sort_by_key(|&i| (nodes[i].level(), nodes[i].position()));

    for i in roots {
        walk.visit(i);
    }
    for i in 0..nodes.len() {
        walk.visit(i);
    }

    debug_assert_eq!(walk.sorted.len(), nodes.len());
    (walk.sorted, walk.report)
}

// ============================================================================
// Depth-first walk
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    /// Visited, prerequisites still being walked.
    Open,
    Done,
}

struct Walk<'a, T> {
    nodes: &'a [T],
    by_name: HashMap<&'a str, usize>,
    marks: Vec<Mark>,
    in_cycle: Vec<bool>,
    /// Open nodes with the index of the next prerequisite to look at.
    stack: Vec<(usize, usize)>,
    sorted: Vec<usize>,
    report: SequenceReport,
}

impl<'a, T: ConceptRef> Walk<'a, T> {
    fn new(nodes: &'a [T]) -> Self {
        let mut by_name: HashMap<&'a str, usize> = HashMap::with_capacity(nodes.len());
        let mut report = SequenceReport::default();

        for (i, node) in nodes.iter().enumerate() {
            if let Some(prev) = by_name.insert(node.name(), i) {
                tracing::warn!(
                    name = node.name(),
                    shadowed = prev,
                    winner = i,
                    "duplicate concept name; prerequisites resolve to the later concept"
                );
                if !report.duplicate_names.iter().any(|n| n == node.name()) {
                    report.duplicate_names.push(node.name().to_string());
                }
            }
        }

        Self {
            nodes,
            by_name,
            marks: vec![Mark::Unvisited; nodes.len()],
            in_cycle: vec![false; nodes.len()],
            stack: Vec::new(),
            sorted: Vec::with_capacity(nodes.len()),
            report,
        }
    }

    /// Post-order walk from `start`. Uses an explicit frame stack, so chain
    /// length is bounded by memory, not by the thread's stack.
    fn visit(&mut self, start: usize) {
        if self.marks[start] != Mark::Unvisited {
            return;
        }
        let nodes = self.nodes;
        self.marks[start] = Mark::Open;
        self.stack.push((start, 0));

        while let Some(frame) = self.stack.last_mut() {
            let (i, next) = *frame;
            frame.1 += 1;

            let node = &nodes[i];
            let Some(req) = node.prerequisites().get(next) else {
                self.stack.pop();
                self.marks[i] = Mark::Done;
                self.sorted.push(i);
                continue;
            };

            match self.by_name.get(req.as_str()).copied() {
                None => {
                    tracing::debug!(concept = node.name(), missing = %req, "dangling prerequisite");
                    self.report.dangling.push(DanglingRef {
                        concept: node.name().to_string(),
                        missing: req.clone(),
                    });
                }
                Some(j) => match self.marks[j] {
                    Mark::Unvisited => {
                        self.marks[j] = Mark::Open;
                        self.stack.push((j, 0));
                    }
                    Mark::Open => {
                        tracing::debug!(concept = node.name(), requires = %req, "prerequisite cycle");
                        self.report.cycle_edges.push(CycleEdge {
                            concept: node.name().to_string(),
                            requires: req.clone(),
                        });
                        self.mark_cycle_from(j);
                    }
                    Mark::Done => {}
                },
            }
        }
    }

    /// Every open node from `j` up to the top of the stack lies on the
    /// cycle just closed.
    fn mark_cycle_from(&mut self, j: usize) {
        let Some(from) = self.stack.iter().rposition(|&(n, _)| n == j) else {
            return;
        };
        for &(n, _) in &self.stack[from..] {
            if !self.in_cycle[n] {
                self.in_cycle[n] = true;
                self.report.cycle_members.push(self.nodes[n].name().to_string());
            }
        }
    }
}
