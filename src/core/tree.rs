//! Result trees: the full provenance of a search session.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use super::entity::{EntityCollection, MergedEntitySet};
use super::evaluation::Evaluation;
use super::node::{QueryNode, RawAnswer, SourceKind, serialize_duration};
use crate::error::AgentError;

/// Outcome of one query node and, recursively, of its follow-ups.
///
/// Children are keyed by query text and kept in a [`BTreeMap`], so the
/// shape of the tree never depends on which branch finished first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTree {
    /// The dispatched query.
    pub node: QueryNode,
    /// Narrative answer. `None` when answering was unavailable.
    pub answer: Option<RawAnswer>,
    /// Entities extracted from the answer (empty for failed nodes).
    pub entities: EntityCollection,
    /// Completeness judgment. `None` when answering was unavailable.
    pub evaluation: Option<Evaluation>,
    /// Failure recorded for this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Follow-up branches keyed by their query.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, Self>,
}

impl ResultTree {
    /// A node that was answered, extracted and evaluated.
    #[must_use]
    pub const fn completed(
        node: QueryNode,
        answer: RawAnswer,
        entities: EntityCollection,
        evaluation: Evaluation,
    ) -> Self {
        Self {
            node,
            answer: Some(answer),
            entities,
            evaluation: Some(evaluation),
            error: None,
            children: BTreeMap::new(),
        }
    }

    /// A node whose answering failed. It contributes no entities.
    #[must_use]
    pub fn failed(node: QueryNode, entity_type: &str, error: &AgentError) -> Self {
        Self {
            node,
            answer: None,
            entities: EntityCollection::empty(entity_type),
            evaluation: None,
            error: Some(error.to_string()),
            children: BTreeMap::new(),
        }
    }

    /// Returns `true` if this node recorded a failure.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Total number of nodes in this subtree, `self` included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(Self::node_count).sum::<usize>()
    }

    /// Deepest node depth in this subtree.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.children
            .values()
            .map(Self::max_depth)
            .max()
            .unwrap_or(self.node.depth)
    }

    /// Returns every node of the subtree in canonical order.
    ///
    /// Breadth-first by depth; within a depth, lexicographic by query text.
    /// Equal query texts at the same depth (reached through different
    /// parents) are ordered by their ancestor query chain, so the order is
    /// total and independent of completion timing.
    #[must_use]
    pub fn canonical_order(&self) -> Vec<&Self> {
        let mut entries: Vec<(Vec<&str>, &Self)> = Vec::new();
        let mut stack: Vec<(Vec<&str>, &Self)> = vec![(Vec::new(), self)];

        while let Some((mut path, tree)) = stack.pop() {
            path.push(tree.node.query.as_str());
            for child in tree.children.values() {
                stack.push((path.clone(), child));
            }
            entries.push((path, tree));
        }

        entries.sort_by(|(path_a, a), (path_b, b)| {
            a.node
                .depth
                .cmp(&b.node.depth)
                .then_with(|| a.node.query.cmp(&b.node.query))
                .then_with(|| path_a.cmp(path_b))
        });

        entries.into_iter().map(|(_, tree)| tree).collect()
    }
}

/// Counters derived from a finished [`ResultTree`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Query nodes dispatched, root included.
    pub nodes_dispatched: usize,
    /// Nodes whose answering was unavailable.
    pub nodes_failed: usize,
    /// Nodes answered by the fallback path.
    pub fallback_answers: usize,
    /// Deepest depth reached.
    pub max_depth_reached: usize,
    /// Entities extracted across all nodes, before deduplication.
    pub entities_extracted: usize,
    /// Distinct entities after merging.
    pub entities_merged: usize,
    /// Wall-clock duration of the session.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl SessionStats {
    /// Computes statistics for a finished session.
    #[must_use]
    pub fn from_tree(tree: &ResultTree, merged: &MergedEntitySet, elapsed: Duration) -> Self {
        let nodes = tree.canonical_order();
        Self {
            nodes_dispatched: nodes.len(),
            nodes_failed: nodes.iter().filter(|t| t.is_failed()).count(),
            fallback_answers: nodes
                .iter()
                .filter(|t| {
                    t.answer
                        .as_ref()
                        .is_some_and(|a| a.source_kind == SourceKind::Fallback)
                })
                .count(),
            max_depth_reached: tree.max_depth(),
            entities_extracted: nodes.iter().map(|t| t.entities.len()).sum(),
            entities_merged: merged.len(),
            elapsed,
        }
    }
}

/// Everything a search session produces.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    /// Provenance of every dispatched query.
    pub tree: ResultTree,
    /// Deduplicated entities, the primary deliverable.
    pub entities: MergedEntitySet,
    /// Session counters.
    pub stats: SessionStats,
}
