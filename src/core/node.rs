//! Query nodes and the raw answers they produce.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One query dispatched at a specific recursion depth.
///
/// Root nodes sit at depth 0 with no parent; every follow-up is created
/// through [`QueryNode::child`], which is the only way depth increases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryNode {
    /// Query text sent to the answering service.
    pub query: String,
    /// Recursion depth (root = 0).
    pub depth: usize,
    /// Query of the node that spawned this one.
    pub parent_query: Option<String>,
}

impl QueryNode {
    /// Creates a root node.
    #[must_use]
    pub fn root(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            depth: 0,
            parent_query: None,
        }
    }

    /// Creates a follow-up node one level below `self`.
    #[must_use]
    pub fn child(&self, query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            depth: self.depth + 1,
            parent_query: Some(self.query.clone()),
        }
    }

    /// Returns `true` for the session root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.depth == 0
    }
}

/// Which answering path produced a [`RawAnswer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// The primary answering service.
    Live,
    /// The degraded substitute used after the live path failed.
    Fallback,
}

impl SourceKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Narrative text returned for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawAnswer {
    /// Narrative answer text.
    pub content: String,
    /// Wall-clock time spent obtaining the answer (fallback included).
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed_time: Duration,
    /// Which path produced the text.
    pub source_kind: SourceKind,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_depth_and_parent() {
        let root = QueryNode::root("acme suppliers");
        assert!(root.is_root());
        let child = root.child("acme suppliers in europe");
        assert_eq!(child.depth, 1);
        assert_eq!(child.parent_query.as_deref(), Some("acme suppliers"));
        let grandchild = child.child("acme suppliers in france");
        assert_eq!(grandchild.depth, 2);
        assert!(!grandchild.is_root());
    }

    #[test]
    fn test_source_kind_serialization() {
        let json = serde_json::to_string(&SourceKind::Fallback).unwrap_or_default();
        assert_eq!(json, "\"fallback\"");
        assert_eq!(SourceKind::Live.to_string(), "live");
    }

    #[test]
    fn test_raw_answer_elapsed_serializes_as_seconds() {
        let answer = RawAnswer {
            content: "text".to_string(),
            elapsed_time: Duration::from_millis(2500),
            source_kind: SourceKind::Live,
        };
        let json = serde_json::to_value(&answer).unwrap_or_default();
        assert_eq!(json["elapsed_time"], serde_json::json!(2.5));
        assert_eq!(json["source_kind"], serde_json::json!("live"));
    }
}
