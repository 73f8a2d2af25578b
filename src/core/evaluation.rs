//! Completeness judgments.

use serde::{Deserialize, Serialize};

/// Suffix appended to the query for the single follow-up issued when
/// evaluation fails.
pub const FALLBACK_FOLLOW_UP_SUFFIX: &str = " more detailed";

/// Whether a narrative answer covers its query, and what to ask next if not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    /// `true` when no further queries are needed.
    #[serde(alias = "isComprehensive")]
    pub is_comprehensive: bool,
    /// Aspects the answer did not cover.
    #[serde(default, alias = "missingInformation")]
    pub missing_information: Vec<String>,
    /// Queries that would fill the gaps.
    #[serde(default, alias = "followUpQueries")]
    pub follow_up_queries: Vec<String>,
}

impl Evaluation {
    /// A judgment that stops recursion.
    #[must_use]
    pub const fn comprehensive() -> Self {
        Self {
            is_comprehensive: true,
            missing_information: Vec::new(),
            follow_up_queries: Vec::new(),
        }
    }

    /// The judgment substituted when evaluation itself fails: incomplete,
    /// with exactly one follow-up that asks for more detail.
    #[must_use]
    pub fn conservative_fallback(query: &str) -> Self {
        Self {
            is_comprehensive: false,
            missing_information: vec!["evaluation failed".to_string()],
            follow_up_queries: vec![format!("{query}{FALLBACK_FOLLOW_UP_SUFFIX}")],
        }
    }

    /// Returns `true` when this judgment asks for recursion.
    #[must_use]
    pub fn wants_follow_up(&self) -> bool {
        !self.is_comprehensive && !self.follow_up_queries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conservative_fallback() {
        let eval = Evaluation::conservative_fallback("acme suppliers");
        assert!(!eval.is_comprehensive);
        assert_eq!(eval.missing_information, vec!["evaluation failed"]);
        assert_eq!(eval.follow_up_queries, vec!["acme suppliers more detailed"]);
        assert!(eval.wants_follow_up());
    }

    #[test]
    fn test_comprehensive_stops() {
        assert!(!Evaluation::comprehensive().wants_follow_up());
        let incomplete_without_queries = Evaluation {
            is_comprehensive: false,
            missing_information: vec!["prices".to_string()],
            follow_up_queries: Vec::new(),
        };
        assert!(!incomplete_without_queries.wants_follow_up());
    }

    #[test]
    fn test_deserialize_both_casings() {
        let snake: Evaluation = serde_json::from_str(
            r#"{"is_comprehensive": false, "follow_up_queries": ["a"]}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let camel: Evaluation = serde_json::from_str(
            r#"{"isComprehensive": false, "missingInformation": [], "followUpQueries": ["a"]}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(snake, camel);
    }
}
