//! Recursive orchestrator for depth-bounded information gathering.
//!
//! Each query node runs: answer → (extract ∥ evaluate) → optionally recurse
//! into follow-up branches. Siblings run as spawned tasks when `parallel`
//! is set, in order otherwise; the resulting tree is the same either way.
//! Entities are merged once at the root after every branch has joined.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::answering::{AnswerOptions, AnsweringClient, LlmAnsweringClient};
use super::config::SearchConfig;
use super::evaluator::{CompletenessEvaluator, LlmCompletenessEvaluator};
use super::extraction::{ExtractionClient, LlmExtractionClient};
use super::merger::EntityMerger;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use crate::core::{QueryNode, ResultTree, SearchOutcome, SessionStats};
use crate::error::AgentError;

/// Longest accepted root query, in bytes.
const MAX_QUERY_LEN: usize = 10_000;

/// Drives a search session over three collaborators.
pub struct RecursiveOrchestrator {
    answering: Arc<dyn AnsweringClient>,
    extraction: Arc<dyn ExtractionClient>,
    evaluator: Arc<dyn CompletenessEvaluator>,
    config: SearchConfig,
}

impl RecursiveOrchestrator {
    /// Creates an orchestrator from explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigurationInvalid`] if `config` is out of
    /// range. Nothing is dispatched in that case.
    pub fn new(
        answering: Arc<dyn AnsweringClient>,
        extraction: Arc<dyn ExtractionClient>,
        evaluator: Arc<dyn CompletenessEvaluator>,
        config: SearchConfig,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self {
            answering,
            extraction,
            evaluator,
            config,
        })
    }

    /// Creates an orchestrator whose collaborators all talk to `provider`.
    ///
    /// Prompts are loaded from [`SearchConfig::prompt_dir`], falling back
    /// to the compiled-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigurationInvalid`] if `config` is out of
    /// range.
    pub fn from_provider(
        provider: Arc<dyn LlmProvider>,
        config: SearchConfig,
    ) -> Result<Self, AgentError> {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let answering =
            LlmAnsweringClient::new(Arc::clone(&provider), &config, &prompts.answer);
        let extraction =
            LlmExtractionClient::new(Arc::clone(&provider), &config, &prompts.extraction);
        let evaluator = LlmCompletenessEvaluator::new(provider, &config, &prompts.evaluator);
        Self::new(
            Arc::new(answering),
            Arc::new(extraction),
            Arc::new(evaluator),
            config,
        )
    }

    /// Returns the session configuration.
    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs a search session to completion.
    ///
    /// # Errors
    ///
    /// See [`search_with_cancel`](Self::search_with_cancel).
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, AgentError> {
        self.search_with_cancel(query, CancellationToken::new())
            .await
    }

    /// Runs a search session that stops dispatching once `cancel` fires.
    ///
    /// Calls already in flight when cancellation is observed run to
    /// completion or their own timeout; their nodes are kept. Nodes that had
    /// not yet been dispatched are left out of the tree.
    ///
    /// Node-level failures never surface here: a session where every call
    /// failed still returns an outcome, with an empty entity set.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] for an empty or oversized query
    /// and [`AgentError::Cancelled`] if cancellation was observed before the
    /// root query was dispatched.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<SearchOutcome, AgentError> {
        if query.trim().is_empty() {
            return Err(AgentError::InvalidQuery {
                message: "query cannot be empty".to_string(),
            });
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(AgentError::InvalidQuery {
                message: format!(
                    "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                    query.len()
                ),
            });
        }

        let start = Instant::now();
        info!(
            query,
            entity_type = %self.config.entity_type,
            max_depth = self.config.max_depth,
            max_queries_per_level = self.config.max_queries_per_level,
            parallel = self.config.parallel,
            "starting search"
        );

        let session = Arc::new(Session::new(self, cancel));
        let tree = run_node(session, QueryNode::root(query))
            .await
            .ok_or(AgentError::Cancelled)?;

        let entities = EntityMerger::merge(&tree);
        let stats = SessionStats::from_tree(&tree, &entities, start.elapsed());

        info!(
            nodes = stats.nodes_dispatched,
            failed = stats.nodes_failed,
            fallback = stats.fallback_answers,
            extracted = stats.entities_extracted,
            merged = stats.entities_merged,
            elapsed_ms = u64::try_from(stats.elapsed.as_millis()).unwrap_or(u64::MAX),
            "search finished"
        );

        Ok(SearchOutcome {
            tree,
            entities,
            stats,
        })
    }
}

impl std::fmt::Debug for RecursiveOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecursiveOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// State shared by every branch of one session. Read-only apart from the
/// semaphore and the token.
struct Session {
    answering: Arc<dyn AnsweringClient>,
    extraction: Arc<dyn ExtractionClient>,
    evaluator: Arc<dyn CompletenessEvaluator>,
    permits: Semaphore,
    cancel: CancellationToken,
    options: AnswerOptions,
    entity_type: String,
    max_depth: usize,
    max_queries_per_level: usize,
    parallel: bool,
}

impl Session {
    fn new(orchestrator: &RecursiveOrchestrator, cancel: CancellationToken) -> Self {
        let config = &orchestrator.config;
        Self {
            answering: Arc::clone(&orchestrator.answering),
            extraction: Arc::clone(&orchestrator.extraction),
            evaluator: Arc::clone(&orchestrator.evaluator),
            permits: Semaphore::new(config.global_concurrency_limit),
            cancel,
            options: AnswerOptions::from_config(config),
            entity_type: config.entity_type.clone(),
            max_depth: config.max_depth,
            max_queries_per_level: config.max_queries_per_level,
            parallel: config.parallel,
        }
    }
}

/// Runs one node and its follow-up subtree.
///
/// Returns `None` when cancellation was observed before the node's first
/// external call. The concurrency permit covers only the node's own calls
/// and is released before recursing, so waiting children never hold
/// permits their parents need.
fn run_node(session: Arc<Session>, node: QueryNode) -> BoxFuture<'static, Option<ResultTree>> {
    async move {
        let permit = tokio::select! {
            biased;
            () = session.cancel.cancelled() => None,
            permit = session.permits.acquire() => permit.ok(),
        }?;
        if session.cancel.is_cancelled() {
            return None;
        }

        debug!(depth = node.depth, query = %node.query, "dispatching query");

        let answer = match session.answering.answer(&node.query, session.options).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(depth = node.depth, query = %node.query, error = %e, "node failed");
                return Some(ResultTree::failed(node, &session.entity_type, &e));
            }
        };

        let (entities, evaluation) = tokio::join!(
            session
                .extraction
                .extract(&answer.content, &session.entity_type),
            session.evaluator.evaluate(&node.query, &answer.content),
        );
        drop(permit);

        debug!(
            depth = node.depth,
            query = %node.query,
            source = %answer.source_kind,
            entities = entities.len(),
            comprehensive = evaluation.is_comprehensive,
            "node answered"
        );

        let follow_ups = if node.depth < session.max_depth && evaluation.wants_follow_up() {
            plan_follow_ups(
                &node.query,
                &evaluation.follow_up_queries,
                session.max_queries_per_level,
            )
        } else {
            Vec::new()
        };

        let mut tree = ResultTree::completed(node, answer, entities, evaluation);
        if !follow_ups.is_empty() {
            tree.children = run_children(&session, &tree.node, follow_ups).await;
        }
        Some(tree)
    }
    .boxed()
}

/// Runs the follow-up branches of `parent`.
async fn run_children(
    session: &Arc<Session>,
    parent: &QueryNode,
    queries: Vec<String>,
) -> BTreeMap<String, ResultTree> {
    let mut children = BTreeMap::new();

    if session.parallel {
        let mut handles = Vec::with_capacity(queries.len());
        for query in queries {
            if session.cancel.is_cancelled() {
                debug!(parent = %parent.query, "cancelled, not spawning further branches");
                break;
            }
            let child = parent.child(query);
            let handle = tokio::spawn(run_node(Arc::clone(session), child.clone()));
            handles.push((child, handle));
        }

        for (child, handle) in handles {
            match handle.await {
                Ok(Some(tree)) => {
                    children.insert(child.query, tree);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(query = %child.query, error = %e, "branch task failed");
                    let failure = AgentError::Orchestration {
                        message: format!("task join failed: {e}"),
                    };
                    let query = child.query.clone();
                    children.insert(
                        query,
                        ResultTree::failed(child, &session.entity_type, &failure),
                    );
                }
            }
        }
    } else {
        for query in queries {
            if session.cancel.is_cancelled() {
                debug!(parent = %parent.query, "cancelled, not dispatching further branches");
                break;
            }
            let child = parent.child(query);
            let key = child.query.clone();
            if let Some(tree) = run_node(Arc::clone(session), child).await {
                children.insert(key, tree);
            }
        }
    }

    children
}

/// Cleans the evaluator's follow-up list for one node.
///
/// Trims each query, drops blanks, drops the node's own query, removes
/// duplicates (first occurrence wins) and keeps at most `max` of what is
/// left. Excess queries are dropped, not deferred.
#[must_use]
pub fn plan_follow_ups(query: &str, follow_ups: &[String], max: usize) -> Vec<String> {
    let own = query.trim();
    let mut seen = HashSet::new();
    follow_ups
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty() && *q != own)
        .filter(|q| seen.insert(*q))
        .take(max)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_plan_follow_ups_truncates() {
        let planned = plan_follow_ups("q", &strings(&["a", "b", "c", "d"]), 2);
        assert_eq!(planned, strings(&["a", "b"]));
    }

    #[test]
    fn test_plan_follow_ups_drops_self_loop() {
        let planned = plan_follow_ups("acme", &strings(&[" acme ", "acme history"]), 3);
        assert_eq!(planned, strings(&["acme history"]));
    }

    #[test]
    fn test_plan_follow_ups_dedupes_and_drops_blanks() {
        let planned = plan_follow_ups("q", &strings(&["x", "", "  ", "x ", "y"]), 5);
        assert_eq!(planned, strings(&["x", "y"]));
    }

    #[test]
    fn test_plan_follow_ups_zero_branching() {
        assert!(plan_follow_ups("q", &strings(&["a"]), 0).is_empty());
    }
}
