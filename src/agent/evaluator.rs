//! Completeness evaluation.
//!
//! The evaluator never fails outward: any failure becomes
//! [`Evaluation::conservative_fallback`], which asks for exactly one more
//! detailed follow-up. The orchestrator depth-caps that follow-up like any
//! other.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::SearchConfig;
use super::prompt::build_evaluator_prompt;
use super::provider::LlmProvider;
use super::retry::{RetryPolicy, with_timeout};
use super::traits::{Agent, json_payload};
use crate::core::{Evaluation, clip_to_budget};
use crate::error::AgentError;

/// Judges whether narrative text covers a query.
#[async_trait]
pub trait CompletenessEvaluator: Send + Sync {
    /// Evaluates `text` as an answer to `query`.
    async fn evaluate(&self, query: &str, text: &str) -> Evaluation;
}

/// Agent that returns a JSON completeness judgment.
pub struct EvaluatorAgent {
    model: String,
    system_prompt: String,
}

impl EvaluatorAgent {
    /// Creates an evaluator agent for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Parses the agent's JSON output.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] if the content is not a valid
    /// evaluation object.
    pub fn parse_evaluation(content: &str) -> Result<Evaluation, AgentError> {
        serde_json::from_str(json_payload(content)).map_err(|e| AgentError::ResponseParse {
            message: format!("invalid evaluation JSON: {e}"),
            content: content.to_string(),
        })
    }
}

#[async_trait]
impl Agent for EvaluatorAgent {
    fn name(&self) -> &'static str {
        "evaluator"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        1024
    }
}

/// [`CompletenessEvaluator`] backed by an LLM provider.
pub struct LlmCompletenessEvaluator {
    provider: Arc<dyn LlmProvider>,
    agent: EvaluatorAgent,
    retry: RetryPolicy,
    timeout: Duration,
    max_input_tokens: usize,
}

impl LlmCompletenessEvaluator {
    /// Creates an evaluator from the session configuration.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &SearchConfig, system_prompt: &str) -> Self {
        Self {
            provider,
            agent: EvaluatorAgent::new(&config.evaluator_model, system_prompt),
            retry: RetryPolicy::from_config(config),
            timeout: config.per_call_timeout,
            max_input_tokens: config.max_input_tokens,
        }
    }

    /// Overrides the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn try_evaluate(&self, query: &str, text: &str) -> Result<Evaluation, AgentError> {
        let prompt = build_evaluator_prompt(query, clip_to_budget(text, self.max_input_tokens));
        let prompt = prompt.as_str();
        let provider = self.provider.as_ref();
        let agent = &self.agent;
        let timeout = self.timeout;

        self.retry
            .run("evaluate", move || async move {
                let response = with_timeout(timeout, agent.execute(provider, prompt)).await?;
                EvaluatorAgent::parse_evaluation(&response.content)
            })
            .await
    }
}

#[async_trait]
impl CompletenessEvaluator for LlmCompletenessEvaluator {
    async fn evaluate(&self, query: &str, text: &str) -> Evaluation {
        match self.try_evaluate(query, text).await {
            Ok(evaluation) => {
                debug!(
                    query,
                    comprehensive = evaluation.is_comprehensive,
                    follow_ups = evaluation.follow_up_queries.len(),
                    "evaluated answer"
                );
                evaluation
            }
            Err(e) => {
                let degraded = AgentError::EvaluationDegraded {
                    message: e.to_string(),
                };
                warn!(query, error = %degraded, "using conservative fallback evaluation");
                Evaluation::conservative_fallback(query)
            }
        }
    }
}

impl std::fmt::Debug for LlmCompletenessEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmCompletenessEvaluator")
            .field("provider", &self.provider.name())
            .field("model", &self.agent.model)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::ScriptedProvider;

    fn evaluator(provider: Arc<ScriptedProvider>) -> LlmCompletenessEvaluator {
        LlmCompletenessEvaluator::new(provider, &SearchConfig::default(), "evaluate")
            .with_retry(RetryPolicy::new(2, Duration::ZERO))
    }

    #[test]
    fn test_parse_snake_and_camel_case() {
        let snake = EvaluatorAgent::parse_evaluation(
            r#"{"is_comprehensive": false, "follow_up_queries": ["a"]}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let camel = EvaluatorAgent::parse_evaluation(
            r#"{"isComprehensive": false, "followUpQueries": ["a"]}"#,
        )
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(snake, camel);
        assert!(snake.missing_information.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_success() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::ok(
            r#"{"is_comprehensive": true, "missing_information": [], "follow_up_queries": []}"#,
        )]));
        let evaluation = evaluator(provider).evaluate("q", "answer").await;
        assert!(evaluation.is_comprehensive);
    }

    #[tokio::test]
    async fn test_failure_yields_conservative_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::ok("I think it is fine"),
            ScriptedProvider::fail(),
        ]));
        let evaluation = evaluator(Arc::clone(&provider))
            .evaluate("solar vendors", "answer")
            .await;
        assert_eq!(evaluation, Evaluation::conservative_fallback("solar vendors"));
        assert_eq!(
            evaluation.follow_up_queries,
            vec!["solar vendors more detailed"]
        );
        assert_eq!(provider.calls(), 2);
    }
}
