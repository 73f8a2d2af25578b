//! Narrative answering with a live path and a degraded fallback path.
//!
//! The live path gets the full retry budget. When it is exhausted (or the
//! live model returns nothing) the fallback model is asked once. Only when
//! both fail does the node see [`AgentError::AnsweringUnavailable`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::config::SearchConfig;
use super::prompt::build_answer_prompt;
use super::provider::LlmProvider;
use super::retry::{RetryPolicy, with_timeout};
use super::traits::Agent;
use crate::core::{RawAnswer, SourceKind};
use crate::error::AgentError;

/// Per-call answering options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOptions {
    /// Answer length limit, in tokens.
    pub max_output_length: u32,
}

impl AnswerOptions {
    /// Options derived from the session configuration.
    #[must_use]
    pub const fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_output_length: config.max_output_length,
        }
    }
}

/// Turns a query into narrative text.
#[async_trait]
pub trait AnsweringClient: Send + Sync {
    /// Answers `query`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::AnsweringUnavailable`] when neither the live
    /// nor the fallback path produced an answer.
    async fn answer(&self, query: &str, options: AnswerOptions) -> Result<RawAnswer, AgentError>;
}

/// Agent that writes the narrative answer for one query.
pub struct AnswerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl AnswerAgent {
    /// Creates an answer agent for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>, max_tokens: u32, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            system_prompt: system_prompt.into(),
        }
    }
}

#[async_trait]
impl Agent for AnswerAgent {
    fn name(&self) -> &'static str {
        "answer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// [`AnsweringClient`] backed by two LLM providers.
///
/// `live` and `fallback` may be the same provider; the fallback path then
/// differs only by model.
pub struct LlmAnsweringClient {
    live: Arc<dyn LlmProvider>,
    fallback: Arc<dyn LlmProvider>,
    live_model: String,
    fallback_model: String,
    system_prompt: String,
    retry: RetryPolicy,
    timeout: Duration,
}

impl LlmAnsweringClient {
    /// Creates a client using `provider` for both paths.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &SearchConfig, system_prompt: &str) -> Self {
        Self {
            fallback: Arc::clone(&provider),
            live: provider,
            live_model: config.answer_model.clone(),
            fallback_model: config.fallback_model.clone(),
            system_prompt: system_prompt.to_string(),
            retry: RetryPolicy::from_config(config),
            timeout: config.per_call_timeout,
        }
    }

    /// Uses a separate provider for the fallback path.
    #[must_use]
    pub fn with_fallback_provider(mut self, fallback: Arc<dyn LlmProvider>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Overrides the retry policy of the live path.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn live_answer(&self, prompt: &str, max_tokens: u32) -> Result<String, AgentError> {
        let agent = AnswerAgent::new(&self.live_model, max_tokens, &self.system_prompt);
        let provider = self.live.as_ref();
        let timeout = self.timeout;

        let response = self
            .retry
            .run("answer", || with_timeout(timeout, agent.execute(provider, prompt)))
            .await?;

        if response.content.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: "live answer was empty".to_string(),
                content: response.content,
            });
        }
        if response.truncated() {
            debug!(model = %self.live_model, "answer hit its token limit");
        }
        Ok(response.content)
    }

    async fn fallback_answer(&self, prompt: &str, max_tokens: u32) -> Result<String, AgentError> {
        let agent = AnswerAgent::new(&self.fallback_model, max_tokens, &self.system_prompt);
        let response = with_timeout(self.timeout, agent.execute(self.fallback.as_ref(), prompt)).await?;

        if response.content.trim().is_empty() {
            return Err(AgentError::ResponseParse {
                message: "fallback answer was empty".to_string(),
                content: response.content,
            });
        }
        Ok(response.content)
    }
}

#[async_trait]
impl AnsweringClient for LlmAnsweringClient {
    async fn answer(&self, query: &str, options: AnswerOptions) -> Result<RawAnswer, AgentError> {
        let start = Instant::now();
        let prompt = build_answer_prompt(query);

        let live_error = match self.live_answer(&prompt, options.max_output_length).await {
            Ok(content) => {
                return Ok(RawAnswer {
                    content,
                    elapsed_time: start.elapsed(),
                    source_kind: SourceKind::Live,
                });
            }
            Err(e) => e,
        };

        warn!(query, error = %live_error, "live answering failed, trying fallback");

        match self.fallback_answer(&prompt, options.max_output_length).await {
            Ok(content) => Ok(RawAnswer {
                content,
                elapsed_time: start.elapsed(),
                source_kind: SourceKind::Fallback,
            }),
            Err(fallback_error) => Err(AgentError::AnsweringUnavailable {
                query: query.to_string(),
                live: live_error.to_string(),
                fallback: fallback_error.to_string(),
            }),
        }
    }
}

impl std::fmt::Debug for LlmAnsweringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAnsweringClient")
            .field("live", &self.live.name())
            .field("fallback", &self.fallback.name())
            .field("live_model", &self.live_model)
            .field("fallback_model", &self.fallback_model)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::test_support::ScriptedProvider;

    fn client(provider: Arc<ScriptedProvider>, attempts: u32) -> LlmAnsweringClient {
        let config = SearchConfig::builder()
            .answer_model("live-model")
            .fallback_model("fallback-model")
            .build()
            .unwrap_or_else(|_| unreachable!());
        LlmAnsweringClient::new(provider, &config, "answer")
            .with_retry(RetryPolicy::new(attempts, Duration::ZERO))
    }

    const OPTIONS: AnswerOptions = AnswerOptions {
        max_output_length: 256,
    };

    #[tokio::test]
    async fn test_live_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::ok(
            "Acme builds anvils.",
        )]));
        let answer = client(Arc::clone(&provider), 3)
            .answer("anvil makers", OPTIONS)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.source_kind, SourceKind::Live);
        assert_eq!(answer.content, "Acme builds anvils.");
        assert_eq!(provider.models(), vec!["live-model"]);
    }

    #[tokio::test]
    async fn test_live_retried_before_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::fail(),
            ScriptedProvider::fail(),
            ScriptedProvider::ok("from fallback"),
        ]));
        let answer = client(Arc::clone(&provider), 2)
            .answer("q", OPTIONS)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.source_kind, SourceKind::Fallback);
        assert_eq!(answer.content, "from fallback");
        assert_eq!(
            provider.models(),
            vec!["live-model", "live-model", "fallback-model"]
        );
    }

    #[tokio::test]
    async fn test_empty_live_answer_uses_fallback() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::ok("   "),
            ScriptedProvider::ok("something"),
        ]));
        let answer = client(provider, 3)
            .answer("q", OPTIONS)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.source_kind, SourceKind::Fallback);
    }

    #[tokio::test]
    async fn test_both_paths_fail() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let result = client(Arc::clone(&provider), 2).answer("q", OPTIONS).await;
        assert!(matches!(
            result,
            Err(AgentError::AnsweringUnavailable { ref query, .. }) if query == "q"
        ));
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_separate_fallback_provider() {
        let live = Arc::new(ScriptedProvider::new(vec![]));
        let fallback = Arc::new(ScriptedProvider::new(vec![ScriptedProvider::ok("ok")]));
        let answer = client(live, 1)
            .with_fallback_provider(Arc::clone(&fallback) as Arc<dyn LlmProvider>)
            .answer("q", OPTIONS)
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.source_kind, SourceKind::Fallback);
        assert_eq!(fallback.calls(), 1);
    }
}
