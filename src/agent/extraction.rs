//! Structured entity extraction from narrative text.
//!
//! Extraction never fails outward. Transport errors, unparseable JSON and
//! schema violations are all retried; when the budget runs out the adapter
//! logs an [`AgentError::ExtractionDegraded`] and returns an empty
//! collection so the branch keeps going.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::config::SearchConfig;
use super::prompt::build_extraction_prompt;
use super::provider::LlmProvider;
use super::retry::{RetryPolicy, with_timeout};
use super::traits::{Agent, json_payload};
use crate::core::{EntityCollection, EntityRecord, clip_to_budget, estimate_tokens};
use crate::error::AgentError;

/// Turns narrative text into entities of one type.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    /// Extracts every `entity_type` entity mentioned in `text`.
    ///
    /// Always returns a collection that passed
    /// [`EntityCollection::validate`]; on failure that is the empty one.
    async fn extract(&self, text: &str, entity_type: &str) -> EntityCollection;
}

/// Agent that extracts entities as JSON.
pub struct ExtractionAgent {
    model: String,
    system_prompt: String,
}

impl ExtractionAgent {
    /// Creates an extraction agent for `model`.
    #[must_use]
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Parses and validates the agent's JSON output.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ResponseParse`] for malformed JSON and
    /// [`AgentError::Validation`] for schema violations.
    pub fn parse_collection(content: &str, entity_type: &str) -> Result<EntityCollection, AgentError> {
        let payload = json_payload(content);
        let wire: WireCollection =
            serde_json::from_str(payload).map_err(|e| AgentError::ResponseParse {
                message: format!("invalid extraction JSON: {e}"),
                content: content.to_string(),
            })?;

        let collection = EntityCollection {
            entities: wire.entities,
            entity_type: entity_type.to_string(),
            completeness_score: wire.completeness_score,
        };
        collection.validate()?;
        Ok(collection)
    }
}

#[async_trait]
impl Agent for ExtractionAgent {
    fn name(&self) -> &'static str {
        "extraction"
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
        4096
    }
}

/// Shape of the extraction response on the wire.
#[derive(Deserialize)]
struct WireCollection {
    #[serde(default)]
    entities: Vec<EntityRecord>,
    #[serde(default, alias = "completenessScore")]
    completeness_score: f64,
}

/// [`ExtractionClient`] backed by an LLM provider.
pub struct LlmExtractionClient {
    provider: Arc<dyn LlmProvider>,
    agent: ExtractionAgent,
    retry: RetryPolicy,
    timeout: Duration,
    max_input_tokens: usize,
}

impl LlmExtractionClient {
    /// Creates a client from the session configuration.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, config: &SearchConfig, system_prompt: &str) -> Self {
        Self {
            provider,
            agent: ExtractionAgent::new(&config.extraction_model, system_prompt),
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

    async fn try_extract(&self, text: &str, entity_type: &str) -> Result<EntityCollection, AgentError> {
        let clipped = clip_to_budget(text, self.max_input_tokens);
        if clipped.len() < text.len() {
            debug!(
                estimated_tokens = estimate_tokens(text),
                budget = self.max_input_tokens,
                "clipping extraction input"
            );
        }
        let prompt = build_extraction_prompt(clipped, entity_type);
        let prompt = prompt.as_str();
        let provider = self.provider.as_ref();
        let agent = &self.agent;
        let timeout = self.timeout;

        self.retry
            .run("extract", move || async move {
                let response = with_timeout(timeout, agent.execute(provider, prompt)).await?;
                ExtractionAgent::parse_collection(&response.content, entity_type)
            })
            .await
    }
}

#[async_trait]
impl ExtractionClient for LlmExtractionClient {
    async fn extract(&self, text: &str, entity_type: &str) -> EntityCollection {
        match self.try_extract(text, entity_type).await {
            Ok(collection) => {
                debug!(entity_type, count = collection.len(), "extracted entities");
                collection
            }
            Err(e) => {
                let degraded = AgentError::ExtractionDegraded {
                    message: e.to_string(),
                };
                warn!(entity_type, error = %degraded, "returning empty collection");
                EntityCollection::empty(entity_type)
            }
        }
    }
}

impl std::fmt::Debug for LlmExtractionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmExtractionClient")
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

    fn client(provider: Arc<ScriptedProvider>, attempts: u32) -> LlmExtractionClient {
        LlmExtractionClient::new(provider, &SearchConfig::default(), "extract")
            .with_retry(RetryPolicy::new(attempts, Duration::ZERO))
    }

    #[test]
    fn test_parse_collection() {
        let content = r#"```json
{"entities": [{"name": "Acme", "attributes": {"founded": 1999}}], "completenessScore": 0.5}
```"#;
        let collection = ExtractionAgent::parse_collection(content, "company")
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(collection.entity_type, "company");
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.entities[0].attributes["founded"], 1999);
    }

    #[test]
    fn test_parse_collection_rejects_bad_score() {
        let result =
            ExtractionAgent::parse_collection(r#"{"entities": [], "completeness_score": 1.5}"#, "x");
        assert!(matches!(result, Err(AgentError::Validation { .. })));
    }

    #[test]
    fn test_parse_collection_rejects_blank_name() {
        let result = ExtractionAgent::parse_collection(
            r#"{"entities": [{"name": "  "}], "completeness_score": 0.2}"#,
            "x",
        );
        assert!(matches!(result, Err(AgentError::Validation { .. })));
    }

    #[test]
    fn test_parse_collection_rejects_garbage() {
        let result = ExtractionAgent::parse_collection("no entities here", "x");
        assert!(matches!(result, Err(AgentError::ResponseParse { .. })));
    }

    #[tokio::test]
    async fn test_invalid_output_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::ok("not json"),
            ScriptedProvider::ok(r#"{"entities": [{"name": "Acme"}], "completeness_score": 0.9}"#),
        ]));
        let collection = client(Arc::clone(&provider), 3).extract("text", "company").await;
        assert_eq!(collection.len(), 1);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_empty() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedProvider::ok("not json"),
            ScriptedProvider::fail(),
        ]));
        let collection = client(Arc::clone(&provider), 2).extract("text", "company").await;
        assert!(collection.is_empty());
        assert_eq!(collection.entity_type, "company");
        assert!(collection.completeness_score.abs() < f64::EPSILON);
        assert_eq!(provider.calls(), 2);
    }
}
