//! Search configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! Every value is range-checked by [`SearchConfigBuilder::build`]; out-of-range
//! values fail with [`AgentError::ConfigurationInvalid`] before any work starts.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::error::AgentError;

/// Default maximum recursion depth (root = 0).
const DEFAULT_MAX_DEPTH: usize = 2;
/// Default follow-up queries kept per node.
const DEFAULT_MAX_QUERIES_PER_LEVEL: usize = 3;
/// Default session-wide cap on nodes doing external I/O at once.
const DEFAULT_CONCURRENCY_LIMIT: usize = 16;
/// Default per-call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default answer length limit, in tokens.
const DEFAULT_MAX_OUTPUT_LENGTH: u32 = 4096;
/// Default token budget for narrative text handed to extraction and evaluation.
const DEFAULT_MAX_INPUT_TOKENS: usize = 12_000;
/// Default max attempts per external call.
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay before the first retry.
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;
/// Default entity type to extract.
const DEFAULT_ENTITY_TYPE: &str = "entity";

/// Configuration for a search session.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider. Only required when a real provider is created.
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used by the live answering path.
    pub answer_model: String,
    /// Model used by the degraded answering path.
    pub fallback_model: String,
    /// Model used for entity extraction.
    pub extraction_model: String,
    /// Model used for completeness evaluation.
    pub evaluator_model: String,
    /// Entity type extracted from every answer.
    pub entity_type: String,
    /// Maximum recursion depth. Nodes at this depth never recurse.
    pub max_depth: usize,
    /// Follow-up queries kept per node; extras are dropped.
    pub max_queries_per_level: usize,
    /// Run sibling branches concurrently.
    pub parallel: bool,
    /// Session-wide cap on nodes performing external calls at once,
    /// independent of depth and branching.
    pub global_concurrency_limit: usize,
    /// Deadline for every external call.
    pub per_call_timeout: Duration,
    /// Answer length limit, in tokens.
    pub max_output_length: u32,
    /// Token budget for narrative text handed to extraction and evaluation
    /// (0 = unlimited).
    pub max_input_tokens: usize,
    /// Maximum attempts per external call.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub initial_backoff: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            base_url: None,
            answer_model: "gpt-5.2-2025-12-11".to_string(),
            fallback_model: "gpt-5-mini-2025-08-07".to_string(),
            extraction_model: "gpt-5-mini-2025-08-07".to_string(),
            evaluator_model: "gpt-5-mini-2025-08-07".to_string(),
            entity_type: DEFAULT_ENTITY_TYPE.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_queries_per_level: DEFAULT_MAX_QUERIES_PER_LEVEL,
            parallel: true,
            global_concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            per_call_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_length: DEFAULT_MAX_OUTPUT_LENGTH,
            max_input_tokens: DEFAULT_MAX_INPUT_TOKENS,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            prompt_dir: None,
        }
    }
}

impl SearchConfig {
    /// Creates a new builder for `SearchConfig`.
    #[must_use]
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigurationInvalid`] if an environment value
    /// is out of range.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Re-checks ranges on an already built configuration.
    ///
    /// Fields are public, so a config can be edited after `build()`; the
    /// orchestrator calls this again at construction.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigurationInvalid`] for the first bad field.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.global_concurrency_limit == 0 {
            return Err(invalid("global_concurrency_limit", "must be at least 1"));
        }
        if self.global_concurrency_limit > Semaphore::MAX_PERMITS {
            return Err(invalid(
                "global_concurrency_limit",
                format!("must be at most {}", Semaphore::MAX_PERMITS),
            ));
        }
        if self.per_call_timeout.is_zero() {
            return Err(invalid("per_call_timeout", "must be greater than zero"));
        }
        if self.max_output_length == 0 {
            return Err(invalid("max_output_length", "must be greater than zero"));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "must allow at least one attempt"));
        }
        if self.entity_type.trim().is_empty() {
            return Err(invalid("entity_type", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> AgentError {
    AgentError::ConfigurationInvalid {
        field,
        reason: reason.into(),
    }
}

/// Builder for [`SearchConfig`].
///
/// Depth and branching are taken as signed integers so that negative input
/// (from the CLI or environment) is reported instead of silently wrapping.
#[derive(Debug, Clone, Default)]
pub struct SearchConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    answer_model: Option<String>,
    fallback_model: Option<String>,
    extraction_model: Option<String>,
    evaluator_model: Option<String>,
    entity_type: Option<String>,
    max_depth: Option<i64>,
    max_queries_per_level: Option<i64>,
    parallel: Option<bool>,
    global_concurrency_limit: Option<usize>,
    per_call_timeout: Option<Duration>,
    max_output_length: Option<u32>,
    max_input_tokens: Option<usize>,
    max_retries: Option<u32>,
    initial_backoff: Option<Duration>,
    prompt_dir: Option<PathBuf>,
    env_errors: Vec<(&'static str, String)>,
}

impl SearchConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// Numeric variables that fail to parse are remembered and reported by
    /// [`build`](Self::build).
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("RGATHER_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("RGATHER_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("RGATHER_BASE_URL"))
                .ok();
        }
        if self.answer_model.is_none() {
            self.answer_model = std::env::var("RGATHER_ANSWER_MODEL").ok();
        }
        if self.fallback_model.is_none() {
            self.fallback_model = std::env::var("RGATHER_FALLBACK_MODEL").ok();
        }
        if self.extraction_model.is_none() {
            self.extraction_model = std::env::var("RGATHER_EXTRACTION_MODEL").ok();
        }
        if self.evaluator_model.is_none() {
            self.evaluator_model = std::env::var("RGATHER_EVALUATOR_MODEL").ok();
        }
        if self.max_depth.is_none() {
            self.max_depth = self.env_number("RGATHER_MAX_DEPTH", "max_depth");
        }
        if self.max_queries_per_level.is_none() {
            self.max_queries_per_level =
                self.env_number("RGATHER_MAX_QUERIES_PER_LEVEL", "max_queries_per_level");
        }
        if self.global_concurrency_limit.is_none() {
            self.global_concurrency_limit =
                self.env_number("RGATHER_CONCURRENCY", "global_concurrency_limit");
        }
        if self.per_call_timeout.is_none() {
            self.per_call_timeout = self
                .env_number("RGATHER_TIMEOUT_SECS", "per_call_timeout")
                .map(Duration::from_secs);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("RGATHER_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    fn env_number<T: std::str::FromStr>(&mut self, var: &str, field: &'static str) -> Option<T> {
        let raw = std::env::var(var).ok()?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.env_errors
                    .push((field, format!("{var}={raw:?} is not a valid number")));
                None
            }
        }
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the live answering model.
    #[must_use]
    pub fn answer_model(mut self, model: impl Into<String>) -> Self {
        self.answer_model = Some(model.into());
        self
    }

    /// Sets the fallback answering model.
    #[must_use]
    pub fn fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = Some(model.into());
        self
    }

    /// Sets the extraction model.
    #[must_use]
    pub fn extraction_model(mut self, model: impl Into<String>) -> Self {
        self.extraction_model = Some(model.into());
        self
    }

    /// Sets the evaluator model.
    #[must_use]
    pub fn evaluator_model(mut self, model: impl Into<String>) -> Self {
        self.evaluator_model = Some(model.into());
        self
    }

    /// Sets the entity type to extract.
    #[must_use]
    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Sets the maximum recursion depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: i64) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Sets the number of follow-up queries kept per node.
    #[must_use]
    pub const fn max_queries_per_level(mut self, n: i64) -> Self {
        self.max_queries_per_level = Some(n);
        self
    }

    /// Enables or disables concurrent sibling execution.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Sets the session-wide concurrency limit.
    #[must_use]
    pub const fn global_concurrency_limit(mut self, n: usize) -> Self {
        self.global_concurrency_limit = Some(n);
        self
    }

    /// Sets the per-call timeout.
    #[must_use]
    pub const fn per_call_timeout(mut self, duration: Duration) -> Self {
        self.per_call_timeout = Some(duration);
        self
    }

    /// Sets the answer length limit in tokens.
    #[must_use]
    pub const fn max_output_length(mut self, tokens: u32) -> Self {
        self.max_output_length = Some(tokens);
        self
    }

    /// Sets the token budget for extraction and evaluation input.
    #[must_use]
    pub const fn max_input_tokens(mut self, tokens: usize) -> Self {
        self.max_input_tokens = Some(tokens);
        self
    }

    /// Sets the max attempts per external call.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the delay before the first retry.
    #[must_use]
    pub const fn initial_backoff(mut self, delay: Duration) -> Self {
        self.initial_backoff = Some(delay);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`SearchConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigurationInvalid`] if depth or branching is
    /// negative, an environment value did not parse, or any other value is
    /// out of range (see [`SearchConfig::validate`]).
    pub fn build(self) -> Result<SearchConfig, AgentError> {
        if let Some((field, reason)) = self.env_errors.into_iter().next() {
            return Err(invalid(field, reason));
        }

        let defaults = SearchConfig::default();
        let config = SearchConfig {
            provider: self.provider.unwrap_or(defaults.provider),
            api_key: self.api_key,
            base_url: self.base_url,
            answer_model: self.answer_model.unwrap_or(defaults.answer_model),
            fallback_model: self.fallback_model.unwrap_or(defaults.fallback_model),
            extraction_model: self.extraction_model.unwrap_or(defaults.extraction_model),
            evaluator_model: self.evaluator_model.unwrap_or(defaults.evaluator_model),
            entity_type: self.entity_type.unwrap_or(defaults.entity_type),
            max_depth: non_negative("max_depth", self.max_depth, defaults.max_depth)?,
            max_queries_per_level: non_negative(
                "max_queries_per_level",
                self.max_queries_per_level,
                defaults.max_queries_per_level,
            )?,
            parallel: self.parallel.unwrap_or(defaults.parallel),
            global_concurrency_limit: self
                .global_concurrency_limit
                .unwrap_or(defaults.global_concurrency_limit),
            per_call_timeout: self.per_call_timeout.unwrap_or(defaults.per_call_timeout),
            max_output_length: self.max_output_length.unwrap_or(defaults.max_output_length),
            max_input_tokens: self.max_input_tokens.unwrap_or(defaults.max_input_tokens),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            prompt_dir: self.prompt_dir,
        };

        config.validate()?;
        Ok(config)
    }
}

fn non_negative(field: &'static str, value: Option<i64>, default: usize) -> Result<usize, AgentError> {
    match value {
        None => Ok(default),
        Some(v) => usize::try_from(v).map_err(|_| invalid(field, format!("{v} is negative"))),
    }
}
