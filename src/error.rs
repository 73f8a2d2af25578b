//! Error types for rgather.
//!
//! [`AgentError`] covers everything the search engine can report, from
//! provider transport failures up to configuration problems. Most of its
//! variants never leave the layer that produced them: the collaborator
//! adapters absorb them and degrade to benign values. [`CommandError`] is
//! used by the CLI layer, and [`Error`] unifies both for the binary.

use std::time::Duration;

use thiserror::Error;

/// Crate-level result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Search engine error.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// CLI command error.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the search engine and its collaborators.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was configured for a provider that needs one.
    #[error("API key missing: set OPENAI_API_KEY or RGATHER_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name as configured.
        name: String,
    },

    /// The provider rejected or failed a request.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when the provider reported one.
        status: Option<u16>,
    },

    /// An external call did not finish within its deadline.
    #[error("call timed out after {:.1}s", timeout.as_secs_f64())]
    Timeout {
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// A model response could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// What went wrong.
        message: String,
        /// The raw response content.
        content: String,
    },

    /// A parsed response violated the expected schema.
    #[error("response failed validation: {message}")]
    Validation {
        /// The first violated rule.
        message: String,
    },

    /// Both the live and the fallback answering paths failed.
    #[error("answering unavailable for {query:?}: live: {live}; fallback: {fallback}")]
    AnsweringUnavailable {
        /// The query that could not be answered.
        query: String,
        /// Failure of the live path.
        live: String,
        /// Failure of the fallback path.
        fallback: String,
    },

    /// Extraction exhausted its retries. Logged, then replaced by an
    /// empty collection.
    #[error("extraction degraded: {message}")]
    ExtractionDegraded {
        /// Last underlying failure.
        message: String,
    },

    /// Completeness evaluation failed. Logged, then replaced by the
    /// conservative fallback evaluation.
    #[error("evaluation degraded: {message}")]
    EvaluationDegraded {
        /// Last underlying failure.
        message: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {field}: {reason}")]
    ConfigurationInvalid {
        /// Offending option.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The query itself is unusable (empty or oversized).
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Why the query was rejected.
        message: String,
    },

    /// A branch task died before reporting a result.
    #[error("orchestration error: {message}")]
    Orchestration {
        /// What went wrong.
        message: String,
    },

    /// The session was cancelled before the root query was dispatched.
    #[error("search cancelled")]
    Cancelled,
}

impl AgentError {
    /// Returns `true` for transient failures worth another attempt.
    ///
    /// Credential, provider-selection, configuration and cancellation
    /// errors are permanent.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ApiRequest { .. }
                | Self::Timeout { .. }
                | Self::ResponseParse { .. }
                | Self::Validation { .. }
        )
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A command failed while running.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}
