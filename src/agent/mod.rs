//! Recursive search engine for rgather.
//!
//! Answers a query through an LLM, extracts entities from the answer,
//! judges coverage, and recurses into bounded follow-up queries. All
//! external calls go through narrow collaborator traits, so the control
//! loop can be driven by real providers or by test doubles.
//!
//! # Architecture
//!
//! ```text
//! User query → RecursiveOrchestrator
//!   ├── AnsweringClient (live path, then one fallback attempt)
//!   ├── ExtractionClient ∥ CompletenessEvaluator (same answer text)
//!   ├── Follow-ups → up to N child nodes at depth + 1
//!   │   └── each child repeats the cycle until max_depth
//!   └── EntityMerger (once, over the finished tree) → MergedEntitySet
//! ```

pub mod answering;
pub mod client;
pub mod config;
pub mod evaluator;
pub mod extraction;
pub mod merger;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types
pub use answering::{AnswerAgent, AnswerOptions, AnsweringClient, LlmAnsweringClient};
pub use client::create_provider;
pub use config::{SearchConfig, SearchConfigBuilder};
pub use evaluator::{CompletenessEvaluator, EvaluatorAgent, LlmCompletenessEvaluator};
pub use extraction::{ExtractionAgent, ExtractionClient, LlmExtractionClient};
pub use merger::EntityMerger;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{RecursiveOrchestrator, plan_follow_ups};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use retry::{RetryPolicy, with_timeout};
pub use traits::{Agent, AgentResponse};
