//! # rgather
//!
//! Recursive information gathering and entity consolidation.
//!
//! Given a natural-language query, rgather obtains a narrative answer from
//! an LLM, extracts structured entities from it, judges whether the answer
//! covers the query, and if not recurses into bounded follow-up queries.
//! Entities found anywhere in the resulting tree are merged into one
//! deduplicated set.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rgather::agent::{RecursiveOrchestrator, SearchConfig, create_provider};
//!
//! # async fn run() -> Result<(), rgather::AgentError> {
//! let config = SearchConfig::builder()
//!     .entity_type("company")
//!     .max_depth(1)
//!     .from_env()
//!     .build()?;
//! let provider = create_provider(&config)?;
//! let orchestrator = RecursiveOrchestrator::from_provider(Arc::from(provider), config)?;
//!
//! let outcome = orchestrator.search("European solar panel manufacturers").await?;
//! for entity in &outcome.entities {
//!     println!("{}", entity.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;

pub use agent::{
    AnsweringClient, CompletenessEvaluator, EntityMerger, ExtractionClient, RecursiveOrchestrator,
    SearchConfig,
};
pub use crate::core::{
    EntityCollection, EntityRecord, Evaluation, MergedEntitySet, QueryNode, RawAnswer,
    ResultTree, SearchOutcome, SessionStats, SourceKind,
};
pub use error::{AgentError, CommandError, Error, Result};
