//! Core data model for search sessions.
//!
//! These types live outside the `agent` module so the merger, the CLI and
//! external callers can share them without depending on provider code.

pub mod budget;
pub mod entity;
pub mod evaluation;
pub mod node;
pub mod tree;

pub use budget::{clip_to_budget, estimate_tokens};
pub use entity::{Attributes, EntityCollection, EntityRecord, MergedEntitySet, identity_key};
pub use evaluation::Evaluation;
pub use node::{QueryNode, RawAnswer, SourceKind};
pub use tree::{ResultTree, SearchOutcome, SessionStats};
