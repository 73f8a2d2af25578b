//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// rgather: recursive entity gathering with LLM follow-up queries.
///
/// Answers a query, extracts entities from the answer, asks follow-up
/// questions where coverage is thin, and prints one deduplicated entity set.
#[derive(Parser, Debug)]
#[command(name = "rgather")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (debug logging on stderr).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a recursive search session and print the merged entities.
    ///
    /// Requires `OPENAI_API_KEY` (or `RGATHER_API_KEY`). Press Ctrl-C to stop
    /// dispatching new queries; results gathered so far are still printed.
    #[command(after_help = r#"Examples:
  rgather search "European solar panel manufacturers" --entity-type company
  rgather search "rust web frameworks" --max-depth 1 --max-queries-per-level 5
  rgather search "open source databases" --sequential --tree
  rgather --format json search "LLM benchmarks" | jq '.entities[].name'
"#)]
    Search {
        /// The query to research.
        query: String,

        /// Entity type to extract from every answer.
        #[arg(short, long)]
        entity_type: Option<String>,

        /// Maximum recursion depth (root = 0).
        #[arg(short = 'd', long, allow_negative_numbers = true)]
        max_depth: Option<i64>,

        /// Follow-up queries kept per node; extras are dropped.
        #[arg(short = 'q', long, allow_negative_numbers = true)]
        max_queries_per_level: Option<i64>,

        /// Run sibling branches one after another instead of concurrently.
        #[arg(long)]
        sequential: bool,

        /// Session-wide cap on queries doing external calls at once.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Timeout for each external call, in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Answer length limit, in tokens.
        #[arg(long)]
        max_output_tokens: Option<u32>,

        /// Maximum attempts per external call.
        #[arg(long)]
        max_retries: Option<u32>,

        /// Model for the live answering path.
        #[arg(long)]
        answer_model: Option<String>,

        /// Model for the fallback answering path.
        #[arg(long)]
        fallback_model: Option<String>,

        /// Model for entity extraction.
        #[arg(long)]
        extraction_model: Option<String>,

        /// Model for completeness evaluation.
        #[arg(long)]
        evaluator_model: Option<String>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,

        /// Also print the query tree (text output only).
        #[arg(long)]
        tree: bool,
    },

    /// Write the default prompt templates to disk for customization.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  rgather init-prompts                         # ~/.config/rgather/prompts/
  rgather init-prompts --dir ./prompts         # Custom directory
  rgather search "..." --prompt-dir ./prompts  # Use the edited prompts
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/rgather/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}
