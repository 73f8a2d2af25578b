//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent::client::create_provider;
use crate::agent::config::SearchConfig;
use crate::agent::orchestrator::RecursiveOrchestrator;
use crate::agent::prompt::PromptSet;
use crate::cli::output::{OutputFormat, format_outcome};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};

/// Parameters for the search command.
#[derive(Debug, Clone, Default)]
pub struct SearchCommandParams<'a> {
    /// The query to research.
    pub query: &'a str,
    /// Entity type to extract.
    pub entity_type: Option<&'a str>,
    /// Maximum recursion depth.
    pub max_depth: Option<i64>,
    /// Follow-up queries kept per node.
    pub max_queries_per_level: Option<i64>,
    /// Run siblings one after another.
    pub sequential: bool,
    /// Session-wide concurrency cap.
    pub concurrency: Option<usize>,
    /// Per-call timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Answer length limit in tokens.
    pub max_output_tokens: Option<u32>,
    /// Attempts per external call.
    pub max_retries: Option<u32>,
    /// Live answering model.
    pub answer_model: Option<&'a str>,
    /// Fallback answering model.
    pub fallback_model: Option<&'a str>,
    /// Extraction model.
    pub extraction_model: Option<&'a str>,
    /// Evaluator model.
    pub evaluator_model: Option<&'a str>,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
    /// Print the query tree.
    pub show_tree: bool,
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Search {
            query,
            entity_type,
            max_depth,
            max_queries_per_level,
            sequential,
            concurrency,
            timeout,
            max_output_tokens,
            max_retries,
            answer_model,
            fallback_model,
            extraction_model,
            evaluator_model,
            prompt_dir,
            tree,
        } => {
            let params = SearchCommandParams {
                query,
                entity_type: entity_type.as_deref(),
                max_depth: *max_depth,
                max_queries_per_level: *max_queries_per_level,
                sequential: *sequential,
                concurrency: *concurrency,
                timeout_secs: *timeout,
                max_output_tokens: *max_output_tokens,
                max_retries: *max_retries,
                answer_model: answer_model.as_deref(),
                fallback_model: fallback_model.as_deref(),
                extraction_model: extraction_model.as_deref(),
                evaluator_model: evaluator_model.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
                show_tree: *tree,
            };
            cmd_search(&params, format)
        }
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds the session configuration: CLI flags, then environment, then
/// defaults.
///
/// # Errors
///
/// Returns [`CommandError::ExecutionFailed`] when a value is out of range.
pub fn build_search_config(params: &SearchCommandParams<'_>) -> Result<SearchConfig> {
    let mut builder = SearchConfig::builder();
    if let Some(entity_type) = params.entity_type {
        builder = builder.entity_type(entity_type);
    }
    if let Some(depth) = params.max_depth {
        builder = builder.max_depth(depth);
    }
    if let Some(n) = params.max_queries_per_level {
        builder = builder.max_queries_per_level(n);
    }
    if params.sequential {
        builder = builder.parallel(false);
    }
    if let Some(n) = params.concurrency {
        builder = builder.global_concurrency_limit(n);
    }
    if let Some(secs) = params.timeout_secs {
        builder = builder.per_call_timeout(Duration::from_secs(secs));
    }
    if let Some(tokens) = params.max_output_tokens {
        builder = builder.max_output_length(tokens);
    }
    if let Some(n) = params.max_retries {
        builder = builder.max_retries(n);
    }
    if let Some(model) = params.answer_model {
        builder = builder.answer_model(model);
    }
    if let Some(model) = params.fallback_model {
        builder = builder.fallback_model(model);
    }
    if let Some(model) = params.extraction_model {
        builder = builder.extraction_model(model);
    }
    if let Some(model) = params.evaluator_model {
        builder = builder.evaluator_model(model);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    builder
        .from_env()
        .build()
        .map_err(|e| CommandError::ExecutionFailed(format!("Search configuration error: {e}")).into())
}

fn cmd_search(params: &SearchCommandParams<'_>, format: OutputFormat) -> Result<String> {
    // Configuration problems surface before any provider is touched.
    let config = build_search_config(params)?;

    let provider = create_provider(&config).map_err(|e| {
        CommandError::ExecutionFailed(format!("Provider creation failed: {e}"))
    })?;

    let entity_type = config.entity_type.clone();
    let orchestrator = RecursiveOrchestrator::from_provider(Arc::from(provider), config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Search configuration error: {e}")))?;

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    let result = rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, waiting for in-flight queries");
                on_interrupt.cancel();
            }
        });
        orchestrator.search_with_cancel(params.query, cancel).await
    });

    let outcome =
        result.map_err(|e| CommandError::ExecutionFailed(format!("Search failed: {e}")))?;

    match format {
        OutputFormat::Text => Ok(format_outcome(&outcome, &entity_type, params.show_tree)),
        OutputFormat::Json => serde_json::to_string_pretty(&outcome).map_err(|e| {
            CommandError::OutputFormat(format!("JSON serialization failed: {e}")).into()
        }),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                output.push_str("  ");
                output.push_str(
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown"),
                );
                output.push('\n');
            }
            output.push_str("\nEdit these files to customize agent system prompts.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_build_search_config_from_flags() {
        let params = SearchCommandParams {
            query: "q",
            entity_type: Some("company"),
            max_depth: Some(1),
            max_queries_per_level: Some(2),
            sequential: true,
            concurrency: Some(4),
            timeout_secs: Some(5),
            ..SearchCommandParams::default()
        };
        let config = build_search_config(&params).unwrap_or_else(|_| unreachable!());
        assert_eq!(config.entity_type, "company");
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.max_queries_per_level, 2);
        assert!(!config.parallel);
        assert_eq!(config.global_concurrency_limit, 4);
        assert_eq!(config.per_call_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_negative_depth_is_configuration_error() {
        let params = SearchCommandParams {
            query: "q",
            max_depth: Some(-1),
            ..SearchCommandParams::default()
        };
        let err = build_search_config(&params).err();
        assert!(matches!(
            err,
            Some(Error::Command(CommandError::ExecutionFailed(ref msg))) if msg.contains("invalid configuration")
        ));
    }

    #[test]
    fn test_init_prompts_text_then_idempotent() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(first.contains("Wrote 3 prompt template(s)"));
        assert!(first.contains("answer.md"));

        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Json)
            .unwrap_or_else(|_| unreachable!());
        let parsed: serde_json::Value =
            serde_json::from_str(&second).unwrap_or_else(|_| unreachable!());
        assert_eq!(parsed["count"], 0);
    }
}
