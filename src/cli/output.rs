//! Output rendering for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::core::{EntityRecord, MergedEntitySet, ResultTree, SearchOutcome, SessionStats};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognized means text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    ///
    /// Serialization of the crate's own types cannot fail; an error object
    /// is emitted if it ever does.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!("{{\"error\": \"serialization failed: {e}\"}}"))
    }
}

/// Renders a search session as text.
#[must_use]
pub fn format_outcome(outcome: &SearchOutcome, entity_type: &str, show_tree: bool) -> String {
    let mut output = format_entities(&outcome.entities, entity_type);
    if show_tree {
        output.push_str("\nQuery tree:\n");
        format_tree_into(&mut output, &outcome.tree);
    }
    output.push_str(&format_stats(&outcome.stats));
    output
}

/// Renders the merged entity set.
#[must_use]
pub fn format_entities(entities: &MergedEntitySet, entity_type: &str) -> String {
    if entities.is_empty() {
        return format!("No {entity_type} entities found.\n");
    }

    let mut output = format!("Found {} {entity_type} entities:\n\n", entities.len());
    for (idx, entity) in entities.iter().enumerate() {
        format_entity_into(&mut output, idx + 1, entity);
    }
    output
}

fn format_entity_into(output: &mut String, position: usize, entity: &EntityRecord) {
    let _ = writeln!(output, "{position:>3}. {}", entity.name);
    for (key, value) in &entity.attributes {
        let rendered = value
            .as_str()
            .map_or_else(|| value.to_string(), ToString::to_string);
        let _ = writeln!(output, "       {key}: {rendered}");
    }
    if let Some(source) = &entity.source {
        let _ = writeln!(output, "       source: {source}");
    }
}

fn format_tree_into(output: &mut String, tree: &ResultTree) {
    let indent = "  ".repeat(tree.node.depth + 1);
    let status = match (&tree.error, &tree.answer) {
        (Some(error), _) => format!("failed: {error}"),
        (None, Some(answer)) => format!(
            "{} entities, {} answer, {:.1}s",
            tree.entities.len(),
            answer.source_kind,
            answer.elapsed_time.as_secs_f64()
        ),
        (None, None) => "no answer".to_string(),
    };
    let _ = writeln!(output, "{indent}- {} [{status}]", tree.node.query);
    for child in tree.children.values() {
        format_tree_into(output, child);
    }
}

/// Renders the stats footer.
#[must_use]
pub fn format_stats(stats: &SessionStats) -> String {
    format!(
        "\n---\nQueries: {} ({} failed, {} fallback) | Depth: {} | Entities: {} extracted, {} merged | Time: {:.1}s\n",
        stats.nodes_dispatched,
        stats.nodes_failed,
        stats.fallback_answers,
        stats.max_depth_reached,
        stats.entities_extracted,
        stats.entities_merged,
        stats.elapsed.as_secs_f64()
    )
}
