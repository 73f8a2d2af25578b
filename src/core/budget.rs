//! Token-budget estimation.
//!
//! A character-count heuristic (about four characters per token) is close
//! enough for keeping prompts inside a model's context window without
//! pulling in a tokenizer. Pure functions, no I/O.

/// Approximate characters per token for English prose.
pub const CHARS_PER_TOKEN: usize = 4;

/// Estimates the number of tokens in `text`.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Returns the longest prefix of `text` that fits in `max_tokens`.
///
/// Cuts on a char boundary. `max_tokens == 0` means "no limit".
#[must_use]
pub fn clip_to_budget(text: &str, max_tokens: usize) -> &str {
    if max_tokens == 0 {
        return text;
    }
    let max_chars = max_tokens.saturating_mul(CHARS_PER_TOKEN);
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_clip_within_budget_is_identity() {
        let text = "short text";
        assert_eq!(clip_to_budget(text, 100), text);
        assert_eq!(clip_to_budget(text, 0), text);
    }

    #[test]
    fn test_clip_truncates() {
        let text = "x".repeat(100);
        let clipped = clip_to_budget(&text, 5);
        assert_eq!(clipped.len(), 20);
        assert!(estimate_tokens(clipped) <= 5);
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        let text = "é".repeat(10);
        let clipped = clip_to_budget(&text, 1);
        assert_eq!(clipped.chars().count(), 4);
        assert_eq!(clipped, "éééé");
    }
}
