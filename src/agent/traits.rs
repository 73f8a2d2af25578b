//! Agent trait definition.
//!
//! All agents (answer, extraction, evaluator) implement this trait,
//! which provides a uniform way to turn a user message into a request.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse, TokenUsage, system_message, user_message};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

impl AgentResponse {
    /// Returns `true` if the model hit its token limit.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some("length")
    }
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (answering, extraction, evaluation)
/// with a fixed system prompt and model configuration. The collaborator
/// adapters call [`Agent::execute`] to run the agent against a provider.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Builds the request sent for `user_msg`.
    fn request(&self, user_msg: &str) -> ChatRequest {
        ChatRequest {
            model: self.model().to_string(),
            messages: vec![system_message(self.system_prompt()), user_message(user_msg)],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
        }
    }

    /// Executes the agent with the given user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = self.request(user_msg);
        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}

/// Strips the wrappers models like to put around JSON.
///
/// Handles markdown code fences and leading/trailing prose by cutting from
/// the first `{` to the last `}` when the content is not already a bare
/// object.
pub(crate) fn json_payload(content: &str) -> &str {
    let trimmed = content.trim();

    let unfenced = if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    };

    if unfenced.starts_with('{') && unfenced.ends_with('}') {
        return unfenced;
    }

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoAgent;

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-model"
        }

        fn system_prompt(&self) -> &str {
            "repeat"
        }
    }

    #[test]
    fn test_default_request() {
        let request = EchoAgent.request("hello");
        assert_eq!(request.model, "echo-model");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].content, "hello");
        assert_eq!(request.max_tokens, Some(2048));
        assert!(!request.json_mode);
    }

    #[test]
    fn test_json_payload_bare() {
        assert_eq!(json_payload(r#" {"a": 1} "#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_json_payload_fenced() {
        assert_eq!(json_payload("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(json_payload("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_json_payload_with_prose() {
        let content = "Here is the result:\n{\"a\": {\"b\": 2}}\nHope this helps.";
        assert_eq!(json_payload(content), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn test_json_payload_without_object() {
        assert_eq!(json_payload("not json"), "not json");
    }

    #[test]
    fn test_truncated() {
        let response = AgentResponse {
            content: String::new(),
            usage: TokenUsage::default(),
            finish_reason: Some("length".to_string()),
        };
        assert!(response.truncated());
    }
}
