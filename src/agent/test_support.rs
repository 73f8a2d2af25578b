//! Scripted provider used by the adapter unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use super::provider::LlmProvider;
use crate::error::AgentError;

/// Replays queued replies in order; once the queue is empty every call
/// fails with a transient error. Records the model of each request.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, AgentError>>>,
    models: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, AgentError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            models: Mutex::new(Vec::new()),
        }
    }

    pub fn ok(content: &str) -> Result<String, AgentError> {
        Ok(content.to_string())
    }

    pub fn fail() -> Result<String, AgentError> {
        Err(AgentError::ApiRequest {
            message: "scripted failure".to_string(),
            status: Some(500),
        })
    }

    pub fn calls(&self) -> usize {
        self.models.lock().map_or(0, |m| m.len())
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        if let Ok(mut models) = self.models.lock() {
            models.push(request.model.clone());
        }
        let next = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(Self::fail);
        next.map(|content| ChatResponse {
            content,
            ..ChatResponse::default()
        })
    }
}
