//! Core types for the LLM backend abstraction, adapted to a single
//! "prompt in, text out" contract — the engine never inspects tool calls or
//! multi-turn state beyond the messages it constructs itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use warden_utils::error::LlmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// One request to a drafter or reviewer backend.
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    pub role_label: String,
    pub model: String,
    pub timeout: Duration,
    pub messages: Vec<Message>,
}

impl LlmInvocation {
    #[must_use]
    pub fn new(role_label: impl Into<String>, model: impl Into<String>, timeout: Duration, messages: Vec<Message>) -> Self {
        Self { role_label: role_label.into(), model: model.into(), timeout, messages }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResult {
    pub raw_response: String,
    pub provider: String,
    pub model_used: String,
    pub timed_out: bool,
}

impl LlmResult {
    #[must_use]
    pub fn new(raw_response: impl Into<String>, provider: impl Into<String>, model_used: impl Into<String>) -> Self {
        Self { raw_response: raw_response.into(), provider: provider.into(), model_used: model_used.into(), timed_out: false }
    }
}

/// Implemented by every concrete LLM backend (drafter, reviewer, and test
/// fixtures). Callers construct a flat prompt; the backend returns raw text.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}
