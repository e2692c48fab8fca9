//! Fixtures shared across the end-to-end scenario tests: a scripted LLM
//! backend that hands out canned responses in order, and an interaction
//! fixture that drives the human gates without touching a real editor.

use async_trait::async_trait;
use camino::Utf8Path;
use std::collections::VecDeque;
use std::sync::Mutex;
use warden_gate::{GateOption, Interaction};
use warden_llm::{LlmBackend, LlmInvocation, LlmResult};
use warden_utils::error::{GateError, LlmError};

/// Returns each response in order, repeating the last one once exhausted so
/// a test doesn't need to predict exactly how many times a node re-invokes
/// the backend.
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedBackend {
    pub fn new(responses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { responses: Mutex::new(responses.into_iter().map(Into::into).collect()) }
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let mut queue = self.responses.lock().unwrap();
        let next = if queue.len() > 1 { queue.pop_front().unwrap() } else { queue.front().cloned().unwrap_or_default() };
        Ok(LlmResult::new(next, "scripted", inv.model))
    }
}

/// A gate interaction fixture whose choice is fixed for the life of the
/// test. Used under `GateMode::BlockingEdit`, where the choice is actually
/// consulted (under `Automatic` it is never called at all).
pub struct FixedChoiceInteraction {
    pub choice: GateOption,
    pub feedback: Option<String>,
}

impl Interaction for FixedChoiceInteraction {
    fn open_and_wait(&self, _path: &Utf8Path, _timeout_secs: u64) -> Result<(), GateError> {
        Ok(())
    }

    fn open_non_blocking(&self, _path: &Utf8Path) -> Result<(), GateError> {
        Ok(())
    }

    fn prompt_choice(&self) -> Result<(GateOption, Option<String>), GateError> {
        Ok((self.choice, self.feedback.clone()))
    }
}
