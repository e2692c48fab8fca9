//! A backend that shells out to a configured CLI binary, feeding it a
//! flattened prompt on stdin and reading its full stdout as the response.
//! Used for both the drafter and the reviewer; only the binary name and
//! model argument differ.

use crate::types::{LlmBackend, LlmInvocation, LlmResult, Role};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use warden_utils::error::LlmError;

pub struct CliBackend {
    binary_path: String,
    provider: String,
}

impl CliBackend {
    /// Resolves `binary` on `PATH` via `which`, unless an absolute path is
    /// already given.
    pub fn new(binary: &str, provider: impl Into<String>) -> Result<Self, LlmError> {
        let binary_path = if std::path::Path::new(binary).is_absolute() {
            binary.to_string()
        } else {
            which::which(binary)
                .map_err(|e| LlmError::SpawnFailed { binary: binary.to_string(), reason: e.to_string() })?
                .to_string_lossy()
                .into_owned()
        };
        Ok(Self { binary_path, provider: provider.into() })
    }

    fn messages_to_prompt(messages: &[crate::types::Message]) -> String {
        let mut out = String::new();
        for m in messages {
            let prefix = match m.role {
                Role::System => "System:",
                Role::User => "User:",
                Role::Assistant => "Assistant:",
            };
            out.push_str(prefix);
            out.push('\n');
            out.push_str(&m.content);
            out.push_str("\n\n");
        }
        out
    }
}

#[async_trait]
impl LlmBackend for CliBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let prompt = Self::messages_to_prompt(&inv.messages);

        let mut child = Command::new(&self.binary_path)
            .arg("--model")
            .arg(&inv.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LlmError::SpawnFailed { binary: self.binary_path.clone(), reason: e.to_string() })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(LlmError::Io)?;
        }

        let output = match tokio::time::timeout(inv.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(LlmError::Io)?,
            Err(_) => {
                return Err(LlmError::TimedOut { secs: inv.timeout.as_secs() });
            }
        };

        if !output.status.success() {
            return Err(LlmError::BackendFailed {
                provider: self.provider.clone(),
                reason: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let raw_response = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if raw_response.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(LlmResult::new(raw_response, self.provider.clone(), inv.model))
    }
}

/// A backend used only in `mock_mode`: returns a fixed response without
/// spawning a process, so tests and offline runs exercise the graph without
/// external dependencies.
pub struct MockBackend {
    pub response: String,
}

#[async_trait]
impl LlmBackend for MockBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        Ok(LlmResult::new(self.response.clone(), "mock", inv.model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;
    use std::time::Duration;

    #[tokio::test]
    async fn mock_backend_returns_fixed_response() {
        let backend = MockBackend { response: "[x] **APPROVED**".into() };
        let inv = LlmInvocation::new("reviewer", "mock-model", Duration::from_secs(1), vec![Message::user("hi")]);
        let result = backend.invoke(inv).await.unwrap();
        assert_eq!(result.raw_response, "[x] **APPROVED**");
        assert_eq!(result.provider, "mock");
    }

    #[test]
    fn messages_to_prompt_includes_role_prefixes() {
        let msgs = vec![Message::system("be terse"), Message::user("draft this")];
        let prompt = CliBackend::messages_to_prompt(&msgs);
        assert!(prompt.contains("System:\nbe terse"));
        assert!(prompt.contains("User:\ndraft this"));
    }
}
