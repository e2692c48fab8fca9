//! Process exit codes, stable across releases so scripts can branch on them.

use crate::error::ErrorCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GuardFailed,
    GateTimedOut,
    ManualExit,
    MaxIterationsReached,
    CheckpointError,
    AuditError,
    TrackerError,
    LlmError,
    ConfigError,
    IoError,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::GuardFailed => 10,
            ExitCode::GateTimedOut => 11,
            ExitCode::ManualExit => 12,
            ExitCode::MaxIterationsReached => 13,
            ExitCode::CheckpointError => 20,
            ExitCode::AuditError => 21,
            ExitCode::TrackerError => 22,
            ExitCode::LlmError => 23,
            ExitCode::ConfigError => 24,
            ExitCode::IoError => 25,
        }
    }

    #[must_use]
    pub fn from_category(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Guard => ExitCode::GuardFailed,
            ErrorCategory::Gate => ExitCode::GateTimedOut,
            ErrorCategory::Checkpoint => ExitCode::CheckpointError,
            ErrorCategory::Audit => ExitCode::AuditError,
            ErrorCategory::Tracker => ExitCode::TrackerError,
            ErrorCategory::Llm => ExitCode::LlmError,
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }

    /// Map a routed `error_message` prefix (see the error taxonomy) to an
    /// exit code, for the terminal route's final report.
    #[must_use]
    pub fn from_error_message(msg: &str) -> Self {
        if msg.starts_with("GUARD:") {
            ExitCode::GuardFailed
        } else if msg.starts_with("MANUAL:") {
            ExitCode::ManualExit
        } else if msg.starts_with("MAX_ITERATIONS_REACHED:") {
            ExitCode::MaxIterationsReached
        } else if msg.starts_with("TIMEOUT:") {
            ExitCode::GateTimedOut
        } else if msg.starts_with("API_ERROR:") {
            ExitCode::LlmError
        } else if msg.starts_with("SLUG_COLLISION") {
            ExitCode::AuditError
        } else {
            ExitCode::IoError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_prefixes() {
        assert_eq!(ExitCode::from_error_message("GUARD: draft empty").as_i32(), 10);
        assert_eq!(ExitCode::from_error_message("MAX_ITERATIONS_REACHED:20").as_i32(), 13);
        assert_eq!(ExitCode::from_error_message("SLUG_COLLISION").as_i32(), 21);
    }
}
