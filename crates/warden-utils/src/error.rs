//! Error taxonomy for the governance engine.
//!
//! Every concern gets its own `thiserror` enum; [`GovernanceError`] wraps them
//! all so callers that cross module boundaries (the CLI, the orchestrator) can
//! match on a single type. [`UserFriendlyError`] is implemented on the
//! top-level enum to separate the machine-readable variant from the
//! human-facing message a terminal user actually wants to read.

use std::fmt;

/// Broad bucket used to group errors for reporting and exit-code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Guard,
    Gate,
    Checkpoint,
    Audit,
    Tracker,
    Llm,
    Config,
    Io,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Guard => "guard",
            ErrorCategory::Gate => "gate",
            ErrorCategory::Checkpoint => "checkpoint",
            ErrorCategory::Audit => "audit",
            ErrorCategory::Tracker => "tracker",
            ErrorCategory::Llm => "llm",
            ErrorCategory::Config => "config",
            ErrorCategory::Io => "io",
        };
        write!(f, "{s}")
    }
}

/// Gives an error a human-facing message, optional extra context, and
/// actionable suggestions, independent of its `Display` impl (which stays
/// terse for logs).
pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn context(&self) -> Option<String> {
        None
    }
    fn suggestions(&self) -> Vec<String> {
        Vec::new()
    }
    fn category(&self) -> ErrorCategory;
}

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("draft is empty")]
    EmptyDraft,
    #[error("draft exceeds size ceiling of {limit} bytes (got {actual})")]
    DraftTooLarge { limit: usize, actual: usize },
    #[error("required input '{field}' is missing")]
    MissingInput { field: String },
}

impl UserFriendlyError for GuardError {
    fn user_message(&self) -> String {
        match self {
            GuardError::EmptyDraft => "The draft artifact is empty.".into(),
            GuardError::DraftTooLarge { limit, actual } => {
                format!("The draft is {actual} bytes, which exceeds the {limit}-byte ceiling.")
            }
            GuardError::MissingInput { field } => format!("Missing required input: {field}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            GuardError::EmptyDraft => vec!["Re-run the drafting node or edit the artifact by hand before retrying.".into()],
            GuardError::DraftTooLarge { .. } => vec!["Split the artifact or raise the configured size ceiling.".into()],
            GuardError::MissingInput { field } => vec![format!("Provide '{field}' via the brief or CLI flags.")],
        }
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Guard
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("editor exited with non-zero status: {status}")]
    EditorFailed { status: i32 },
    #[error("no editor configured; set $EDITOR or warden.editor in config")]
    NoEditor,
    #[error("gate timed out after {secs}s waiting for human input")]
    TimedOut { secs: u64 },
    #[error("manual exit requested at gate '{node}'")]
    ManualExit { node: String },
}

impl UserFriendlyError for GateError {
    fn user_message(&self) -> String {
        match self {
            GateError::EditorFailed { status } => format!("The editor exited with status {status}."),
            GateError::NoEditor => "No editor is configured.".into(),
            GateError::TimedOut { secs } => format!("No response after {secs} seconds."),
            GateError::ManualExit { node } => format!("Exited manually at '{node}'. Re-run to resume from the same gate."),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            GateError::NoEditor => vec!["Set $EDITOR, or set [gate].editor in .governance/config.toml.".into()],
            GateError::TimedOut { .. } => vec!["Re-run with --resume; the checkpoint was not advanced.".into()],
            _ => Vec::new(),
        }
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Gate
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint store open failed at {path}: {reason}")]
    OpenFailed { path: String, reason: String },
    #[error("checkpoint for thread '{thread_id}' is corrupted: {reason}")]
    Corrupted { thread_id: String, reason: String },
    #[error("transaction failed for thread '{thread_id}': {reason}")]
    TransactionFailed { thread_id: String, reason: String },
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl UserFriendlyError for CheckpointError {
    fn user_message(&self) -> String {
        match self {
            CheckpointError::OpenFailed { path, .. } => format!("Could not open the checkpoint store at {path}."),
            CheckpointError::Corrupted { thread_id, .. } => {
                format!("The checkpoint for '{thread_id}' could not be read.")
            }
            CheckpointError::TransactionFailed { thread_id, .. } => {
                format!("Failed to persist a checkpoint for '{thread_id}'.")
            }
            CheckpointError::Serde(e) => format!("Checkpoint state could not be (de)serialized: {e}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            CheckpointError::OpenFailed { .. } => {
                vec!["Check filesystem permissions on .governance/, or set WARDEN_CHECKPOINT_DIR.".into()]
            }
            CheckpointError::Corrupted { .. } => {
                vec!["Delete the stale checkpoint row and restart the stage from its first node.".into()]
            }
            _ => Vec::new(),
        }
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Checkpoint
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit directory already has an active instance: {slug}")]
    SlugCollision { slug: String },
    #[error("failed to write audit entry {number:03}-{suffix}: {reason}")]
    WriteFailed { number: u32, suffix: String, reason: String },
    #[error("cannot promote '{active}' to done: destination '{done}' already exists")]
    DonePathExists { active: String, done: String },
    #[error("failed to commit audit lineage: {reason}")]
    CommitFailed { reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UserFriendlyError for AuditError {
    fn user_message(&self) -> String {
        match self {
            AuditError::SlugCollision { slug } => {
                format!("An active workflow instance already exists for '{slug}'.")
            }
            AuditError::WriteFailed { number, suffix, .. } => {
                format!("Could not write audit entry {number:03}-{suffix}.")
            }
            AuditError::DonePathExists { done, .. } => format!("Finalization target '{done}' already exists."),
            AuditError::CommitFailed { reason } => format!("Could not commit the audit lineage: {reason}"),
            AuditError::Io(e) => format!("Audit filesystem error: {e}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            AuditError::SlugCollision { .. } => {
                vec!["Resume the existing instance instead of starting a new one, or remove its active directory.".into()]
            }
            AuditError::DonePathExists { .. } => vec!["Inspect and clear the conflicting done directory before retrying.".into()],
            AuditError::CommitFailed { .. } => {
                vec!["Check that the repository has a working git checkout and commit the audit trail manually.".into()]
            }
            _ => Vec::new(),
        }
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Audit
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker authentication failed: {reason}")]
    AuthFailed { reason: String },
    #[error("issue #{number} not found in {repo}")]
    IssueNotFound { repo: String, number: u64 },
    #[error("failed to create label '{label}': {reason}")]
    LabelCreateFailed { label: String, reason: String },
    #[error("failed to file issue: {reason}")]
    IssueCreateFailed { reason: String },
    #[error("tracker call timed out after {secs}s")]
    TimedOut { secs: u64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UserFriendlyError for TrackerError {
    fn user_message(&self) -> String {
        match self {
            TrackerError::AuthFailed { .. } => "The tracker CLI is not authenticated.".into(),
            TrackerError::IssueNotFound { repo, number } => format!("Issue #{number} was not found in {repo}."),
            TrackerError::LabelCreateFailed { label, .. } => format!("Could not create label '{label}'."),
            TrackerError::IssueCreateFailed { .. } => "Could not file the issue.".into(),
            TrackerError::TimedOut { secs } => format!("The tracker did not respond within {secs}s."),
            TrackerError::Io(e) => format!("Tracker process error: {e}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            TrackerError::AuthFailed { .. } => vec!["Run `gh auth login` and re-run the sandbox check.".into()],
            _ => Vec::new(),
        }
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Tracker
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("failed to spawn LLM backend '{binary}': {reason}")]
    SpawnFailed { binary: String, reason: String },
    #[error("LLM backend '{provider}' returned non-zero exit: {reason}")]
    BackendFailed { provider: String, reason: String },
    #[error("LLM call timed out after {secs}s")]
    TimedOut { secs: u64 },
    #[error("LLM returned empty response")]
    EmptyResponse,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            LlmError::SpawnFailed { binary, .. } => format!("Could not start the LLM backend binary '{binary}'."),
            LlmError::BackendFailed { provider, .. } => format!("The '{provider}' backend failed."),
            LlmError::TimedOut { secs } => format!("The LLM call did not return within {secs}s."),
            LlmError::EmptyResponse => "The LLM returned an empty response.".into(),
            LlmError::Io(e) => format!("LLM process I/O error: {e}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            LlmError::SpawnFailed { binary, .. } => vec![format!("Confirm '{binary}' is installed and on PATH.")],
            LlmError::TimedOut { .. } => vec!["Re-run with --resume; no state was lost.".into()],
            _ => Vec::new(),
        }
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Llm
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file at {path} is not valid TOML: {reason}")]
    InvalidToml { path: String, reason: String },
    #[error("config field '{field}' has an invalid value: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            ConfigError::InvalidToml { path, .. } => format!("{path} could not be parsed as TOML."),
            ConfigError::InvalidValue { field, .. } => format!("Config field '{field}' is invalid."),
            ConfigError::Io(e) => format!("Could not read configuration: {e}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        vec!["Check .governance/config.toml against the documented schema.".into()]
    }
    fn category(&self) -> ErrorCategory {
        ErrorCategory::Config
    }
}

/// Top-level error type crossing module boundaries.
#[derive(Debug, thiserror::Error)]
pub enum GovernanceError {
    #[error(transparent)]
    Guard(#[from] GuardError),
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
    #[error(transparent)]
    Audit(#[from] AuditError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UserFriendlyError for GovernanceError {
    fn user_message(&self) -> String {
        match self {
            GovernanceError::Guard(e) => e.user_message(),
            GovernanceError::Gate(e) => e.user_message(),
            GovernanceError::Checkpoint(e) => e.user_message(),
            GovernanceError::Audit(e) => e.user_message(),
            GovernanceError::Tracker(e) => e.user_message(),
            GovernanceError::Llm(e) => e.user_message(),
            GovernanceError::Config(e) => e.user_message(),
            GovernanceError::Io(e) => format!("I/O error: {e}"),
        }
    }
    fn suggestions(&self) -> Vec<String> {
        match self {
            GovernanceError::Guard(e) => e.suggestions(),
            GovernanceError::Gate(e) => e.suggestions(),
            GovernanceError::Checkpoint(e) => e.suggestions(),
            GovernanceError::Audit(e) => e.suggestions(),
            GovernanceError::Tracker(e) => e.suggestions(),
            GovernanceError::Llm(e) => e.suggestions(),
            GovernanceError::Config(e) => e.suggestions(),
            GovernanceError::Io(_) => Vec::new(),
        }
    }
    fn category(&self) -> ErrorCategory {
        match self {
            GovernanceError::Guard(e) => e.category(),
            GovernanceError::Gate(e) => e.category(),
            GovernanceError::Checkpoint(e) => e.category(),
            GovernanceError::Audit(e) => e.category(),
            GovernanceError::Tracker(e) => e.category(),
            GovernanceError::Llm(e) => e.category(),
            GovernanceError::Config(e) => e.category(),
            GovernanceError::Io(_) => ErrorCategory::Io,
        }
    }
}
