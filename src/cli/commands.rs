//! One function per subcommand: load configuration, assemble the backends
//! and interaction for the requested mode, build the stage graph, and drive
//! it to a `RunOutcome`.

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use warden_audit::AuditDir;
use warden_checkpoint::CheckpointStore;
use warden_config::Config;
use warden_editor::ProcessInteraction;
use warden_gate::{GateMode, Interaction};
use warden_llm::backend::{CliBackend, MockBackend};
use warden_llm::LlmBackend;
use warden_phase_api::{NodeContext, WorkflowState};
use warden_tracker::TrackerClient;
use warden_utils::error::GovernanceError;

use super::CliContext;

/// What the CLI prints after a run, independent of the exit code mapping
/// (which `cli::run` derives from `error_message` separately).
pub(crate) struct CommandOutcome {
    pub error_message: Option<String>,
    pub final_url: Option<String>,
}

impl From<&WorkflowState> for CommandOutcome {
    fn from(state: &WorkflowState) -> Self {
        Self { error_message: state.error_message.clone(), final_url: state.final_url.clone() }
    }
}

fn slugify(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let mut slug = String::with_capacity(lower.len());
    let mut last_was_dash = false;
    for c in lower.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    slug.trim_matches('-').to_string()
}

fn gate_mode(auto: bool) -> GateMode {
    if auto {
        GateMode::Automatic
    } else {
        GateMode::NonBlockingOpen
    }
}

fn interaction(auto: bool, editor: Option<String>) -> Arc<dyn Interaction> {
    if auto {
        Arc::new(AutoInteraction)
    } else {
        Arc::new(ProcessInteraction::new(editor))
    }
}

/// Used under `--auto`: never touches an editor or stdin, always proceeds.
struct AutoInteraction;

impl Interaction for AutoInteraction {
    fn open_and_wait(&self, _path: &camino::Utf8Path, _timeout_secs: u64) -> Result<(), warden_utils::error::GateError> {
        Ok(())
    }
    fn open_non_blocking(&self, _path: &camino::Utf8Path) -> Result<(), warden_utils::error::GateError> {
        Ok(())
    }
    fn prompt_choice(&self) -> Result<(warden_gate::GateOption, Option<String>), warden_utils::error::GateError> {
        Ok((warden_gate::GateOption::Proceed, None))
    }
}

fn drafter_backend(mock: bool, config: &Config) -> Result<Arc<dyn LlmBackend>, GovernanceError> {
    if mock {
        Ok(Arc::new(MockBackend { response: String::new() }))
    } else {
        Ok(Arc::new(CliBackend::new(&config.drafter_binary, "drafter")?))
    }
}

fn reviewer_backend(mock: bool, config: &Config) -> Result<Arc<dyn LlmBackend>, GovernanceError> {
    if mock {
        Ok(Arc::new(MockBackend { response: String::new() }))
    } else {
        Ok(Arc::new(CliBackend::new(&config.reviewer_binary, "reviewer")?))
    }
}

fn node_context(config: &Config) -> NodeContext {
    NodeContext { config: std::collections::HashMap::new(), draft_size_ceiling_bytes: config.draft_size_ceiling_bytes }
}

pub(crate) async fn run_issue(ctx: &CliContext, brief: Utf8PathBuf, resume: bool) -> Result<CommandOutcome, GovernanceError> {
    let config = Config::discover(ctx.config_path.as_deref(), &ctx.repo_root)?;
    let checkpoint = Arc::new(CheckpointStore::open(Some(ctx.repo_root.as_path()), "issue")?);

    let stem = brief.file_stem().unwrap_or("brief").to_string();
    let slug = slugify(&stem);
    let thread_id = format!("{slug}-issue");

    let mut state = match checkpoint.load(&thread_id)? {
        Some(loaded) if resume => loaded,
        _ => {
            let mut fresh = WorkflowState::new("issue", slug.clone());
            fresh.source_path = Some(brief);
            fresh.repo_root = Some(ctx.repo_root.clone());
            fresh.mock_mode = ctx.mock;
            fresh.auto_mode = ctx.auto;
            fresh
        }
    };

    let active_parent = ctx.repo_root.join(".governance").join("issue").join("active");
    let done_parent = ctx.repo_root.join(".governance").join("issue").join("done");
    std::fs::create_dir_all(active_parent.as_std_path())?;

    let audit = Arc::new(AuditDir::open(&active_parent, &slug));
    let tracker = Arc::new(TrackerClient::new(tracker_repo(&ctx.repo_root), Duration::from_secs(config.tracker_timeout_secs)));

    let (graph, entry) = warden_orchestrator::issue::build(
        active_parent,
        done_parent,
        ctx.repo_root.clone(),
        drafter_backend(ctx.mock, &config)?,
        reviewer_backend(ctx.mock, &config)?,
        "default".to_string(),
        config.llm_timeout_secs,
        config.max_iterations,
        interaction(ctx.auto, config.editor.clone()),
        gate_mode(ctx.auto),
        config.editor_timeout_secs,
        tracker,
        checkpoint.clone(),
        audit,
    );

    let entry_node = state.next_node.take().unwrap_or_else(|| entry.to_string());
    let node_ctx = node_context(&config);
    warden_engine::graph::run(&graph, &entry_node, &node_ctx, &checkpoint, &mut state).await?;

    Ok(CommandOutcome::from(&state))
}

pub(crate) async fn run_lld(ctx: &CliContext, issue_number: u64, resume: bool) -> Result<CommandOutcome, GovernanceError> {
    let config = Config::discover(ctx.config_path.as_deref(), &ctx.repo_root)?;
    let checkpoint = Arc::new(CheckpointStore::open(Some(ctx.repo_root.as_path()), "lld")?);

    let slug = format!("issue-{issue_number}");
    let thread_id = format!("{issue_number}-lld");

    let mut state = match checkpoint.load(&thread_id)? {
        Some(loaded) if resume => loaded,
        _ => {
            let mut fresh = WorkflowState::new("lld", slug.clone());
            fresh.repo_root = Some(ctx.repo_root.clone());
            fresh.mock_mode = ctx.mock;
            fresh.auto_mode = ctx.auto;
            fresh
        }
    };

    let active_parent = ctx.repo_root.join(".governance").join("lld").join("active");
    let done_parent = ctx.repo_root.join(".governance").join("lld").join("done");
    let lld_active_dir = ctx.repo_root.join("docs").join("lld");
    std::fs::create_dir_all(active_parent.as_std_path())?;
    std::fs::create_dir_all(lld_active_dir.as_std_path())?;

    let audit = Arc::new(AuditDir::open(&active_parent, &slug));
    let tracker = Arc::new(TrackerClient::new(tracker_repo(&ctx.repo_root), Duration::from_secs(config.tracker_timeout_secs)));

    let (graph, entry) = warden_orchestrator::lld::build(
        active_parent,
        done_parent,
        ctx.repo_root.clone(),
        lld_active_dir,
        issue_number,
        drafter_backend(ctx.mock, &config)?,
        reviewer_backend(ctx.mock, &config)?,
        "default".to_string(),
        config.llm_timeout_secs,
        config.max_iterations,
        interaction(ctx.auto, config.editor.clone()),
        gate_mode(ctx.auto),
        config.editor_timeout_secs,
        tracker,
        checkpoint.clone(),
        audit,
    );

    let entry_node = state.next_node.take().unwrap_or_else(|| entry.to_string());
    let node_ctx = node_context(&config);
    warden_engine::graph::run(&graph, &entry_node, &node_ctx, &checkpoint, &mut state).await?;

    Ok(CommandOutcome::from(&state))
}

pub(crate) async fn run_impl(ctx: &CliContext, issue_number: u64, resume: bool, test_command: String) -> Result<CommandOutcome, GovernanceError> {
    let config = Config::discover(ctx.config_path.as_deref(), &ctx.repo_root)?;
    let checkpoint = Arc::new(CheckpointStore::open(Some(ctx.repo_root.as_path()), "impl")?);

    let slug = format!("issue-{issue_number}");
    let thread_id = format!("{issue_number}-impl");

    let mut state = match checkpoint.load(&thread_id)? {
        Some(loaded) if resume => loaded,
        _ => {
            let mut fresh = WorkflowState::new("impl", slug.clone());
            fresh.external_id = Some(issue_number.to_string());
            fresh.repo_root = Some(ctx.repo_root.clone());
            fresh.mock_mode = ctx.mock;
            fresh.auto_mode = ctx.auto;
            fresh
        }
    };

    let active_parent = ctx.repo_root.join(".governance").join("impl").join("active");
    let done_parent = ctx.repo_root.join(".governance").join("impl").join("done");
    let lld_path = ctx.repo_root.join("docs").join("lld").join(format!("LLD-{issue_number}.md"));
    std::fs::create_dir_all(active_parent.as_std_path())?;

    let audit = Arc::new(AuditDir::open(&active_parent, &slug));

    let (graph, entry) = warden_orchestrator::impl_stage::build(
        active_parent,
        done_parent,
        ctx.repo_root.clone(),
        lld_path,
        test_command,
        drafter_backend(ctx.mock, &config)?,
        reviewer_backend(ctx.mock, &config)?,
        "default".to_string(),
        config.llm_timeout_secs,
        config.max_iterations,
        interaction(ctx.auto, config.editor.clone()),
        gate_mode(ctx.auto),
        config.editor_timeout_secs,
        checkpoint.clone(),
        audit,
    );

    let entry_node = state.next_node.take().unwrap_or_else(|| entry.to_string());
    let node_ctx = node_context(&config);
    warden_engine::graph::run(&graph, &entry_node, &node_ctx, &checkpoint, &mut state).await?;

    Ok(CommandOutcome::from(&state))
}

fn tracker_repo(repo_root: &Utf8PathBuf) -> String {
    std::env::var("WARDEN_TRACKER_REPO").unwrap_or_else(|_| repo_root.file_name().unwrap_or("repo").to_string())
}
