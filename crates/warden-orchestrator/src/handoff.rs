//! Stage handoff (C9): the rules governing how a finalized instance's
//! artifact becomes the next stage's sole input, and how finalization stays
//! idempotent across reruns.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use warden_audit::{AuditDir, GovernanceLog, LogEvent};
use warden_checkpoint::CheckpointStore;
use warden_phase_api::WorkflowState;
use warden_utils::error::AuditError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizationMetadata {
    pub issue_number: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub timestamp: String,
    pub source: Option<String>,
    pub iteration_count: u32,
    pub draft_count: u32,
    pub verdict_count: u32,
}

/// Writes the finalization record under `suffix` (`filed.json` for the issue
/// stage, `approved.json` for the LLD and implementation stages), promotes
/// the audit directory to done, commits the lineage (C1), appends a
/// governance log entry, and clears the checkpoint row. Safe to call more
/// than once for the same instance: if the active directory is already
/// gone, this is a no-op (idempotence required by C9).
#[allow(clippy::too_many_arguments)]
pub fn finalize(
    active_dir: &AuditDir,
    done_parent: &Utf8Path,
    repo_root: &Utf8Path,
    checkpoint: &CheckpointStore,
    state: &mut WorkflowState,
    external_id: &str,
    suffix: &str,
    url: Option<String>,
    title: Option<String>,
    final_artifact_path: Option<Utf8PathBuf>,
) -> Result<(), AuditError> {
    if !active_dir.path().exists() {
        // Already finalized on a prior run; nothing left to do.
        return Ok(());
    }

    let metadata = FinalizationMetadata {
        issue_number: external_id.to_string(),
        url: url.clone(),
        title,
        timestamp: Utc::now().to_rfc3339(),
        source: state.source_path.as_ref().map(ToString::to_string),
        iteration_count: state.iteration_count,
        draft_count: state.draft_count,
        verdict_count: state.verdict_count,
    };
    let metadata_json = serde_json::to_string_pretty(&metadata).map_err(|e| AuditError::WriteFailed {
        number: 0,
        suffix: suffix.to_string(),
        reason: e.to_string(),
    })?;
    let number = active_dir.next_number()?;
    active_dir.save(number, suffix, &metadata_json)?;

    let done_dir = active_dir.move_to_done(done_parent, external_id, &state.slug)?;

    if !state.mock_mode {
        let message = format!("lineage: finalize {} ({external_id})", state.stage);
        if let Err(e) = AuditDir::commit_lineage(repo_root, &[done_dir], &message) {
            tracing::warn!(error = %e, external_id, "commit_lineage failed; audit trail left uncommitted");
        }
    }

    GovernanceLog::at(repo_root)
        .append(&LogEvent::new(metadata.timestamp.clone(), state.stage.clone(), "workflow_finalized").with_external_id(external_id))?;

    checkpoint.clear(&state.thread_id()).ok();

    state.final_external_id = Some(external_id.to_string());
    state.final_url = url;
    state.final_artifact_path = final_artifact_path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_is_idempotent_on_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let active_parent = root.join("active");
        let done_parent = root.join("done");
        std::fs::create_dir_all(active_parent.as_std_path()).unwrap();

        let audit = AuditDir::create_active(&active_parent, "widget").unwrap();
        audit.save(1, "brief.md", "hi").unwrap();

        let checkpoint = CheckpointStore::open_in_memory();
        let mut state = WorkflowState::new("lld", "widget");
        state.mock_mode = true;
        checkpoint.save(&state.thread_id(), &state).unwrap();

        finalize(&audit, &done_parent, &root, &checkpoint, &mut state, "42", "approved.json", None, None, None).unwrap();
        assert!(!audit.path().exists());

        // Re-running finalize against the now-gone active directory must not error.
        finalize(&audit, &done_parent, &root, &checkpoint, &mut state, "42", "approved.json", None, None, None).unwrap();
    }

    #[test]
    fn finalize_writes_metadata_under_the_given_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let active_parent = root.join("active");
        let done_parent = root.join("done");
        std::fs::create_dir_all(active_parent.as_std_path()).unwrap();

        let audit = AuditDir::create_active(&active_parent, "widget").unwrap();
        audit.save(1, "issue.md", "hi").unwrap();

        let checkpoint = CheckpointStore::open_in_memory();
        let mut state = WorkflowState::new("issue", "widget");
        state.mock_mode = true;

        finalize(&audit, &done_parent, &root, &checkpoint, &mut state, "42", "filed.json", None, None, None).unwrap();

        let done_dir = done_parent.join("42-widget");
        let metadata_path = done_dir.join("002-filed.json");
        assert!(metadata_path.exists());
        let metadata: FinalizationMetadata = serde_json::from_str(&std::fs::read_to_string(metadata_path.as_std_path()).unwrap()).unwrap();
        assert_eq!(metadata.issue_number, "42");
    }
}
