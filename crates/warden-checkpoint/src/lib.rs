//! A persistent `thread_id -> WorkflowState` map backed by an embedded
//! transactional store. A snapshot is written atomically at each node
//! boundary, so a reader either sees the last complete snapshot or none —
//! never a torn write.
//!
//! Store location, in priority order: the `WARDEN_CHECKPOINT_DIR`
//! environment variable; `<repo_root>/.governance/<stage>_workflow.db`; a
//! legacy per-user directory. Per-repository placement is what prevents
//! concurrent worktrees from colliding on the same checkpoint rows.

use camino::{Utf8Path, Utf8PathBuf};
use warden_phase_api::WorkflowState;
use warden_utils::error::CheckpointError;

const ENV_OVERRIDE: &str = "WARDEN_CHECKPOINT_DIR";

pub struct CheckpointStore {
    db: sled::Db,
}

impl CheckpointStore {
    /// Opens (creating if absent) the store for `stage` under `repo_root`.
    pub fn open(repo_root: Option<&Utf8Path>, stage: &str) -> Result<Self, CheckpointError> {
        let path = resolve_path(repo_root, stage);
        let db = sled::open(path.as_std_path()).map_err(|e| CheckpointError::OpenFailed {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { db })
    }

    /// Opens an ephemeral in-memory store; used by tests only.
    #[must_use]
    pub fn open_in_memory() -> Self {
        Self { db: sled::Config::new().temporary(true).open().expect("temporary sled store") }
    }

    /// Atomically writes the snapshot for `thread_id`, replacing any prior
    /// value in a single transaction.
    pub fn save(&self, thread_id: &str, state: &WorkflowState) -> Result<(), CheckpointError> {
        let bytes = serde_json::to_vec(state)?;
        self.db
            .transaction(|tx| {
                tx.insert(thread_id.as_bytes(), bytes.clone())?;
                Ok::<_, sled::transaction::ConflictableTransactionError<std::convert::Infallible>>(())
            })
            .map_err(|e| CheckpointError::TransactionFailed { thread_id: thread_id.to_string(), reason: e.to_string() })?;
        self.db.flush().map_err(|e| CheckpointError::TransactionFailed { thread_id: thread_id.to_string(), reason: e.to_string() })?;
        Ok(())
    }

    /// Loads the last snapshot for `thread_id`, or `None` if the workflow has
    /// never run.
    pub fn load(&self, thread_id: &str) -> Result<Option<WorkflowState>, CheckpointError> {
        match self.db.get(thread_id.as_bytes()).map_err(|e| CheckpointError::TransactionFailed {
            thread_id: thread_id.to_string(),
            reason: e.to_string(),
        })? {
            Some(bytes) => {
                let state = serde_json::from_slice(&bytes).map_err(|e| CheckpointError::Corrupted {
                    thread_id: thread_id.to_string(),
                    reason: e.to_string(),
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Removes the snapshot for `thread_id`; used after a stage finalizes and
    /// its checkpoint is no longer meaningful for resume.
    pub fn clear(&self, thread_id: &str) -> Result<(), CheckpointError> {
        self.db
            .remove(thread_id.as_bytes())
            .map_err(|e| CheckpointError::TransactionFailed { thread_id: thread_id.to_string(), reason: e.to_string() })?;
        Ok(())
    }
}

fn resolve_path(repo_root: Option<&Utf8Path>, stage: &str) -> Utf8PathBuf {
    if let Ok(dir) = std::env::var(ENV_OVERRIDE) {
        return Utf8PathBuf::from(dir).join(format!("{stage}_workflow.db"));
    }
    if let Some(root) = repo_root {
        return root.join(".governance").join(format!("{stage}_workflow.db"));
    }
    let legacy = dirs::home_dir()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."));
    legacy.join(".warden").join(format!("{stage}_workflow.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_state_snapshot() {
        let store = CheckpointStore::open_in_memory();
        let state = WorkflowState::new("lld", "widget");
        store.save("42-lld", &state).unwrap();
        let loaded = store.load("42-lld").unwrap().unwrap();
        assert_eq!(loaded.slug, "widget");
        assert_eq!(loaded.stage, "lld");
    }

    #[test]
    fn missing_thread_id_returns_none() {
        let store = CheckpointStore::open_in_memory();
        assert!(store.load("nope").unwrap().is_none());
    }

    #[test]
    fn save_overwrites_prior_snapshot() {
        let store = CheckpointStore::open_in_memory();
        let mut state = WorkflowState::new("lld", "widget");
        store.save("42-lld", &state).unwrap();
        state.iteration_count = 3;
        store.save("42-lld", &state).unwrap();
        let loaded = store.load("42-lld").unwrap().unwrap();
        assert_eq!(loaded.iteration_count, 3);
    }

    #[test]
    fn clear_removes_snapshot() {
        let store = CheckpointStore::open_in_memory();
        let state = WorkflowState::new("lld", "widget");
        store.save("42-lld", &state).unwrap();
        store.clear("42-lld").unwrap();
        assert!(store.load("42-lld").unwrap().is_none());
    }

    #[test]
    fn env_override_takes_priority() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(ENV_OVERRIDE, dir.path());
        let path = resolve_path(Some(Utf8Path::new("/some/repo")), "lld");
        std::env::remove_var(ENV_OVERRIDE);
        assert!(path.starts_with(Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()));
    }
}
