//! The audit store (sequentially numbered lineage files per workflow
//! instance) and the governance log (an append-only, advisory JSONL of
//! workflow events).

pub mod governance_log;
pub mod lineage;

pub use governance_log::{GovernanceLog, LogEvent};
pub use lineage::AuditDir;
