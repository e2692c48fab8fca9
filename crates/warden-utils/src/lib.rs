//! Shared utilities used across the governance engine: error taxonomy, exit
//! codes, atomic file writes, and logging setup.

pub mod atomic_write;
pub mod error;
pub mod exit_code;
pub mod logging;

pub use error::{GovernanceError, UserFriendlyError};
pub use exit_code::ExitCode;
