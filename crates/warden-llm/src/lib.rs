//! LLM backend abstraction: the drafter and reviewer are opaque
//! "string in, string out" collaborators behind a shared trait. Concrete
//! backends spawn a CLI binary and capture stdout.

pub mod backend;
pub mod types;

pub use backend::CliBackend;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};
