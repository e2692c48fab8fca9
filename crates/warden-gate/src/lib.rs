//! The gate protocol. A gate is the only place a workflow touches a human.
//! Three modes apply depending on interactivity and prior state:
//!
//! - **Blocking edit** — open the artifact and wait for the editor to close,
//!   then present an enumerated choice.
//! - **Non-blocking open** — open the artifact without waiting, then
//!   auto-route from the reviewer's verdict.
//! - **Automatic** — never touch the editor; decide purely from state.
//!
//! The load-bearing rule is in [`GateDecision::ManualExit`]: a caller that
//! receives it must NOT mutate routing state before the node returns. That
//! is what lets the same gate be re-entered on the next run.

use camino::Utf8Path;
use warden_utils::error::GateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    BlockingEdit,
    NonBlockingOpen,
    Automatic,
}

/// The three choices offered at a first human gate (post-draft).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    ReturnForRevision(String),
    ManualExit,
}

/// Index of the three enumerated options at a blocking-edit gate, in the
/// order they are presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOption {
    Proceed,
    Revise,
    ManualExit,
}

pub const GATE_OPTIONS: [GateOption; 3] = [GateOption::Proceed, GateOption::Revise, GateOption::ManualExit];

/// External interactions a gate needs: opening an editor and prompting for a
/// choice. Implemented by `warden-editor` for real runs and by a fixture for
/// tests.
pub trait Interaction: Send + Sync {
    fn open_and_wait(&self, path: &Utf8Path, timeout_secs: u64) -> Result<(), GateError>;
    fn open_non_blocking(&self, path: &Utf8Path) -> Result<(), GateError>;
    /// Prompts the user to choose among `GATE_OPTIONS`; returns the chosen
    /// option and, for `Revise`, the collected feedback text.
    fn prompt_choice(&self) -> Result<(GateOption, Option<String>), GateError>;
}

/// Runs the post-draft gate. In `Automatic` mode this always proceeds: there
/// is no reviewer verdict yet, so there's nothing to auto-route on.
pub fn run_draft_gate(
    mode: GateMode,
    interaction: &dyn Interaction,
    artifact_path: &Utf8Path,
    editor_timeout_secs: u64,
) -> Result<GateDecision, GateError> {
    match mode {
        GateMode::Automatic => Ok(GateDecision::Proceed),
        GateMode::BlockingEdit => {
            interaction.open_and_wait(artifact_path, editor_timeout_secs)?;
            let (choice, feedback) = interaction.prompt_choice()?;
            Ok(match choice {
                GateOption::Proceed => GateDecision::Proceed,
                GateOption::Revise => GateDecision::ReturnForRevision(feedback.unwrap_or_default()),
                GateOption::ManualExit => GateDecision::ManualExit,
            })
        }
        GateMode::NonBlockingOpen => {
            interaction.open_non_blocking(artifact_path)?;
            Ok(GateDecision::Proceed)
        }
    }
}

/// Runs the post-review gate. Auto-routes on the parsed verdict regardless
/// of mode once the artifact has been shown (or skipped, if automatic).
pub fn run_review_gate(
    mode: GateMode,
    interaction: &dyn Interaction,
    artifact_path: &Utf8Path,
    approved: bool,
) -> Result<GateDecision, GateError> {
    match mode {
        GateMode::Automatic => {}
        GateMode::NonBlockingOpen | GateMode::BlockingEdit => {
            interaction.open_non_blocking(artifact_path)?;
        }
    }

    if approved {
        Ok(GateDecision::Proceed)
    } else {
        Ok(GateDecision::ReturnForRevision(String::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FixtureInteraction {
        choice: RefCell<(GateOption, Option<String>)>,
        opened_blocking: RefCell<bool>,
        opened_non_blocking: RefCell<bool>,
    }

    impl Interaction for FixtureInteraction {
        fn open_and_wait(&self, _path: &Utf8Path, _timeout_secs: u64) -> Result<(), GateError> {
            *self.opened_blocking.borrow_mut() = true;
            Ok(())
        }

        fn open_non_blocking(&self, _path: &Utf8Path) -> Result<(), GateError> {
            *self.opened_non_blocking.borrow_mut() = true;
            Ok(())
        }

        fn prompt_choice(&self) -> Result<(GateOption, Option<String>), GateError> {
            Ok(self.choice.borrow().clone())
        }
    }

    #[test]
    fn automatic_mode_proceeds_without_touching_editor() {
        let fixture = FixtureInteraction {
            choice: RefCell::new((GateOption::ManualExit, None)),
            opened_blocking: RefCell::new(false),
            opened_non_blocking: RefCell::new(false),
        };
        let decision = run_draft_gate(GateMode::Automatic, &fixture, Utf8Path::new("draft.md"), 60).unwrap();
        assert_eq!(decision, GateDecision::Proceed);
        assert!(!*fixture.opened_blocking.borrow());
    }

    #[test]
    fn blocking_edit_manual_exit_is_reported_not_swallowed() {
        let fixture = FixtureInteraction {
            choice: RefCell::new((GateOption::ManualExit, None)),
            opened_blocking: RefCell::new(false),
            opened_non_blocking: RefCell::new(false),
        };
        let decision = run_draft_gate(GateMode::BlockingEdit, &fixture, Utf8Path::new("draft.md"), 60).unwrap();
        assert_eq!(decision, GateDecision::ManualExit);
        assert!(*fixture.opened_blocking.borrow());
    }

    #[test]
    fn blocking_edit_revise_carries_feedback() {
        let fixture = FixtureInteraction {
            choice: RefCell::new((GateOption::Revise, Some("fix the title".into()))),
            opened_blocking: RefCell::new(false),
            opened_non_blocking: RefCell::new(false),
        };
        let decision = run_draft_gate(GateMode::BlockingEdit, &fixture, Utf8Path::new("draft.md"), 60).unwrap();
        assert_eq!(decision, GateDecision::ReturnForRevision("fix the title".into()));
    }

    #[test]
    fn review_gate_auto_routes_on_approval() {
        let fixture = FixtureInteraction {
            choice: RefCell::new((GateOption::Proceed, None)),
            opened_blocking: RefCell::new(false),
            opened_non_blocking: RefCell::new(false),
        };
        let approved = run_review_gate(GateMode::Automatic, &fixture, Utf8Path::new("verdict.md"), true).unwrap();
        assert_eq!(approved, GateDecision::Proceed);

        let revise = run_review_gate(GateMode::Automatic, &fixture, Utf8Path::new("verdict.md"), false).unwrap();
        assert_eq!(revise, GateDecision::ReturnForRevision(String::new()));
    }
}
