//! Real `$EDITOR` integration implementing [`warden_gate::Interaction`].
//! Blocking-edit polls the child process rather than calling the blocking
//! `wait()`, so a configured timeout can still fire and kill a stuck editor.

use camino::Utf8Path;
use std::io::BufRead;
use std::time::{Duration, Instant};
use warden_gate::{GateOption, Interaction};
use warden_utils::error::GateError;

pub struct ProcessInteraction {
    editor: Option<String>,
}

impl ProcessInteraction {
    #[must_use]
    pub fn new(configured_editor: Option<String>) -> Self {
        Self { editor: configured_editor.or_else(|| std::env::var("EDITOR").ok()) }
    }

    fn editor_binary(&self) -> Result<&str, GateError> {
        self.editor.as_deref().ok_or(GateError::NoEditor)
    }
}

impl Interaction for ProcessInteraction {
    fn open_and_wait(&self, path: &Utf8Path, timeout_secs: u64) -> Result<(), GateError> {
        let editor = self.editor_binary()?;
        let mut child = std::process::Command::new(editor)
            .arg(path.as_std_path())
            .spawn()
            .map_err(|e| GateError::EditorFailed { status: e.raw_os_error().unwrap_or(-1) })?;

        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            if let Some(status) = child.try_wait().map_err(|e| GateError::EditorFailed { status: e.raw_os_error().unwrap_or(-1) })? {
                return if status.success() {
                    Ok(())
                } else {
                    Err(GateError::EditorFailed { status: status.code().unwrap_or(-1) })
                };
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                return Err(GateError::TimedOut { secs: timeout_secs });
            }
            std::thread::sleep(Duration::from_millis(200));
        }
    }

    fn open_non_blocking(&self, path: &Utf8Path) -> Result<(), GateError> {
        let editor = self.editor_binary()?;
        std::process::Command::new(editor)
            .arg(path.as_std_path())
            .spawn()
            .map_err(|e| GateError::EditorFailed { status: e.raw_os_error().unwrap_or(-1) })?;
        Ok(())
    }

    fn prompt_choice(&self) -> Result<(GateOption, Option<String>), GateError> {
        println!("Choose: [p]roceed, [r]evise, [m]anual exit");
        let stdin = std::io::stdin();
        let mut line = String::new();
        stdin.lock().read_line(&mut line).map_err(|_| GateError::NoEditor)?;

        match line.trim().to_lowercase().as_str() {
            "p" | "proceed" => Ok((GateOption::Proceed, None)),
            "m" | "manual" | "exit" => Ok((GateOption::ManualExit, None)),
            _ => {
                println!("Feedback:");
                let mut feedback = String::new();
                stdin.lock().read_line(&mut feedback).map_err(|_| GateError::NoEditor)?;
                Ok((GateOption::Revise, Some(feedback.trim().to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_editor_is_reported() {
        let interaction = ProcessInteraction { editor: None };
        let err = interaction.open_non_blocking(Utf8Path::new("x.md")).unwrap_err();
        assert!(matches!(err, GateError::NoEditor));
    }
}
