//! A minimal client over the `gh` CLI, covering exactly the four verbs the
//! issue stage needs. Authentication and rate limiting are delegated to the
//! CLI itself; this crate only shells out and parses JSON replies.

use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use warden_utils::error::TrackerError;

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Label {
    pub name: String,
}

pub struct TrackerClient {
    binary: String,
    repo: String,
    timeout: Duration,
}

impl TrackerClient {
    #[must_use]
    pub fn new(repo: impl Into<String>, timeout: Duration) -> Self {
        Self { binary: "gh".into(), repo: repo.into(), timeout }
    }

    /// Confirms the `gh` binary is present and authenticated. Run once at
    /// the sandbox node before any stateful tracker call.
    pub async fn check_auth(&self) -> Result<(), TrackerError> {
        which::which(&self.binary).map_err(|e| TrackerError::AuthFailed { reason: e.to_string() })?;
        let output = self.run(&["auth", "status"]).await?;
        if !output.status.success() {
            return Err(TrackerError::AuthFailed { reason: String::from_utf8_lossy(&output.stderr).into_owned() });
        }
        Ok(())
    }

    pub async fn fetch_issue(&self, number: u64) -> Result<Issue, TrackerError> {
        let output = self
            .run(&["issue", "view", &number.to_string(), "--repo", &self.repo, "--json", "number,title,body"])
            .await?;
        if !output.status.success() {
            return Err(TrackerError::IssueNotFound { repo: self.repo.clone(), number });
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|_| TrackerError::IssueNotFound { repo: self.repo.clone(), number })
    }

    pub async fn list_labels(&self) -> Result<Vec<Label>, TrackerError> {
        let output = self.run(&["label", "list", "--repo", &self.repo, "--json", "name"]).await?;
        if !output.status.success() {
            return Err(TrackerError::AuthFailed { reason: String::from_utf8_lossy(&output.stderr).into_owned() });
        }
        serde_json::from_slice(&output.stdout).map_err(|e| TrackerError::LabelCreateFailed { label: String::new(), reason: e.to_string() })
    }

    pub async fn create_label(&self, name: &str) -> Result<(), TrackerError> {
        let output = self.run(&["label", "create", name, "--repo", &self.repo]).await?;
        if !output.status.success() {
            return Err(TrackerError::LabelCreateFailed { label: name.to_string(), reason: String::from_utf8_lossy(&output.stderr).into_owned() });
        }
        Ok(())
    }

    pub async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<Issue, TrackerError> {
        let mut args = vec!["issue".to_string(), "create".to_string(), "--repo".to_string(), self.repo.clone(), "--title".to_string(), title.to_string(), "--body".to_string(), body.to_string()];
        for label in labels {
            args.push("--label".to_string());
            args.push(label.clone());
        }
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run(&args_ref).await?;
        if !output.status.success() {
            return Err(TrackerError::IssueCreateFailed { reason: String::from_utf8_lossy(&output.stderr).into_owned() });
        }
        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let number = url.rsplit('/').next().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        Ok(Issue { number, title: title.to_string(), body: body.to_string() })
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, TrackerError> {
        let fut = Command::new(&self.binary).args(args).stdout(Stdio::piped()).stderr(Stdio::piped()).output();
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(TrackerError::Io),
            Err(_) => Err(TrackerError::TimedOut { secs: self.timeout.as_secs() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_stores_repo_and_timeout() {
        let client = TrackerClient::new("acme/widgets", Duration::from_secs(30));
        assert_eq!(client.repo, "acme/widgets");
        assert_eq!(client.timeout, Duration::from_secs(30));
    }
}
