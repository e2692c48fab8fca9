//! Layered configuration: an explicit path, then `.governance/config.toml`
//! discovered by walking up from the working directory, then compiled-in
//! defaults. Earlier layers win; later layers fill gaps.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use warden_utils::error::ConfigError;

const CONFIG_FILENAME: &str = "config.toml";
const CONFIG_DIRNAME: &str = ".governance";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_iterations: u32,
    pub llm_timeout_secs: u64,
    pub editor_timeout_secs: u64,
    pub tracker_timeout_secs: u64,
    pub draft_size_ceiling_bytes: usize,
    pub log_json: bool,
    pub editor: Option<String>,
    pub checkpoint_dir: Option<Utf8PathBuf>,
    pub drafter_binary: String,
    pub reviewer_binary: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            llm_timeout_secs: 300,
            editor_timeout_secs: 86_400,
            tracker_timeout_secs: 30,
            draft_size_ceiling_bytes: 2_000_000,
            log_json: false,
            editor: None,
            checkpoint_dir: None,
            drafter_binary: "warden-drafter".to_string(),
            reviewer_binary: "warden-reviewer".to_string(),
        }
    }
}

impl Config {
    /// Discovers configuration starting from `start_dir`, preferring an
    /// explicit path when given.
    pub fn discover(
        explicit_path: Option<&Utf8Path>,
        start_dir: &Utf8Path,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            return Self::load_from(path);
        }

        match find_repo_config(start_dir) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_from(path: &Utf8Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_std_path()).map_err(ConfigError::Io)?;
        toml::from_str(&raw).map_err(|e| ConfigError::InvalidToml {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

fn find_repo_config(start_dir: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut dir = Some(start_dir.to_path_buf());
    while let Some(d) = dir {
        let candidate = d.join(CONFIG_DIRNAME).join(CONFIG_FILENAME);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = d.parent().map(Utf8Path::to_path_buf);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        let start = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let cfg = Config::discover(None, &start).unwrap();
        assert_eq!(cfg.max_iterations, 20);
    }

    #[test]
    fn discovers_repo_config_walking_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let governance_dir = root.join(CONFIG_DIRNAME);
        std::fs::create_dir_all(governance_dir.as_std_path()).unwrap();
        std::fs::write(
            governance_dir.join(CONFIG_FILENAME).as_std_path(),
            "max_iterations = 5\n",
        )
        .unwrap();

        let nested = root.join("a").join("b");
        std::fs::create_dir_all(nested.as_std_path()).unwrap();

        let cfg = Config::discover(None, &nested).unwrap();
        assert_eq!(cfg.max_iterations, 5);
    }

    #[test]
    fn rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("bad.toml")).unwrap();
        std::fs::write(path.as_std_path(), "not valid = [").unwrap();
        let err = Config::discover(Some(path.as_path()), &path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidToml { .. }));
    }
}
