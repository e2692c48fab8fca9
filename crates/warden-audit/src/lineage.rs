//! Per-instance audit lineage: `NNN-<suffix>` files under an active
//! directory, promoted to a done directory on finalization.

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use warden_utils::atomic_write::write_file_atomic;
use warden_utils::error::AuditError;

static NUMBER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{3,4})-").unwrap());

/// The active (or, after promotion, done) directory for one workflow
/// instance's lineage.
pub struct AuditDir {
    path: Utf8PathBuf,
}

impl AuditDir {
    /// Creates the active directory for a brand new instance. Fails with
    /// `SlugCollision` if it already exists.
    pub fn create_active(active_parent: &Utf8Path, slug: &str) -> Result<Self, AuditError> {
        let path = active_parent.join(slug);
        if path.exists() {
            return Err(AuditError::SlugCollision { slug: slug.to_string() });
        }
        std::fs::create_dir_all(path.as_std_path())?;
        Ok(Self { path })
    }

    /// Opens an existing active directory for resume.
    pub fn open(active_parent: &Utf8Path, slug: &str) -> Self {
        Self { path: active_parent.join(slug) }
    }

    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Smallest positive integer not already used as a sequence prefix in
    /// this directory; 1 if the directory is empty.
    pub fn next_number(&self) -> Result<u32, AuditError> {
        let mut max = 0u32;
        if self.path.exists() {
            for entry in std::fs::read_dir(self.path.as_std_path())? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if let Some(caps) = NUMBER_PREFIX.captures(&name) {
                    if let Ok(n) = caps[1].parse::<u32>() {
                        max = max.max(n);
                    }
                }
            }
        }
        Ok(max + 1)
    }

    /// Writes `NNN-<suffix>` with `content`, using 3-digit zero padding that
    /// widens to 4 digits past 999.
    pub fn save(&self, number: u32, suffix: &str, content: &str) -> Result<Utf8PathBuf, AuditError> {
        let filename = if number < 1000 {
            format!("{number:03}-{suffix}")
        } else {
            format!("{number:04}-{suffix}")
        };
        let path = self.path.join(&filename);
        write_file_atomic(&path, content).map_err(|e| AuditError::WriteFailed {
            number,
            suffix: suffix.to_string(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }

    /// Moves this active directory to `<done_parent>/<external_id>-<slug>`,
    /// falling back to copy-then-delete across filesystem boundaries.
    pub fn move_to_done(&self, done_parent: &Utf8Path, external_id: &str, slug: &str) -> Result<Utf8PathBuf, AuditError> {
        let dest = done_parent.join(format!("{external_id}-{slug}"));
        if dest.exists() {
            return Err(AuditError::DonePathExists { active: self.path.to_string(), done: dest.to_string() });
        }
        std::fs::create_dir_all(done_parent.as_std_path())?;
        match std::fs::rename(self.path.as_std_path(), dest.as_std_path()) {
            Ok(()) => Ok(dest),
            Err(e) if e.raw_os_error() == Some(18) => {
                copy_dir_recursive(&self.path, &dest)?;
                std::fs::remove_dir_all(self.path.as_std_path())?;
                Ok(dest)
            }
            Err(e) => Err(AuditError::Io(e)),
        }
    }

    /// Stages `paths` and commits them in `repo_root`. A clean tree (nothing
    /// staged after `git add`) is a no-op, not an error. Per C1, a failed
    /// commit is reported to the caller but never overwrites or loses the
    /// audit trail itself.
    pub fn commit_lineage(repo_root: &Utf8Path, paths: &[Utf8PathBuf], message: &str) -> Result<(), AuditError> {
        if paths.is_empty() {
            return Ok(());
        }

        let add = std::process::Command::new("git")
            .arg("add")
            .args(paths.iter().map(|p| p.as_str()))
            .current_dir(repo_root.as_std_path())
            .output()
            .map_err(|e| AuditError::CommitFailed { reason: e.to_string() })?;
        if !add.status.success() {
            return Err(AuditError::CommitFailed { reason: String::from_utf8_lossy(&add.stderr).into_owned() });
        }

        let staged = std::process::Command::new("git")
            .args(["diff", "--cached", "--quiet"])
            .current_dir(repo_root.as_std_path())
            .status()
            .map_err(|e| AuditError::CommitFailed { reason: e.to_string() })?;
        if staged.success() {
            // Exit code 0 means no staged diff; nothing new to commit.
            return Ok(());
        }

        let commit = std::process::Command::new("git")
            .args(["commit", "-m", message])
            .current_dir(repo_root.as_std_path())
            .output()
            .map_err(|e| AuditError::CommitFailed { reason: e.to_string() })?;
        if !commit.status.success() {
            return Err(AuditError::CommitFailed { reason: String::from_utf8_lossy(&commit.stderr).into_owned() });
        }
        Ok(())
    }
}

fn copy_dir_recursive(src: &Utf8Path, dst: &Utf8Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst.as_std_path())?;
    for entry in std::fs::read_dir(src.as_std_path())? {
        let entry = entry?;
        let file_name = entry.file_name();
        let dst_path = dst.as_std_path().join(&file_name);
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(
                &Utf8PathBuf::from_path_buf(entry.path()).unwrap(),
                &Utf8PathBuf::from_path_buf(dst_path).unwrap(),
            )?;
        } else {
            std::fs::copy(entry.path(), dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_start_at_one_and_increment() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let audit = AuditDir::create_active(&parent, "widget").unwrap();
        assert_eq!(audit.next_number().unwrap(), 1);
        audit.save(1, "brief.md", "hello").unwrap();
        assert_eq!(audit.next_number().unwrap(), 2);
    }

    #[test]
    fn colliding_slug_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        AuditDir::create_active(&parent, "widget").unwrap();
        let err = AuditDir::create_active(&parent, "widget").unwrap_err();
        assert!(matches!(err, AuditError::SlugCollision { .. }));
    }

    #[test]
    fn move_to_done_relocates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let active_parent = Utf8PathBuf::from_path_buf(dir.path().join("active")).unwrap();
        let done_parent = Utf8PathBuf::from_path_buf(dir.path().join("done")).unwrap();
        std::fs::create_dir_all(active_parent.as_std_path()).unwrap();

        let audit = AuditDir::create_active(&active_parent, "widget").unwrap();
        audit.save(1, "brief.md", "hi").unwrap();
        let dest = audit.move_to_done(&done_parent, "42", "widget").unwrap();

        assert!(!audit.path().exists());
        assert!(dest.exists());
        assert!(dest.join("001-brief.md").exists());
    }

    #[test]
    fn numbering_widens_past_three_digits() {
        let dir = tempfile::tempdir().unwrap();
        let parent = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let audit = AuditDir::create_active(&parent, "widget").unwrap();
        let path = audit.save(1000, "overflow.md", "x").unwrap();
        assert!(path.as_str().ends_with("1000-overflow.md"));
    }

    #[test]
    fn commit_lineage_reports_failure_outside_a_repo() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let file = root.join("done").join("42-widget").join("001-filed.json");
        std::fs::create_dir_all(file.parent().unwrap().as_std_path()).unwrap();
        std::fs::write(file.as_std_path(), "{}").unwrap();

        let err = AuditDir::commit_lineage(&root, &[file], "lineage: finalize issue (42)").unwrap_err();
        assert!(matches!(err, AuditError::CommitFailed { .. }));
    }

    #[test]
    fn commit_lineage_is_a_no_op_with_no_paths() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        AuditDir::commit_lineage(&root, &[], "lineage: nothing to do").unwrap();
    }
}
