//! # Repository Layout
//!
//! ```text
//! repo_dir/
//! ├── objects/         ciphertext store (0700)
//! ├── passphrase.gpg   encrypted passphrase (0600)
//! └── gocryptfs.conf   backend config (0600)
//! ```
//!
//! A directory is a repository when `passphrase.gpg` is a file and `objects/`
//! is a directory. This module only creates `objects/`; the passphrase and
//! config files come from [`crate::passphrase`] and [`crate::backend`].

use crate::error::{CryptfsError, Result};
use crate::fsutil;
use std::env;
use std::path::{Path, PathBuf};

pub const OBJECTS_DIR: &str = "objects";
pub const PASSPHRASE_FILE: &str = "passphrase.gpg";
pub const CONFIG_FILE: &str = "gocryptfs.conf";

/// Paths of one repository, all derived from a single absolute root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Resolve `root` against the current directory when relative.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            root: absolute_path(root.as_ref())?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    pub fn passphrase_file(&self) -> PathBuf {
        self.root.join(PASSPHRASE_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Last path component, used as a volume label.
    pub fn name(&self) -> Option<&str> {
        self.root.file_name().and_then(|name| name.to_str())
    }

    /// A new repository must not touch anything that already exists.
    pub fn validate_for_create(&self) -> Result<()> {
        // symlink_metadata so a dangling link also counts as existing
        if self.root.symlink_metadata().is_ok() {
            return Err(CryptfsError::Precondition(format!(
                "directory '{}' already exists",
                self.root.display()
            )));
        }
        Ok(())
    }

    /// Gate in front of every mount: both the secret and the ciphertext
    /// store must be present.
    pub fn validate_for_mount(&self) -> Result<()> {
        if !self.passphrase_file().is_file() || !self.objects_dir().is_dir() {
            return Err(CryptfsError::Precondition(format!(
                "repository layout is invalid under '{}': expected {PASSPHRASE_FILE} and {OBJECTS_DIR}/",
                self.root.display()
            )));
        }
        Ok(())
    }

    /// Create the root and `objects/`, both owner-only.
    pub fn materialize(&self) -> Result<()> {
        let objects = self.objects_dir();
        fsutil::create_private_dir(&objects)?;
        fsutil::restrict_dir(&self.root)
    }

    /// What can be told from disk alone.
    pub fn probe_state(&self) -> RepoState {
        match self.validate_for_mount() {
            Ok(()) => RepoState::Initialized,
            Err(_) => RepoState::Uninitialized,
        }
    }
}

/// Lifecycle of a repository as driven by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoState {
    Uninitialized,
    Initialized,
    Mounted,
    Unmounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Mount,
    Umount,
}

impl RepoState {
    pub fn transition(self, op: Operation) -> Result<RepoState> {
        use Operation::*;
        use RepoState::*;

        match (self, op) {
            (Uninitialized, Create) => Ok(Initialized),
            (Initialized | Unmounted, Mount) => Ok(Mounted),
            (Mounted, Umount) => Ok(Unmounted),
            (state, op) => Err(CryptfsError::Precondition(format!(
                "cannot {op:?} a repository that is {state:?}"
            ))),
        }
    }
}

pub(crate) fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn initialized_repo(temp: &TempDir) -> Repository {
        let repo = Repository::new(temp.path().join("vault")).unwrap();
        repo.materialize().unwrap();
        fs::write(repo.passphrase_file(), b"ciphertext").unwrap();
        repo
    }

    #[test]
    fn paths_are_children_of_root() {
        let repo = Repository::new("/data/vault").unwrap();
        assert_eq!(repo.objects_dir(), PathBuf::from("/data/vault/objects"));
        assert_eq!(
            repo.passphrase_file(),
            PathBuf::from("/data/vault/passphrase.gpg")
        );
        assert_eq!(repo.config_file(), PathBuf::from("/data/vault/gocryptfs.conf"));
        assert_eq!(repo.name(), Some("vault"));
    }

    #[test]
    fn relative_root_is_made_absolute() {
        let repo = Repository::new("relative/vault").unwrap();
        assert!(repo.root().is_absolute());
        assert!(repo.root().ends_with("relative/vault"));
    }

    #[test]
    fn create_accepts_missing_path() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::new(temp.path().join("new")).unwrap();
        repo.validate_for_create().unwrap();
    }

    #[test]
    fn create_rejects_existing_directory() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::new(temp.path()).unwrap();
        let err = repo.validate_for_create().unwrap_err();
        assert!(matches!(err, CryptfsError::Precondition(_)));
    }

    #[test]
    fn create_rejects_existing_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, b"keep me").unwrap();

        let err = Repository::new(&file).unwrap().validate_for_create().unwrap_err();
        assert!(matches!(err, CryptfsError::Precondition(_)));
        assert_eq!(fs::read(&file).unwrap(), b"keep me");
    }

    #[cfg(unix)]
    #[test]
    fn create_rejects_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(temp.path().join("nowhere"), &link).unwrap();

        let err = Repository::new(&link).unwrap().validate_for_create().unwrap_err();
        assert!(matches!(err, CryptfsError::Precondition(_)));
    }

    #[test]
    fn mount_requires_both_secret_and_objects() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::new(temp.path().join("vault")).unwrap();
        assert!(repo.validate_for_mount().is_err());

        repo.materialize().unwrap();
        assert!(repo.validate_for_mount().is_err());

        fs::write(repo.passphrase_file(), b"x").unwrap();
        repo.validate_for_mount().unwrap();

        fs::remove_dir(repo.objects_dir()).unwrap();
        let err = repo.validate_for_mount().unwrap_err();
        assert!(matches!(err, CryptfsError::Precondition(_)));
    }

    #[test]
    fn mount_rejects_directory_named_like_secret() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::new(temp.path().join("vault")).unwrap();
        repo.materialize().unwrap();
        fs::create_dir(repo.passphrase_file()).unwrap();

        assert!(repo.validate_for_mount().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn materialize_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let repo = Repository::new(temp.path().join("vault")).unwrap();
        repo.materialize().unwrap();

        for dir in [repo.root().to_path_buf(), repo.objects_dir()] {
            let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700, "{}", dir.display());
        }
    }

    #[test]
    fn probe_state_reflects_layout() {
        let temp = TempDir::new().unwrap();
        let missing = Repository::new(temp.path().join("missing")).unwrap();
        assert_eq!(missing.probe_state(), RepoState::Uninitialized);

        let repo = initialized_repo(&temp);
        assert_eq!(repo.probe_state(), RepoState::Initialized);
    }

    #[test]
    fn lifecycle_transitions() {
        let state = RepoState::Uninitialized;
        let state = state.transition(Operation::Create).unwrap();
        assert_eq!(state, RepoState::Initialized);
        let state = state.transition(Operation::Mount).unwrap();
        assert_eq!(state, RepoState::Mounted);
        let state = state.transition(Operation::Umount).unwrap();
        assert_eq!(state, RepoState::Unmounted);
        assert_eq!(
            state.transition(Operation::Mount).unwrap(),
            RepoState::Mounted
        );
    }

    #[test]
    fn lifecycle_rejects_skipped_states() {
        assert!(RepoState::Uninitialized.transition(Operation::Mount).is_err());
        assert!(RepoState::Initialized.transition(Operation::Umount).is_err());
        assert!(RepoState::Initialized.transition(Operation::Create).is_err());
        assert!(RepoState::Mounted.transition(Operation::Mount).is_err());
    }
}
