//! Mount target normalization.
//!
//! On Windows a bare drive letter such as `X:` is a virtual handle the
//! backend assigns, so it is passed through untouched. Everything else is an
//! absolute directory, created owner-only when missing.

use crate::backend::Platform;
use crate::error::{CryptfsError, Result};
use crate::fsutil;
use crate::repo::absolute_path;
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountTarget {
    AbsolutePath(PathBuf),
    DriveLetter(String),
}

impl MountTarget {
    /// The target as a single command-line token.
    pub fn as_arg(&self) -> &OsStr {
        match self {
            MountTarget::AbsolutePath(path) => path.as_os_str(),
            MountTarget::DriveLetter(letter) => OsStr::new(letter),
        }
    }
}

impl fmt::Display for MountTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountTarget::AbsolutePath(path) => write!(f, "{}", path.display()),
            MountTarget::DriveLetter(letter) => f.write_str(letter),
        }
    }
}

/// `[A-Za-z]:` and nothing else.
pub fn is_drive_letter(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Classify `target` without touching the filesystem.
pub fn classify(target: &str, platform: Platform) -> Result<MountTarget> {
    if target.is_empty() {
        return Err(CryptfsError::InvalidInput("mount point must not be empty".into()));
    }
    if platform == Platform::Windows && is_drive_letter(target) {
        return Ok(MountTarget::DriveLetter(target.to_string()));
    }
    Ok(MountTarget::AbsolutePath(absolute_path(Path::new(target))?))
}

/// Classify `target` and make sure a path target exists as a directory.
pub fn resolve(target: &str, platform: Platform) -> Result<MountTarget> {
    let resolved = classify(target, platform)?;
    if let MountTarget::AbsolutePath(path) = &resolved {
        if !path.exists() {
            debug!(path = %path.display(), "creating mount point");
            fsutil::create_private_dir(path)?;
        } else if !path.is_dir() {
            return Err(CryptfsError::Precondition(format!(
                "mount point '{}' exists and is not a directory",
                path.display()
            )));
        }
    }
    Ok(resolved)
}
