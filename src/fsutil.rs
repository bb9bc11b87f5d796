//! Owner-only permission helpers.
//!
//! On Unix, secrets are set to 0600 and repository directories to 0700, and
//! the resulting mode is read back. Other platforms rely on the default ACLs
//! of the user's profile directory.

use crate::error::{CryptfsError, Result};
use std::fs;
use std::path::Path;

pub const SECRET_FILE_MODE: u32 = 0o600;
pub const PRIVATE_DIR_MODE: u32 = 0o700;

/// Restrict a secret file to owner read/write.
pub fn restrict_file(path: &Path) -> Result<()> {
    restrict(path, SECRET_FILE_MODE)
}

/// Restrict a directory to owner access.
pub fn restrict_dir(path: &Path) -> Result<()> {
    restrict(path, PRIVATE_DIR_MODE)
}

/// Create `path` and any missing parents, then restrict the leaf to owner access.
pub fn create_private_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    restrict_dir(path)
}

#[cfg(unix)]
fn restrict(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let permission_error = |source| CryptfsError::Permission {
        path: path.to_path_buf(),
        source,
    };

    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(permission_error)?;

    let actual = fs::metadata(path).map_err(permission_error)?.permissions().mode() & 0o777;
    if actual != mode {
        return Err(permission_error(std::io::Error::other(format!(
            "mode is {actual:o}, expected {mode:o}"
        ))));
    }
    Ok(())
}

#[cfg(not(unix))]
fn restrict(path: &Path, _mode: u32) -> Result<()> {
    fs::metadata(path).map_err(|source| CryptfsError::Permission {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
