//! Tool locations and invocation settings.
//!
//! Values come from, in increasing precedence: built-in defaults, a TOML file
//! and `CRYPTFS_`-prefixed environment variables.
//!
//! ```toml
//! gpg_program = "/usr/local/bin/gpg2"
//! gpg_homedir = "/home/alice/.gnupg-vaults"
//! gocryptfs_program = "gocryptfs"
//! timeout_secs = 120
//! ```

use crate::error::{CryptfsError, Result};
use crate::process::ProcessInvoker;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "CRYPTFS";
pub const CONFIG_ENV: &str = "CRYPTFS_CONFIG";
const CONFIG_DIR: &str = "cryptfs-cli";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub gpg_program: String,
    pub gpg_homedir: Option<PathBuf>,
    pub gocryptfs_program: String,
    pub fusermount_program: String,
    pub cppcryptfs_program: String,
    pub cppcryptfsctl_program: String,
    /// Upper bound for any single external tool call. Unset means wait forever.
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gpg_program: "gpg".into(),
            gpg_homedir: None,
            gocryptfs_program: "gocryptfs".into(),
            fusermount_program: "fusermount".into(),
            cppcryptfs_program: "cppcryptfs.exe".into(),
            cppcryptfsctl_program: "cppcryptfsctl.exe".into(),
            timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load settings. `explicit` (or `$CRYPTFS_CONFIG`) must exist when given;
    /// the per-user default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut builder = Config::builder();
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(CryptfsError::Config(format!(
                        "config file '{}' not found",
                        path.display()
                    )));
                }
                builder = builder.add_source(File::new(path_str(&path)?, FileFormat::Toml));
            }
            None => {
                if let Some(path) = default_config_path().filter(|p| p.is_file()) {
                    builder = builder.add_source(File::new(path_str(&path)?, FileFormat::Toml));
                }
            }
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<()> {
        let programs = [
            ("gpg_program", &self.gpg_program),
            ("gocryptfs_program", &self.gocryptfs_program),
            ("fusermount_program", &self.fusermount_program),
            ("cppcryptfs_program", &self.cppcryptfs_program),
            ("cppcryptfsctl_program", &self.cppcryptfsctl_program),
        ];
        for (key, value) in programs {
            if value.trim().is_empty() {
                return Err(CryptfsError::Config(format!("{key} must not be empty")));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(CryptfsError::Config(
                "timeout_secs must be positive; omit it to wait indefinitely".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn invoker(&self) -> ProcessInvoker {
        ProcessInvoker::new(self.timeout())
    }
}

/// `$XDG_CONFIG_HOME/cryptfs-cli/config.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| CryptfsError::Config(format!("config path '{}' is not valid UTF-8", path.display())))
}
