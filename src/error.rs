use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptfsError {
    /// The target path is not in a state the operation accepts.
    #[error("{0}")]
    Precondition(String),

    /// A wrapped tool exited non-zero. `stderr` is kept exactly as captured.
    #[error("`{command}` failed ({status}): {}", .stderr.trim_end())]
    ExternalTool {
        program: String,
        command: String,
        status: String,
        stderr: String,
    },

    #[error("failed to start `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("failed to restrict permissions on '{}'", .path.display())]
    Permission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidInput(String),
}

impl CryptfsError {
    /// Captured stderr of a failed external tool, if this is one.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            CryptfsError::ExternalTool { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for CryptfsError {
    fn from(err: config::ConfigError) -> Self {
        CryptfsError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CryptfsError>;
