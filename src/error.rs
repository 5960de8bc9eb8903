//! Error taxonomy for reconciliation runs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    /// A root is missing, is a file, or both roots are the same directory.
    #[error("invalid root '{}': {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    #[error("failed to walk '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to {action} '{}': {source}", path.display())]
    Transfer {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Only ever reported as a decision; the prune loop keeps going.
    #[error("failed to remove '{}': {source}", path.display())]
    Prune {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),
}

impl SyncError {
    pub fn invalid_root(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidRoot {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn walk(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Walk {
            path: path.into(),
            source,
        }
    }

    pub fn transfer(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Transfer {
            action,
            path: path.into(),
            source,
        }
    }
}

impl From<ssh2::Error> for SyncError {
    fn from(e: ssh2::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
