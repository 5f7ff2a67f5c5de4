//! Errors raised while turning a config file into a [`GridConfig`].
//!
//! All three are fatal: the board never starts with a partially valid
//! config. Runtime command failures are not errors; see
//! [`crate::io::process::Completion`].
//!
//! [`GridConfig`]: crate::core::model::GridConfig

use std::path::PathBuf;

use thiserror::Error;

pub use crate::core::validator::ValidationError;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing or unreadable.
    #[error("could not access config file at {}: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not a well-formed document in its format.
    #[error("error parsing config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// The document is well-formed but describes an invalid board.
    #[error("invalid config: {0}")]
    Validation(#[from] ValidationError),
}

impl ConfigError {
    pub(crate) fn access(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Access {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn parse(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}
