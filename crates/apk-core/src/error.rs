//! Error type shared by every apk-core operation.

use std::io;
use std::path::{Path, PathBuf};

use apk_schema::ArchError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::http::HttpError;

/// Result alias used throughout the crate.
pub type Result<T, E = ApkError> = std::result::Result<T, E>;

/// Coarse classification of an [`ApkError`], so callers can tell "nothing is
/// configured" apart from "the network could not be reached".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A key source, keyring directory or architecture setting is wrong.
    Configuration,
    /// The network could not be reached, or answered with a failure status.
    Transport,
    /// The filesystem refused an operation.
    Storage,
    /// The inputs were well-formed but describe an unusable state.
    Validation,
    /// The caller cancelled the operation.
    Cancelled,
}

/// Every failure an operation can report. See [`ApkError::kind`] for the
/// coarse classification.
#[derive(Error, Debug)]
pub enum ApkError {
    #[error("at least one repository is required")]
    NoRepositories,

    #[error("no usable key files found in {}", display_paths(.searched))]
    NoKeys { searched: Vec<PathBuf> },

    #[error("keyring directory not found: {}", .path.display())]
    KeyringMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read key {}: {source}", .path.display())]
    KeyUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid key source '{0}': no file name to store it under")]
    InvalidKeySource(String),

    #[error("invalid architecture from {origin}: {source}")]
    Arch {
        origin: String,
        #[source]
        source: ArchError,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: HttpError,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: StatusCode },

    #[error("operation cancelled")]
    Cancelled,

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApkError {
    /// Build a `map_err` adapter that tags an IO error with the action and path.
    pub(crate) fn io(action: &'static str, path: impl AsRef<Path>) -> impl FnOnce(io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        move |source| Self::Io {
            action,
            path,
            source,
        }
    }

    /// Which category of failure this is.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoRepositories | Self::NoKeys { .. } => ErrorKind::Validation,
            Self::KeyringMissing { .. }
            | Self::KeyUnreadable { .. }
            | Self::InvalidKeySource(_)
            | Self::Arch { .. } => ErrorKind::Configuration,
            Self::Http { .. } | Self::Status { .. } => ErrorKind::Transport,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Storage,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
