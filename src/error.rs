//! Fatal error taxonomy for a publish run.
//!
//! Every variant terminates the run. `kind()` lets callers (tests, log
//! parsers) tell the classes apart without matching on message text.
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Coarse classification of a fatal error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Filesystem,
    Extraction,
    Network,
    Timeout,
    Tool,
    Publish,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Network => "network",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Tool => "tool",
            ErrorKind::Publish => "publish",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("missing required input {name}")]
    MissingInput { name: &'static str },
    #[error("invalid value for {name} ({value:?}): {reason}")]
    InvalidInput {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("project file not found")]
    ProjectFileNotFound { path: PathBuf },
    #[error("version file not found")]
    VersionFileNotFound { path: PathBuf },
    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to extract version info!")]
    VersionNotExtracted { path: PathBuf },
    #[error("error: {message} ({url})")]
    Network { url: String, message: String },
    #[error("unexpected registry status {status} for {url}")]
    RegistryStatus { url: String, status: u16 },
    #[error("malformed registry index at {url}: {message}")]
    RegistryBody { url: String, message: String },
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },
    #[error("{program} not found: {source}")]
    ToolMissing {
        program: String,
        #[source]
        source: which::Error,
    },
    #[error("failed to run {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}")]
    ToolFailed { command: String, status: String },
    #[error("no package produced under {}", .dir.display())]
    NoPackage { dir: PathBuf },
    #[error("{message}")]
    PublishRejected { message: String },
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::MissingInput { .. } | PublishError::InvalidInput { .. } => {
                ErrorKind::Config
            }
            PublishError::ProjectFileNotFound { .. }
            | PublishError::VersionFileNotFound { .. }
            | PublishError::Io { .. } => ErrorKind::Filesystem,
            PublishError::VersionNotExtracted { .. } => ErrorKind::Extraction,
            PublishError::Network { .. }
            | PublishError::RegistryStatus { .. }
            | PublishError::RegistryBody { .. } => ErrorKind::Network,
            PublishError::Timeout { .. } => ErrorKind::Timeout,
            PublishError::ToolMissing { .. }
            | PublishError::ToolSpawn { .. }
            | PublishError::ToolFailed { .. } => ErrorKind::Tool,
            PublishError::NoPackage { .. } | PublishError::PublishRejected { .. } => {
                ErrorKind::Publish
            }
        }
    }

    /// File the error is about, when there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            PublishError::ProjectFileNotFound { path }
            | PublishError::VersionFileNotFound { path }
            | PublishError::VersionNotExtracted { path }
            | PublishError::Io { path, .. } => Some(path),
            PublishError::NoPackage { dir } => Some(dir),
            _ => None,
        }
    }

    pub(crate) fn invalid(name: &'static str, value: &str, reason: impl ToString) -> Self {
        PublishError::InvalidInput {
            name,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = PublishError> = std::result::Result<T, E>;
