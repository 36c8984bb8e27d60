use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PulseError>;

/// Failures of a single git invocation.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Command timed out after {}", humantime::format_duration(*after))]
    Timeout { after: Duration },
    #[error("Command failed ({status}): {stderr}")]
    CommandFailed { status: ExitStatus, stderr: String },
}

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Git error: {0}")]
    Git(#[from] GitError),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Other: {0}")]
    Other(String),
}

impl From<toml::de::Error> for PulseError {
    fn from(err: toml::de::Error) -> Self {
        PulseError::Config(err.to_string())
    }
}

impl PulseError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PulseError::Git(GitError::Timeout { .. }))
    }
}
