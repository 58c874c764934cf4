use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::types::ActionKind;

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("invalid interval for {kind}: {reason}")]
    InvalidInterval { kind: ActionKind, reason: String },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("{kind} failed: {reason}")]
    ActionFailed { kind: ActionKind, reason: String },

    #[error("{kind} exceeded its budget of {}s", .budget.as_secs())]
    TimedOut { kind: ActionKind, budget: Duration },

    #[error("actor failure during {kind}: {source}")]
    ActorFailure {
        kind: ActionKind,
        #[source]
        source: ActorError,
        /// Screenshot retained by the guard, if one could be taken.
        artifact: Option<PathBuf>,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("home directory not found: set HOME or pass --data-dir")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl From<rusqlite::Error> for UpdaterError {
    fn from(e: rusqlite::Error) -> Self {
        UpdaterError::StorageUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UpdaterError>;

/// The actor session itself became unusable.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ActorError {
    message: String,
}

impl ActorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome classes an action executor can report.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The steps could not be completed but the actor is still healthy.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Actor(#[from] ActorError),
}

impl ActionError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ActionError::Failed(reason.into())
    }
}
