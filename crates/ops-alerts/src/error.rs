//! Error types for the ops-alerts crate.

use thiserror::Error;

use crate::types::EventStatus;

/// Errors that can occur while managing alert event lifecycles.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The event (or fingerprint) does not exist.
    #[error("alert event not found: {id}")]
    NotFound {
        /// The id or fingerprint that was looked up.
        id: String,
    },

    /// Optimistic-concurrency mismatch or ownership clash.
    #[error("conflict on alert event {id}: {reason}")]
    Conflict {
        /// The event id.
        id: String,
        /// What clashed.
        reason: String,
    },

    /// Malformed input: bad duration, empty id list, bad page.
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// The operation is not legal for the event's current status.
    #[error("cannot {operation} alert event {id} while {status}")]
    InvalidState {
        /// The event id.
        id: String,
        /// The status the event was in.
        status: EventStatus,
        /// The rejected operation.
        operation: &'static str,
    },

    /// The storage collaborator timed out or failed.
    #[error("store unavailable: {reason}")]
    Unavailable {
        /// The underlying failure.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AlertError {
    /// Returns true if the caller may retry the operation with backoff.
    ///
    /// Only concurrency conflicts and storage unavailability are transient;
    /// everything else is reported verbatim and will fail again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Unavailable { .. })
    }

    /// Short machine-readable kind, used in batch reports and CLI output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Conflict { .. } => "conflict",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::InvalidState { .. } => "invalid_state",
            Self::Unavailable { .. } => "unavailable",
            Self::Serialization(_) => "serialization",
        }
    }

    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<ops_persist::PersistError> for AlertError {
    fn from(err: ops_persist::PersistError) -> Self {
        match err {
            ops_persist::PersistError::Corrupt { .. } => Self::Serialization(err.to_string()),
            ops_persist::PersistError::Io { .. } | ops_persist::PersistError::LockTimeout { .. } => {
                Self::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Result type for alert lifecycle operations.
pub type Result<T> = std::result::Result<T, AlertError>;
