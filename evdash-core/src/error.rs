//! Error types for the event dashboard.

use thiserror::Error;

use crate::event::EventId;

/// Errors that can occur in dashboard operations.
#[derive(Error, Debug)]
pub enum DashError {
    /// Rejected before any store call: missing field or unparseable instant.
    #[error("Invalid event: {0}")]
    Validation(String),

    #[error("Event not found: {0}")]
    NotFound(EventId),

    /// The store medium is unreachable or rejected the operation.
    #[error("Store error: {0}")]
    Persistence(String),

    #[error("Cannot {intent} from the {from} view")]
    InvalidTransition { from: &'static str, intent: String },

    #[error("Another {0} is still in progress")]
    Busy(&'static str),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification used when reporting a failure to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Persistence,
    Usage,
}

impl DashError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashError::Validation(_) => ErrorKind::Validation,
            DashError::NotFound(_) => ErrorKind::NotFound,
            DashError::Persistence(_) | DashError::Io(_) | DashError::Serialization(_) => {
                ErrorKind::Persistence
            }
            DashError::InvalidTransition { .. } | DashError::Busy(_) | DashError::Config(_) => {
                ErrorKind::Usage
            }
        }
    }

    pub(crate) fn persistence(context: &str, err: impl std::fmt::Display) -> Self {
        DashError::Persistence(format!("{context}: {err}"))
    }
}

/// Result type alias for dashboard operations.
pub type DashResult<T> = Result<T, DashError>;
