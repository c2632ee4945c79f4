use roll_core::{RosterError, Source};
use thiserror::Error;

use crate::collab::TransportError;

/// Every rejection the engine surfaces to its callers.
///
/// A late classifier result for a retired session is not in here: that case
/// is handled inside the coordinator and never reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("class '{class_id}' section '{section_id}' not found")]
    NotFound {
        class_id: String,
        section_id: String,
    },

    #[error("unknown student: {0}")]
    UnknownStudent(String),

    #[error("{0} classifier is already running for this session")]
    Busy(Source),

    #[error("no pending suggestion for student {0}")]
    NoSuggestion(String),

    #[error("attendance incomplete: {remaining} student(s) still unmarked")]
    Incomplete { remaining: usize },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("no active session")]
    NoActiveSession,

    #[error("no {0} classifier configured")]
    NoClassifier(Source),

    #[error("session has unsaved changes; confirm to discard")]
    UnsavedChanges,

    #[error("invalid roster: {0}")]
    InvalidRoster(String),
}

impl EngineError {
    /// Whether the error comes from a collaborator rather than the caller.
    pub fn is_transport(&self) -> bool {
        matches!(self, EngineError::Transport(_))
    }
}

impl From<RosterError> for EngineError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::UnknownStudent(id) => EngineError::UnknownStudent(id),
            RosterError::NoSuggestion(id) => EngineError::NoSuggestion(id),
            RosterError::Incomplete { remaining } => EngineError::Incomplete { remaining },
            RosterError::UnsavedChanges => EngineError::UnsavedChanges,
            other @ (RosterError::DuplicateStudent(_) | RosterError::InvalidConfidence(_)) => {
                EngineError::InvalidRoster(other.to_string())
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
