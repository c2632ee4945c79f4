use thiserror::Error;

/// Rejections raised at the roster boundary.
///
/// None of these leave the roster partially mutated: every operation checks
/// before it writes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RosterError {
    #[error("unknown student: {0}")]
    UnknownStudent(String),

    #[error("no pending suggestion for student {0}")]
    NoSuggestion(String),

    #[error("attendance incomplete: {remaining} student(s) still unmarked")]
    Incomplete { remaining: usize },

    #[error("confidence {0} outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("duplicate student id in roster: {0}")]
    DuplicateStudent(String),

    #[error("session has unsaved changes")]
    UnsavedChanges,
}

pub type Result<T> = std::result::Result<T, RosterError>;
