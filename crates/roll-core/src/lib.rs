//! Attendance roster model.
//!
//! Holds the per-session roster and the reconciliation rules between manual
//! marks and classifier suggestions: a suggestion is informational, a manual
//! mark supersedes it, and submission is gated on every student being marked.
//!
//! Zero I/O. Locking, transport and persistence live elsewhere.

pub mod error;
pub mod export;
pub mod gate;
pub mod record;
pub mod roster;
pub mod session;

pub use error::{Result, RosterError};
pub use export::{ExportError, ExportFormat, export, export_csv, export_json};
pub use gate::{CompletionGate, DirtyTracker};
pub use record::{
    ClassRoster, ClassifierResult, Confidence, Mark, Source, Status, Student, StudentRecord,
    Suggestion,
};
pub use roster::{Counts, Roster};
pub use session::{Session, SessionSnapshot};
