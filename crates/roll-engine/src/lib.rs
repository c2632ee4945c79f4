//! Attendance session engine.
//!
//! Wraps the roster model from `roll-core` in a single active session guarded
//! by one async lock, runs classifier jobs against it in the background, and
//! reaches the outside world only through the traits in [`collab`].

pub mod collab;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod manager;
pub mod state;

pub use collab::{
    Classifier, ClassifierInput, RawSuggestion, RosterSource, RosterSourceError, SubmissionSink,
    SuggestionStream, TransportError,
};
pub use config::EngineConfig;
pub use coordinator::{ClassifierCoordinator, ClassifierMap, JobHandle};
pub use error::{EngineError, Result};
pub use manager::{SessionManager, SubmitReceipt, Summary};
pub use state::{JobReport, JobState, JobStatus};
