//! Collaborator contracts.
//!
//! The engine defines no wire format: roster lookup, classification and
//! submission are reached only through these traits, and any transport
//! (HTTP, RPC, a local database, an in-process stub) may implement them.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use roll_core::{ClassRoster, Mark, Session, SessionSnapshot};

/// A collaborator call failed: unreachable, timed out or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn timed_out(what: &str, after: Duration) -> Self {
        Self(format!("{what} timed out after {}ms", after.as_millis()))
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterSourceError {
    #[error("class/section not found")]
    NotFound,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Ordered students for a class/section.
    async fn list_students(
        &self,
        class_id: &str,
        section_id: &str,
    ) -> Result<ClassRoster, RosterSourceError>;
}

/// What a classifier job is told about the session it is classifying.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierInput {
    pub session_id: Uuid,
    pub class_id: String,
    pub section_id: String,
    pub date: NaiveDate,
    pub student_ids: Vec<String>,
}

impl ClassifierInput {
    pub fn for_session(session: &Session) -> Self {
        Self {
            session_id: session.id(),
            class_id: session.class_id().to_string(),
            section_id: session.section_id().to_string(),
            date: session.date(),
            student_ids: session
                .roster()
                .records()
                .iter()
                .map(|r| r.id.clone())
                .collect(),
        }
    }
}

/// One suggestion as produced by a classifier, before validation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSuggestion {
    pub student_id: String,
    pub confidence: f64,
    pub suggested: Mark,
}

pub type SuggestionStream = BoxStream<'static, Result<RawSuggestion, TransportError>>;

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Start classification. Items arrive in production order; an `Err`
    /// item aborts the job.
    async fn invoke(&self, input: ClassifierInput) -> Result<SuggestionStream, TransportError>;
}

#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn submit(&self, snapshot: &SessionSnapshot) -> Result<(), TransportError>;
}
