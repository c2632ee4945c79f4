use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use roll_core::{Session, Source};

/// The single mutual-exclusion boundary: every read and write of the active
/// session, from callers and from classifier jobs alike, goes through this
/// lock.
pub(crate) type SharedState = Arc<Mutex<EngineState>>;

#[derive(Default)]
pub(crate) struct EngineState {
    pub(crate) active: Option<ActiveSession>,
}

pub(crate) struct ActiveSession {
    pub(crate) session: Session,
    pub(crate) jobs: HashMap<Source, JobStatus>,
}

impl ActiveSession {
    pub(crate) fn new(session: Session) -> Self {
        Self {
            session,
            jobs: HashMap::new(),
        }
    }

    pub(crate) fn job(&self, source: Source) -> JobStatus {
        self.jobs
            .get(&source)
            .cloned()
            .unwrap_or_else(|| JobStatus::idle(source))
    }
}

impl EngineState {
    /// The active session, but only if it is still the one identified by
    /// `session_id`.
    pub(crate) fn active_for(&mut self, session_id: Uuid) -> Option<&mut ActiveSession> {
        self.active
            .as_mut()
            .filter(|active| active.session.id() == session_id)
    }

    /// Retire the active session, if any. Outstanding jobs become stale.
    pub(crate) fn retire(&mut self) -> Option<Session> {
        self.active.take().map(|active| active.session)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Outcome of one classifier job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub source: Source,
    pub session_id: Uuid,
    /// Results the classifier delivered.
    pub received: usize,
    pub merged: usize,
    /// Results naming students outside the roster.
    pub rejected: usize,
    /// Results dropped because the session was retired mid-job.
    pub stale: usize,
}

impl JobReport {
    pub(crate) fn new(source: Source, session_id: Uuid, received: usize) -> Self {
        Self {
            source,
            session_id,
            received,
            merged: 0,
            rejected: 0,
            stale: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub source: Source,
    pub state: JobState,
    pub report: Option<JobReport>,
    pub error: Option<String>,
}

impl JobStatus {
    pub(crate) fn idle(source: Source) -> Self {
        Self {
            source,
            state: JobState::Idle,
            report: None,
            error: None,
        }
    }

    pub(crate) fn running(source: Source) -> Self {
        Self {
            state: JobState::Running,
            ..Self::idle(source)
        }
    }

    pub(crate) fn completed(report: JobReport) -> Self {
        Self {
            source: report.source,
            state: JobState::Completed,
            report: Some(report),
            error: None,
        }
    }

    pub(crate) fn failed(source: Source, error: String) -> Self {
        Self {
            state: JobState::Failed,
            error: Some(error),
            ..Self::idle(source)
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}
