use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use roll_core::{
    ClassifierResult, CompletionGate, Counts, DirtyTracker, Mark, Session, SessionSnapshot,
    Source, Suggestion,
};

use crate::collab::{RosterSource, RosterSourceError, SubmissionSink, TransportError};
use crate::config::EngineConfig;
use crate::coordinator::{ClassifierCoordinator, ClassifierMap, JobHandle};
use crate::error::{EngineError, Result};
use crate::state::{ActiveSession, EngineState, JobStatus, SharedState};

/// Derived figures for the active session.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub session_id: Uuid,
    pub counts: Counts,
    pub total: usize,
    pub attendance_rate: f64,
    pub attendance_percent: u32,
    pub can_submit: bool,
    pub dirty: bool,
}

/// Returned by a successful submit. The session it names is retired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SubmitReceipt {
    pub session_id: Uuid,
    pub class_id: String,
    pub section_id: String,
    pub date: NaiveDate,
    pub counts: Counts,
}

/// Owns the single active session and serializes every access to it.
#[derive(Clone)]
pub struct SessionManager {
    state: SharedState,
    roster_source: Arc<dyn RosterSource>,
    submission: Arc<dyn SubmissionSink>,
    coordinator: ClassifierCoordinator,
    config: EngineConfig,
}

impl SessionManager {
    pub fn new(
        roster_source: Arc<dyn RosterSource>,
        classifiers: ClassifierMap,
        submission: Arc<dyn SubmissionSink>,
        config: EngineConfig,
    ) -> Self {
        let state: SharedState = Arc::new(Mutex::new(EngineState::default()));
        let coordinator =
            ClassifierCoordinator::new(state.clone(), classifiers, config.classifier_timeout());
        Self {
            state,
            roster_source,
            submission,
            coordinator,
            config,
        }
    }

    pub fn coordinator(&self) -> &ClassifierCoordinator {
        &self.coordinator
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // --- Lifecycle ---

    /// Fetch the roster and make a fresh session active, retiring any
    /// previous one. A dirty previous session is only replaced when
    /// `discard_unsaved` is set; otherwise the load fails with
    /// [`EngineError::UnsavedChanges`].
    ///
    /// The roster is fetched without holding the lock, so the dirty check is
    /// repeated under the same lock acquisition that swaps the session in.
    pub async fn load(
        &self,
        class_id: &str,
        section_id: &str,
        date: NaiveDate,
        discard_unsaved: bool,
    ) -> Result<SessionSnapshot> {
        self.check_replaceable(discard_unsaved).await?;

        let timeout = self.config.roster_timeout();
        let fetched =
            tokio::time::timeout(timeout, self.roster_source.list_students(class_id, section_id))
                .await;

        let class_roster = match fetched {
            Ok(Ok(roster)) => roster,
            Ok(Err(RosterSourceError::NotFound)) => {
                return Err(EngineError::NotFound {
                    class_id: class_id.to_string(),
                    section_id: section_id.to_string(),
                });
            }
            Ok(Err(RosterSourceError::Transport(e))) => {
                warn!(class_id, section_id, "roster fetch failed: {e}");
                return Err(e.into());
            }
            Err(_) => {
                let e = TransportError::timed_out("roster fetch", timeout);
                warn!(class_id, section_id, "{e}");
                return Err(e.into());
            }
        };

        let session = Session::new(class_id, section_id, date, class_roster)?;
        let snapshot = session.snapshot();

        let mut state = self.state.lock().await;
        if let Some(active) = state.active.as_ref() {
            DirtyTracker::check_discard(&active.session, discard_unsaved)?;
        }
        if let Some(old) = state.retire() {
            debug!(retired = %old.id(), dirty = old.is_dirty(), "replacing active session");
        }
        state.active = Some(ActiveSession::new(session));

        info!(
            session_id = %snapshot.id,
            class_id,
            section_id,
            %date,
            students = snapshot.records.len(),
            "session loaded"
        );
        Ok(snapshot)
    }

    async fn check_replaceable(&self, discard_unsaved: bool) -> Result<()> {
        let state = self.state.lock().await;
        match state.active.as_ref() {
            Some(active) => Ok(DirtyTracker::check_discard(&active.session, discard_unsaved)?),
            None => Ok(()),
        }
    }

    /// Retire the active session without submitting. A dirty session is only
    /// dropped when `confirm` is set.
    pub async fn discard(&self, confirm: bool) -> Result<Uuid> {
        let mut state = self.state.lock().await;
        let active = state.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        DirtyTracker::check_discard(&active.session, confirm)?;
        let id = active.session.id();
        state.retire();
        info!(session_id = %id, "session discarded");
        Ok(id)
    }

    pub async fn active_session_id(&self) -> Option<Uuid> {
        let state = self.state.lock().await;
        state.active.as_ref().map(|a| a.session.id())
    }

    // --- Marking ---

    pub async fn set_manual_status(&self, student_id: &str, mark: Mark) -> Result<()> {
        self.with_session(|s| s.set_manual_status(student_id, mark))
            .await?;
        debug!(student_id, %mark, "manual mark");
        Ok(())
    }

    /// Apply the student's pending suggestion as if it were a manual mark.
    pub async fn accept_suggestion(&self, student_id: &str) -> Result<Suggestion> {
        let accepted = self
            .with_session(|s| s.accept_suggestion(student_id))
            .await?;
        debug!(student_id, source = %accepted.source, "suggestion accepted");
        Ok(accepted)
    }

    /// Attach a suggestion directly, outside any classifier job.
    pub async fn merge_suggestion(&self, result: &ClassifierResult) -> Result<()> {
        self.with_session(|s| s.merge_suggestion(result)).await
    }

    // --- Queries ---

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let state = self.state.lock().await;
        let active = state.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        Ok(active.session.snapshot())
    }

    pub async fn summary(&self) -> Result<Summary> {
        let state = self.state.lock().await;
        let active = state.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        let session = &active.session;
        let counts = session.counts();
        Ok(Summary {
            session_id: session.id(),
            counts,
            total: counts.total(),
            attendance_rate: counts.attendance_rate(),
            attendance_percent: counts.attendance_percent(),
            can_submit: CompletionGate::can_submit(session),
            dirty: DirtyTracker::is_dirty(session),
        })
    }

    /// False when no session is active.
    pub async fn is_dirty(&self) -> bool {
        let state = self.state.lock().await;
        state
            .active
            .as_ref()
            .is_some_and(|a| DirtyTracker::is_dirty(&a.session))
    }

    pub async fn can_submit(&self) -> Result<bool> {
        let state = self.state.lock().await;
        let active = state.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        Ok(CompletionGate::can_submit(&active.session))
    }

    // --- Submission ---

    /// Validate and hand the final records to the submission collaborator.
    ///
    /// The lock is held for the whole call so no mark can slip in between
    /// validation and delivery. On success the session is clean and retired;
    /// on failure it is left exactly as it was.
    pub async fn submit(&self) -> Result<SubmitReceipt> {
        let mut state = self.state.lock().await;
        let active = state.active.as_mut().ok_or(EngineError::NoActiveSession)?;

        CompletionGate::validate(&active.session)?;
        let snapshot = active.session.snapshot();

        let timeout = self.config.submit_timeout();
        match tokio::time::timeout(timeout, self.submission.submit(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(session_id = %snapshot.id, "submission failed: {e}");
                return Err(e.into());
            }
            Err(_) => {
                let e = TransportError::timed_out("submission", timeout);
                warn!(session_id = %snapshot.id, "{e}");
                return Err(e.into());
            }
        }

        active.session.mark_clean();
        state.retire();

        info!(
            session_id = %snapshot.id,
            present = snapshot.counts.present,
            absent = snapshot.counts.absent,
            "attendance submitted"
        );
        Ok(SubmitReceipt {
            session_id: snapshot.id,
            class_id: snapshot.class_id,
            section_id: snapshot.section_id,
            date: snapshot.date,
            counts: snapshot.counts,
        })
    }

    // --- Classifiers ---

    pub async fn start_classifier(&self, source: Source) -> Result<JobHandle> {
        self.coordinator.start(source).await
    }

    pub async fn job_status(&self, source: Source) -> Result<JobStatus> {
        self.coordinator.status(source).await
    }

    async fn with_session<T>(
        &self,
        f: impl FnOnce(&mut Session) -> roll_core::Result<T>,
    ) -> Result<T> {
        let mut state = self.state.lock().await;
        let active = state.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        Ok(f(&mut active.session)?)
    }
}
