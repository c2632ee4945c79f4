//! Classifier job orchestration.
//!
//! A job is bound to the session that was active when it started. Results
//! are collected first (the whole job runs under one timeout), then merged
//! one at a time, each merge re-checking under the lock that the bound
//! session is still active. Once it is not, the remainder is dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use roll_core::{ClassifierResult, Source};

use crate::collab::{Classifier, ClassifierInput, TransportError};
use crate::error::{EngineError, Result};
use crate::state::{JobReport, JobStatus, SharedState};

pub type ClassifierMap = HashMap<Source, Arc<dyn Classifier>>;

#[derive(Clone)]
pub struct ClassifierCoordinator {
    state: SharedState,
    classifiers: Arc<ClassifierMap>,
    timeout: Duration,
}

/// A running classifier job.
#[derive(Debug)]
pub struct JobHandle {
    source: Source,
    session_id: Uuid,
    task: JoinHandle<Result<JobReport>>,
}

impl JobHandle {
    pub fn source(&self) -> Source {
        self.source
    }

    /// The session the job was started against.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<JobReport> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(EngineError::Transport(TransportError::new(format!(
                "{} classifier task aborted: {e}",
                self.source
            )))),
        }
    }
}

impl ClassifierCoordinator {
    pub(crate) fn new(state: SharedState, classifiers: ClassifierMap, timeout: Duration) -> Self {
        Self {
            state,
            classifiers: Arc::new(classifiers),
            timeout,
        }
    }

    pub fn has_classifier(&self, source: Source) -> bool {
        self.classifiers.contains_key(&source)
    }

    /// Sources with a configured classifier, in stable order.
    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.classifiers.keys().copied().collect();
        sources.sort();
        sources
    }

    /// Start a job for `source` against the active session.
    ///
    /// Fails with `Busy` if a job for the same source is already running for
    /// this session. Jobs for other sources run concurrently.
    pub async fn start(&self, source: Source) -> Result<JobHandle> {
        let classifier = self
            .classifiers
            .get(&source)
            .cloned()
            .ok_or(EngineError::NoClassifier(source))?;

        let input = {
            let mut state = self.state.lock().await;
            let active = state.active.as_mut().ok_or(EngineError::NoActiveSession)?;
            if active.job(source).is_running() {
                return Err(EngineError::Busy(source));
            }
            active.jobs.insert(source, JobStatus::running(source));
            ClassifierInput::for_session(&active.session)
        };

        let session_id = input.session_id;
        info!(%source, %session_id, students = input.student_ids.len(), "classifier job started");

        let task = tokio::spawn(run_job(
            self.state.clone(),
            classifier,
            source,
            input,
            self.timeout,
        ));

        Ok(JobHandle {
            source,
            session_id,
            task,
        })
    }

    /// Job status for `source` within the active session.
    pub async fn status(&self, source: Source) -> Result<JobStatus> {
        let state = self.state.lock().await;
        let active = state.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        Ok(active.job(source))
    }
}

async fn run_job(
    state: SharedState,
    classifier: Arc<dyn Classifier>,
    source: Source,
    input: ClassifierInput,
    timeout: Duration,
) -> Result<JobReport> {
    let session_id = input.session_id;

    let results = match tokio::time::timeout(timeout, collect(classifier.as_ref(), source, input)).await
    {
        Ok(Ok(results)) => results,
        Ok(Err(e)) => return Err(fail_job(&state, source, session_id, e).await),
        Err(_) => {
            let e = TransportError::timed_out(&format!("{source} classifier"), timeout);
            return Err(fail_job(&state, source, session_id, e).await);
        }
    };

    let mut report = JobReport::new(source, session_id, results.len());

    for (i, result) in results.iter().enumerate() {
        let mut guard = state.lock().await;
        let Some(active) = guard.active_for(session_id) else {
            report.stale = results.len() - i;
            debug!(%source, %session_id, dropped = report.stale, "session retired, discarding late results");
            return Ok(report);
        };
        match active.session.merge_suggestion(result) {
            Ok(()) => report.merged += 1,
            Err(e) => {
                warn!(%source, student = %result.student_id, "rejected classifier result: {e}");
                report.rejected += 1;
            }
        }
    }

    let mut guard = state.lock().await;
    if let Some(active) = guard.active_for(session_id) {
        active
            .jobs
            .insert(source, JobStatus::completed(report.clone()));
    }
    info!(
        %source,
        %session_id,
        merged = report.merged,
        rejected = report.rejected,
        "classifier job completed"
    );
    Ok(report)
}

/// Invoke the classifier and drain its stream. Any failure, including a
/// malformed confidence, fails the whole job.
async fn collect(
    classifier: &dyn Classifier,
    source: Source,
    input: ClassifierInput,
) -> std::result::Result<Vec<ClassifierResult>, TransportError> {
    let mut stream = classifier.invoke(input).await?;
    let mut results = Vec::new();
    while let Some(item) = stream.next().await {
        let raw = item?;
        let result = ClassifierResult::new(source, raw.student_id, raw.confidence, raw.suggested)
            .map_err(|e| TransportError::new(format!("malformed {source} result: {e}")))?;
        results.push(result);
    }
    Ok(results)
}

async fn fail_job(
    state: &SharedState,
    source: Source,
    session_id: Uuid,
    error: TransportError,
) -> EngineError {
    warn!(%source, %session_id, "classifier job failed: {error}");
    let mut guard = state.lock().await;
    if let Some(active) = guard.active_for(session_id) {
        active
            .jobs
            .insert(source, JobStatus::failed(source, error.to_string()));
    }
    EngineError::Transport(error)
}
