//! Engine collaborators backed by the local SQLite store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use roll_core::{ClassRoster, SessionSnapshot};
use roll_engine::{RosterSource, RosterSourceError, SubmissionSink, TransportError};
use roll_store::{Store, StoreError};

pub type SharedStore = Arc<Mutex<Store>>;

pub struct StoreRosterSource {
    store: SharedStore,
}

impl StoreRosterSource {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RosterSource for StoreRosterSource {
    async fn list_students(
        &self,
        class_id: &str,
        section_id: &str,
    ) -> Result<ClassRoster, RosterSourceError> {
        let store = self.store.lock().await;
        match store.list_students(class_id, section_id) {
            Ok(roster) => Ok(roster),
            Err(StoreError::NotFound(_)) => Err(RosterSourceError::NotFound),
            Err(e) => Err(TransportError::new(format!("roster lookup failed: {e}")).into()),
        }
    }
}

pub struct StoreSubmissionSink {
    store: SharedStore,
}

impl StoreSubmissionSink {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SubmissionSink for StoreSubmissionSink {
    async fn submit(&self, snapshot: &SessionSnapshot) -> Result<(), TransportError> {
        let store = self.store.lock().await;
        store
            .save_submission(snapshot)
            .map_err(|e| TransportError::new(format!("failed to save submission: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use roll_core::{Mark, Session};
    use roll_store::RosterFile;

    fn shared_store() -> SharedStore {
        let store = Store::open_in_memory().unwrap();
        store
            .import_roster(
                &RosterFile::parse(
                    r#"
[[class]]
id = "c1"
name = "Physics"
[[class.section]]
id = "s1"
name = "Morning"
students = [{ id = "p1", name = "Ada", roll = "PH01" }]
"#,
                )
                .unwrap(),
            )
            .unwrap();
        Arc::new(Mutex::new(store))
    }

    #[tokio::test]
    async fn test_roster_source_maps_not_found() {
        let source = StoreRosterSource::new(shared_store());
        let roster = source.list_students("c1", "s1").await.unwrap();
        assert_eq!(roster.section_name, "Morning");
        assert_eq!(
            source.list_students("c1", "nope").await,
            Err(RosterSourceError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_sink_persists_snapshot() {
        let store = shared_store();
        let roster = store.lock().await.list_students("c1", "s1").unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let mut session = Session::new("c1", "s1", date, roster).unwrap();
        session.set_manual_status("p1", Mark::Absent).unwrap();

        let sink = StoreSubmissionSink::new(store.clone());
        sink.submit(&session.snapshot()).await.unwrap();

        let saved = store.lock().await.load_submission("c1", "s1", date).unwrap();
        assert_eq!(saved.counts.absent, 1);
        assert_eq!(saved.class_name, "Physics");
    }
}
