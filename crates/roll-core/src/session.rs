use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::record::{ClassRoster, ClassifierResult, Mark, StudentRecord, Suggestion};
use crate::roster::{Counts, Roster};

/// One class/section/date attendance-marking unit.
///
/// Every roster mutation goes through here so the dirty flag can never fall
/// out of step with the records.
#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    class_id: String,
    section_id: String,
    class_name: String,
    section_name: String,
    date: NaiveDate,
    roster: Roster,
    dirty: bool,
}

impl Session {
    /// Fresh session: every record unmarked, no suggestions, clean.
    pub fn new(
        class_id: impl Into<String>,
        section_id: impl Into<String>,
        date: NaiveDate,
        class_roster: ClassRoster,
    ) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            class_id: class_id.into(),
            section_id: section_id.into(),
            class_name: class_roster.class_name,
            section_name: class_roster.section_name,
            date,
            roster: Roster::from_students(class_roster.students)?,
            dirty: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn section_id(&self) -> &str {
        &self.section_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn counts(&self) -> Counts {
        self.roster.counts()
    }

    pub fn set_manual_status(&mut self, student_id: &str, mark: Mark) -> Result<()> {
        self.roster.set_manual_status(student_id, mark)?;
        self.dirty = true;
        Ok(())
    }

    pub fn merge_suggestion(&mut self, result: &ClassifierResult) -> Result<()> {
        self.roster.merge_suggestion(result)?;
        self.dirty = true;
        Ok(())
    }

    pub fn accept_suggestion(&mut self, student_id: &str) -> Result<Suggestion> {
        let applied = self.roster.accept_suggestion(student_id)?;
        self.dirty = true;
        Ok(applied)
    }

    /// Called once the roster has been handed off successfully.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            class_id: self.class_id.clone(),
            section_id: self.section_id.clone(),
            class_name: self.class_name.clone(),
            section_name: self.section_name.clone(),
            date: self.date,
            records: self.roster.records().to_vec(),
            counts: self.roster.counts(),
            dirty: self.dirty,
        }
    }
}

/// Immutable copy of a session, safe to hand to collaborators and callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub class_id: String,
    pub section_id: String,
    pub class_name: String,
    pub section_name: String,
    pub date: NaiveDate,
    pub records: Vec<StudentRecord>,
    pub counts: Counts,
    pub dirty: bool,
}

impl SessionSnapshot {
    pub fn record(&self, student_id: &str) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == student_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Source, Status, Student};

    fn session() -> Session {
        Session::new(
            "class-1",
            "sec-a",
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            ClassRoster {
                class_name: "Computer Science".into(),
                section_name: "Section A".into(),
                students: vec![
                    Student::new("1", "Alice Johnson", "CS001"),
                    Student::new("2", "Bob Smith", "CS002"),
                ],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_new_session_is_clean() {
        let s = session();
        assert!(!s.is_dirty());
        assert_eq!(s.counts().unmarked, 2);
        assert_eq!(s.class_id(), "class-1");
    }

    #[test]
    fn test_each_mutation_sets_dirty() {
        let mut s = session();
        let result = ClassifierResult::new(Source::Voice, "2", 0.5, Mark::Present).unwrap();
        s.merge_suggestion(&result).unwrap();
        assert!(s.is_dirty());

        s.mark_clean();
        s.accept_suggestion("2").unwrap();
        assert!(s.is_dirty());

        s.mark_clean();
        s.set_manual_status("1", Mark::Absent).unwrap();
        assert!(s.is_dirty());
    }

    #[test]
    fn test_rejected_mutation_leaves_dirty_alone() {
        let mut s = session();
        assert!(s.set_manual_status("99", Mark::Present).is_err());
        assert!(s.accept_suggestion("1").is_err());
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut s = session();
        let before = s.snapshot();
        s.set_manual_status("1", Mark::Present).unwrap();
        assert_eq!(before.record("1").unwrap().status, Status::Unmarked);
        assert_eq!(s.snapshot().record("1").unwrap().status, Status::Present);
        assert_eq!(before.class_name, "Computer Science");
        assert_eq!(before.id, s.id());
    }
}
