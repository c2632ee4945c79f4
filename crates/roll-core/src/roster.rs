use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};
use crate::record::{ClassifierResult, Mark, Status, Student, StudentRecord, Suggestion};

/// Attendance totals for a roster, computed in a single pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub present: usize,
    pub absent: usize,
    pub unmarked: usize,
}

impl Counts {
    pub fn total(&self) -> usize {
        self.present + self.absent + self.unmarked
    }

    /// `present / (present + absent)`, zero while nobody is marked.
    pub fn attendance_rate(&self) -> f64 {
        let decided = self.present + self.absent;
        if decided == 0 {
            0.0
        } else {
            self.present as f64 / decided as f64
        }
    }

    /// Attendance rate as a whole-number percentage.
    pub fn attendance_percent(&self) -> u32 {
        (self.attendance_rate() * 100.0).round() as u32
    }
}

/// The authoritative table of student records for one session.
///
/// Records keep roster order; the id index points into `records`. Every
/// mutating method validates the target before writing, so a rejected call
/// leaves the table exactly as it was.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    records: Vec<StudentRecord>,
    index: HashMap<String, usize>,
}

impl Roster {
    /// Build an all-unmarked roster. Duplicate ids are rejected.
    pub fn from_students(students: impl IntoIterator<Item = Student>) -> Result<Self> {
        let mut roster = Self::default();
        for student in students {
            if roster.index.contains_key(&student.id) {
                return Err(RosterError::DuplicateStudent(student.id));
            }
            roster
                .index
                .insert(student.id.clone(), roster.records.len());
            roster.records.push(StudentRecord::unmarked(student));
        }
        Ok(roster)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, student_id: &str) -> Option<&StudentRecord> {
        self.index.get(student_id).map(|&i| &self.records[i])
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.index.contains_key(student_id)
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    fn record_mut(&mut self, student_id: &str) -> Result<&mut StudentRecord> {
        match self.index.get(student_id) {
            Some(&i) => Ok(&mut self.records[i]),
            None => Err(RosterError::UnknownStudent(student_id.to_string())),
        }
    }

    /// Manual decision: sets the status and drops any pending suggestion.
    pub fn set_manual_status(&mut self, student_id: &str, mark: Mark) -> Result<()> {
        let record = self.record_mut(student_id)?;
        record.status = mark.into();
        record.suggestion = None;
        Ok(())
    }

    /// Attach a suggestion, replacing whatever was pending. Status is not
    /// touched.
    pub fn merge_suggestion(&mut self, result: &ClassifierResult) -> Result<()> {
        let record = self.record_mut(&result.student_id)?;
        record.suggestion = Some(result.suggestion());
        Ok(())
    }

    /// Apply the pending suggestion as if it were a manual mark.
    pub fn accept_suggestion(&mut self, student_id: &str) -> Result<Suggestion> {
        let record = self.record_mut(student_id)?;
        let suggestion = record
            .suggestion
            .ok_or_else(|| RosterError::NoSuggestion(student_id.to_string()))?;
        self.set_manual_status(student_id, suggestion.suggested)?;
        Ok(suggestion)
    }

    pub fn counts(&self) -> Counts {
        let mut counts = Counts::default();
        for record in &self.records {
            match record.status {
                Status::Present => counts.present += 1,
                Status::Absent => counts.absent += 1,
                Status::Unmarked => counts.unmarked += 1,
            }
        }
        counts
    }
}
