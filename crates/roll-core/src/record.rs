use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RosterError;

/// Attendance state of one student within a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unmarked,
    Present,
    Absent,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unmarked => "unmarked",
            Status::Present => "present",
            Status::Absent => "absent",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unmarked" => Ok(Status::Unmarked),
            "present" => Ok(Status::Present),
            "absent" => Ok(Status::Absent),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// A decision: what an operator or a classifier can say about a student.
///
/// `Unmarked` is deliberately not representable here, so neither a manual
/// mark nor a suggestion can put a record back into the unmarked state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Present,
    Absent,
}

impl From<Mark> for Status {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::Present => Status::Present,
            Mark::Absent => Status::Absent,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Status::from(*self).fmt(f)
    }
}

impl FromStr for Mark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "present" => Ok(Mark::Present),
            "absent" => Ok(Mark::Absent),
            other => Err(format!("status must be 'present' or 'absent', got '{other}'")),
        }
    }
}

/// Recognition source producing suggestions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Face,
    Voice,
}

impl Source {
    pub const ALL: [Source; 2] = [Source::Face, Source::Voice];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Face => "face",
            Source::Voice => "voice",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "face" => Ok(Source::Face),
            "voice" => Ok(Source::Voice),
            other => Err(format!("source must be 'face' or 'voice', got '{other}'")),
        }
    }
}

/// Classifier confidence, guaranteed to lie in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, RosterError> {
        // NaN fails both comparisons
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RosterError::InvalidConfidence(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whole-number percentage for display.
    pub fn percent(&self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl TryFrom<f64> for Confidence {
    type Error = RosterError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

/// Informational classifier output attached to a record. Never applied on
/// its own.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub source: Source,
    pub confidence: Confidence,
    pub suggested: Mark,
}

/// A roster entry as delivered by the roster source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub display_name: String,
    pub roll_number: String,
}

impl Student {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        roll_number: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            roll_number: roll_number.into(),
        }
    }
}

/// Ordered student list for one class/section, plus display names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRoster {
    pub class_name: String,
    pub section_name: String,
    pub students: Vec<Student>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub display_name: String,
    pub roll_number: String,
    pub status: Status,
    pub suggestion: Option<Suggestion>,
}

impl StudentRecord {
    pub fn unmarked(student: Student) -> Self {
        Self {
            id: student.id,
            display_name: student.display_name,
            roll_number: student.roll_number,
            status: Status::Unmarked,
            suggestion: None,
        }
    }
}

/// One validated classifier suggestion addressed to a student.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub source: Source,
    pub student_id: String,
    pub confidence: Confidence,
    pub suggested: Mark,
}

impl ClassifierResult {
    pub fn new(
        source: Source,
        student_id: impl Into<String>,
        confidence: f64,
        suggested: Mark,
    ) -> Result<Self, RosterError> {
        Ok(Self {
            source,
            student_id: student_id.into(),
            confidence: Confidence::new(confidence)?,
            suggested,
        })
    }

    pub fn suggestion(&self) -> Suggestion {
        Suggestion {
            source: self.source,
            confidence: self.confidence,
            suggested: self.suggested,
        }
    }
}
