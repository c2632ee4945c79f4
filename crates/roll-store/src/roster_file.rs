//! TOML roster definitions.
//!
//! ```toml
//! [[class]]
//! id = "class-1"
//! name = "Computer Science"
//!
//! [[class.section]]
//! id = "sec-a"
//! name = "Section A"
//! students = [
//!     { id = "1", name = "Alice Johnson", roll = "CS001" },
//! ]
//! ```
//!
//! Student order in the file becomes roster display order.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use roll_core::Student;

use crate::error::{Result, StoreError};
use crate::store::{Store, enroll_on, upsert_class_on, upsert_section_on};

#[derive(Debug, Deserialize)]
pub struct RosterFile {
    #[serde(rename = "class", default)]
    pub classes: Vec<ClassDef>,
}

#[derive(Debug, Deserialize)]
pub struct ClassDef {
    pub id: String,
    pub name: String,
    #[serde(rename = "section", default)]
    pub sections: Vec<SectionDef>,
}

#[derive(Debug, Deserialize)]
pub struct SectionDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<StudentDef>,
}

#[derive(Debug, Deserialize)]
pub struct StudentDef {
    pub id: String,
    pub name: String,
    pub roll: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub classes: usize,
    pub sections: usize,
    pub enrollments: usize,
}

impl RosterFile {
    pub fn parse(content: &str) -> Result<Self> {
        let file: RosterFile = toml::from_str(content)
            .map_err(|e| StoreError::InvalidData(format!("invalid roster TOML: {e}")))?;
        file.check()?;
        Ok(file)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    /// A section may not list the same student twice.
    fn check(&self) -> Result<()> {
        for class in &self.classes {
            for section in &class.sections {
                let mut seen = HashSet::new();
                for student in &section.students {
                    if !seen.insert(student.id.as_str()) {
                        return Err(StoreError::InvalidData(format!(
                            "student '{}' listed twice in {}/{}",
                            student.id, class.id, section.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Store {
    /// Upsert every class, section and enrollment from a roster file in a
    /// single transaction.
    pub fn import_roster(&self, file: &RosterFile) -> Result<ImportSummary> {
        let tx = self.conn().unchecked_transaction()?;
        let mut summary = ImportSummary::default();

        for class in &file.classes {
            upsert_class_on(&tx, &class.id, &class.name)?;
            summary.classes += 1;

            for section in &class.sections {
                upsert_section_on(&tx, &class.id, &section.id, &section.name)?;
                summary.sections += 1;

                for (position, s) in section.students.iter().enumerate() {
                    let student = Student::new(&s.id, &s.name, &s.roll);
                    enroll_on(&tx, &class.id, &section.id, &student, position)?;
                    summary.enrollments += 1;
                }
            }
        }

        tx.commit()?;
        tracing::info!(
            "imported {} classes, {} sections, {} enrollments",
            summary.classes,
            summary.sections,
            summary.enrollments
        );
        Ok(summary)
    }

    pub fn import_roster_file(&self, path: &Path) -> Result<ImportSummary> {
        let file = RosterFile::read(path)?;
        self.import_roster(&file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[class]]
id = "class-1"
name = "Computer Science"

[[class.section]]
id = "sec-a"
name = "Section A"
students = [
    { id = "1", name = "Alice Johnson", roll = "CS001" },
    { id = "2", name = "Bob Smith", roll = "CS002" },
]

[[class.section]]
id = "sec-b"
name = "Section B"

[[class]]
id = "class-2"
name = "Mathematics"

[[class.section]]
id = "sec-c"
name = "Section C"
students = [{ id = "2", name = "Bob Smith", roll = "CS002" }]
"#;

    #[test]
    fn test_parse_sample() {
        let file = RosterFile::parse(SAMPLE).unwrap();
        assert_eq!(file.classes.len(), 2);
        assert_eq!(file.classes[0].sections.len(), 2);
        assert_eq!(file.classes[0].sections[0].students[1].roll, "CS002");
        assert!(file.classes[0].sections[1].students.is_empty());
    }

    #[test]
    fn test_import_sample() {
        let store = Store::open_in_memory().unwrap();
        let summary = store
            .import_roster(&RosterFile::parse(SAMPLE).unwrap())
            .unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                classes: 2,
                sections: 3,
                enrollments: 3
            }
        );

        let roster = store.list_students("class-2", "sec-c").unwrap();
        assert_eq!(roster.class_name, "Mathematics");
        assert_eq!(roster.students.len(), 1);

        // Re-import is an upsert, not a duplicate
        store
            .import_roster(&RosterFile::parse(SAMPLE).unwrap())
            .unwrap();
        assert_eq!(store.list_students("class-1", "sec-a").unwrap().students.len(), 2);
    }

    #[test]
    fn test_duplicate_student_in_section_rejected() {
        let content = r#"
[[class]]
id = "c"
name = "C"
[[class.section]]
id = "s"
name = "S"
students = [
    { id = "1", name = "A", roll = "1" },
    { id = "1", name = "A", roll = "1" },
]
"#;
        assert!(matches!(
            RosterFile::parse(content),
            Err(StoreError::InvalidData(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(RosterFile::parse("[[class]\nid=").is_err());
    }
}
