use std::path::Path;

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use uuid::Uuid;

use roll_core::{ClassRoster, Counts, SessionSnapshot, Status, Student, StudentRecord};

use crate::error::{Result, StoreError};
use crate::schema;

pub struct Store {
    conn: Connection,
}

/// One class/section pair with its enrollment count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SectionSummary {
    pub class_id: String,
    pub class_name: String,
    pub section_id: String,
    pub section_name: String,
    pub students: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmissionSummary {
    pub id: Uuid,
    pub class_id: String,
    pub section_id: String,
    pub date: NaiveDate,
    pub submitted_at: String,
    pub present: usize,
    pub absent: usize,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Roster definitions ---

    pub fn upsert_class(&self, class_id: &str, name: &str) -> Result<()> {
        upsert_class_on(&self.conn, class_id, name)
    }

    pub fn upsert_section(&self, class_id: &str, section_id: &str, name: &str) -> Result<()> {
        upsert_section_on(&self.conn, class_id, section_id, name)
    }

    /// Insert or update a student and place them at `position` in the
    /// section's roster order.
    pub fn enroll(
        &self,
        class_id: &str,
        section_id: &str,
        student: &Student,
        position: usize,
    ) -> Result<()> {
        enroll_on(&self.conn, class_id, section_id, student, position)
    }

    /// Ordered roster for one class/section.
    pub fn list_students(&self, class_id: &str, section_id: &str) -> Result<ClassRoster> {
        let names: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT c.name, s.name FROM sections s
                 JOIN classes c ON c.id = s.class_id
                 WHERE s.class_id = ?1 AND s.id = ?2",
                params![class_id, section_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((class_name, section_name)) = names else {
            return Err(StoreError::NotFound(format!(
                "class '{class_id}' section '{section_id}'"
            )));
        };

        let mut stmt = self.conn.prepare(
            "SELECT st.id, st.display_name, st.roll_number
             FROM enrollments e JOIN students st ON st.id = e.student_id
             WHERE e.class_id = ?1 AND e.section_id = ?2
             ORDER BY e.position, st.roll_number",
        )?;
        let students = stmt
            .query_map(params![class_id, section_id], |row| {
                Ok(Student {
                    id: row.get(0)?,
                    display_name: row.get(1)?,
                    roll_number: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ClassRoster {
            class_name,
            section_name,
            students,
        })
    }

    pub fn list_sections(&self) -> Result<Vec<SectionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name, s.id, s.name,
                    (SELECT COUNT(*) FROM enrollments e
                      WHERE e.class_id = s.class_id AND e.section_id = s.id)
             FROM sections s JOIN classes c ON c.id = s.class_id
             ORDER BY c.id, s.id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SectionSummary {
                    class_id: row.get(0)?,
                    class_name: row.get(1)?,
                    section_id: row.get(2)?,
                    section_name: row.get(3)?,
                    students: row.get::<_, i64>(4)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // --- Submissions ---

    /// Persist a submitted roster. A later submission for the same
    /// class/section/date replaces the earlier one.
    pub fn save_submission(&self, snapshot: &SessionSnapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let date = snapshot.date.to_string();
        tx.execute(
            "DELETE FROM submissions WHERE class_id = ?1 AND section_id = ?2 AND date = ?3",
            params![snapshot.class_id, snapshot.section_id, date],
        )?;
        tx.execute(
            "INSERT INTO submissions
                (id, class_id, section_id, class_name, section_name, date, submitted_at, present, absent)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                snapshot.id.to_string(),
                snapshot.class_id,
                snapshot.section_id,
                snapshot.class_name,
                snapshot.section_name,
                date,
                Utc::now().to_rfc3339(),
                snapshot.counts.present as i64,
                snapshot.counts.absent as i64,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO submission_entries
                    (submission_id, position, student_id, display_name, roll_number, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (position, record) in snapshot.records.iter().enumerate() {
                stmt.execute(params![
                    snapshot.id.to_string(),
                    position as i64,
                    record.id,
                    record.display_name,
                    record.roll_number,
                    record.status.as_str(),
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(
            "stored submission {} for {}/{} on {}",
            snapshot.id,
            snapshot.class_id,
            snapshot.section_id,
            date
        );
        Ok(())
    }

    pub fn list_submissions(&self) -> Result<Vec<SubmissionSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, class_id, section_id, date, submitted_at, present, absent
             FROM submissions ORDER BY date, class_id, section_id",
        )?;
        let rows: Vec<(String, String, String, String, String, i64, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(
                |(id, class_id, section_id, date, submitted_at, present, absent)| {
                    Ok(SubmissionSummary {
                        id: parse_uuid(&id)?,
                        class_id,
                        section_id,
                        date: parse_date(&date)?,
                        submitted_at,
                        present: present as usize,
                        absent: absent as usize,
                    })
                },
            )
            .collect()
    }

    /// Rebuild the submitted roster for export.
    pub fn load_submission(
        &self,
        class_id: &str,
        section_id: &str,
        date: NaiveDate,
    ) -> Result<SessionSnapshot> {
        let header: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT id, class_name, section_name FROM submissions
                 WHERE class_id = ?1 AND section_id = ?2 AND date = ?3",
                params![class_id, section_id, date.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((id, class_name, section_name)) = header else {
            return Err(StoreError::NotFound(format!(
                "submission for class '{class_id}' section '{section_id}' on {date}"
            )));
        };

        let mut stmt = self.conn.prepare(
            "SELECT student_id, display_name, roll_number, status
             FROM submission_entries WHERE submission_id = ?1 ORDER BY position",
        )?;
        let rows: Vec<(String, String, String, String)> = stmt
            .query_map([&id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        let mut counts = Counts::default();
        let mut records = Vec::with_capacity(rows.len());
        for (student_id, display_name, roll_number, status) in rows {
            let status: Status = status.parse().map_err(StoreError::InvalidData)?;
            match status {
                Status::Present => counts.present += 1,
                Status::Absent => counts.absent += 1,
                Status::Unmarked => counts.unmarked += 1,
            }
            records.push(StudentRecord {
                id: student_id,
                display_name,
                roll_number,
                status,
                suggestion: None,
            });
        }

        Ok(SessionSnapshot {
            id: parse_uuid(&id)?,
            class_id: class_id.to_string(),
            section_id: section_id.to_string(),
            class_name,
            section_name,
            date,
            records,
            counts,
            dirty: false,
        })
    }
}

// --- Statement helpers shared with transactional imports ---

pub(crate) fn upsert_class_on(conn: &Connection, class_id: &str, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO classes (id, name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET name = excluded.name",
        params![class_id, name],
    )?;
    Ok(())
}

pub(crate) fn upsert_section_on(
    conn: &Connection,
    class_id: &str,
    section_id: &str,
    name: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sections (class_id, id, name) VALUES (?1, ?2, ?3)
         ON CONFLICT(class_id, id) DO UPDATE SET name = excluded.name",
        params![class_id, section_id, name],
    )?;
    Ok(())
}

pub(crate) fn enroll_on(
    conn: &Connection,
    class_id: &str,
    section_id: &str,
    student: &Student,
    position: usize,
) -> Result<()> {
    conn.execute(
        "INSERT INTO students (id, display_name, roll_number) VALUES (?1, ?2, ?3)
         ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name,
                                       roll_number = excluded.roll_number",
        params![student.id, student.display_name, student.roll_number],
    )?;
    conn.execute(
        "INSERT INTO enrollments (class_id, section_id, student_id, position)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(class_id, section_id, student_id) DO UPDATE SET position = excluded.position",
        params![class_id, section_id, student.id, position as i64],
    )?;
    Ok(())
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| StoreError::InvalidData(format!("bad UUID '{s}': {e}")))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    s.parse()
        .map_err(|e| StoreError::InvalidData(format!("bad date '{s}': {e}")))
}
