use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    // Errors are non-fatal; in-memory DBs legitimately fail this.
    if conn
        .execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
        .is_ok()
    {
        tracing::info!("startup WAL checkpoint complete");
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS classes (
            id   TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sections (
            class_id TEXT NOT NULL REFERENCES classes(id),
            id       TEXT NOT NULL,
            name     TEXT NOT NULL,
            PRIMARY KEY (class_id, id)
        );

        CREATE TABLE IF NOT EXISTS students (
            id           TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            roll_number  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS enrollments (
            class_id   TEXT NOT NULL,
            section_id TEXT NOT NULL,
            student_id TEXT NOT NULL REFERENCES students(id),
            position   INTEGER NOT NULL,
            PRIMARY KEY (class_id, section_id, student_id),
            FOREIGN KEY (class_id, section_id) REFERENCES sections(class_id, id)
        );

        CREATE TABLE IF NOT EXISTS submissions (
            id           TEXT PRIMARY KEY,
            class_id     TEXT NOT NULL,
            section_id   TEXT NOT NULL,
            class_name   TEXT NOT NULL DEFAULT '',
            section_name TEXT NOT NULL DEFAULT '',
            date         TEXT NOT NULL,
            submitted_at TEXT NOT NULL,
            present      INTEGER NOT NULL,
            absent       INTEGER NOT NULL,
            UNIQUE (class_id, section_id, date)
        );

        CREATE TABLE IF NOT EXISTS submission_entries (
            submission_id TEXT NOT NULL REFERENCES submissions(id) ON DELETE CASCADE,
            position      INTEGER NOT NULL,
            student_id    TEXT NOT NULL,
            display_name  TEXT NOT NULL,
            roll_number   TEXT NOT NULL,
            status        TEXT NOT NULL,
            PRIMARY KEY (submission_id, student_id)
        );

        CREATE INDEX IF NOT EXISTS idx_enroll_section ON enrollments(class_id, section_id);
        CREATE INDEX IF NOT EXISTS idx_entries_submission ON submission_entries(submission_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}
