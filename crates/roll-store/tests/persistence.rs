//! File-backed store: data written through one handle is visible after
//! reopening the same directory.

use chrono::NaiveDate;
use roll_core::{Mark, Session, Status};
use roll_store::{RosterFile, Store};
use tempfile::TempDir;

const ROSTER: &str = r#"
[[class]]
id = "class-3"
name = "Physics"

[[class.section]]
id = "sec-a"
name = "Section A"
students = [
    { id = "p1", name = "Ada Lovelace", roll = "PH001" },
    { id = "p2", name = "Niels Bohr", roll = "PH002" },
]
"#;

#[test]
fn roster_and_submission_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 10, 1).unwrap();

    {
        let store = Store::open_in_dir(dir.path()).unwrap();
        store.import_roster(&RosterFile::parse(ROSTER).unwrap()).unwrap();

        let roster = store.list_students("class-3", "sec-a").unwrap();
        let mut session = Session::new("class-3", "sec-a", date, roster).unwrap();
        session.set_manual_status("p1", Mark::Present).unwrap();
        session.set_manual_status("p2", Mark::Absent).unwrap();
        store.save_submission(&session.snapshot()).unwrap();
    }

    let store = Store::open_in_dir(dir.path()).unwrap();
    let sections = store.list_sections().unwrap();
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].class_name, "Physics");
    assert_eq!(sections[0].students, 2);

    let loaded = store.load_submission("class-3", "sec-a", date).unwrap();
    assert_eq!(loaded.records[0].status, Status::Present);
    assert_eq!(loaded.records[1].status, Status::Absent);
    assert_eq!(loaded.counts.attendance_rate(), 0.5);
}

#[test]
fn import_roster_file_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("roster.toml");
    std::fs::write(&path, ROSTER).unwrap();

    let store = Store::open_in_memory().unwrap();
    let summary = store.import_roster_file(&path).unwrap();
    assert_eq!(summary.enrollments, 2);
    assert!(store.import_roster_file(&dir.path().join("missing.toml")).is_err());
}
