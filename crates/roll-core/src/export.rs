//! Roster export formats.
//!
//! JSON carries the full snapshot (including pending suggestions). CSV is the
//! flat sheet an office would import: one row per student in roster order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::SessionSnapshot;

pub const EXPORT_VERSION: &str = "1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("format must be 'json' or 'csv', got '{other}'")),
        }
    }
}

/// Export failures. The writers are fallible even though a well-formed
/// snapshot always serializes.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export produced invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Serialize, Debug)]
struct ExportDocument<'a> {
    version: &'a str,
    attendance_rate: f64,
    session: &'a SessionSnapshot,
}

pub fn export_json(snapshot: &SessionSnapshot) -> Result<String, ExportError> {
    let doc = ExportDocument {
        version: EXPORT_VERSION,
        attendance_rate: snapshot.counts.attendance_rate(),
        session: snapshot,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub const CSV_HEADER: [&str; 7] = [
    "roll_number",
    "student_id",
    "name",
    "status",
    "date",
    "class_id",
    "section_id",
];

pub fn export_csv(snapshot: &SessionSnapshot) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    let date = snapshot.date.to_string();
    for record in &snapshot.records {
        writer.write_record([
            record.roll_number.as_str(),
            record.id.as_str(),
            record.display_name.as_str(),
            record.status.as_str(),
            date.as_str(),
            snapshot.class_id.as_str(),
            snapshot.section_id.as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn export(snapshot: &SessionSnapshot, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => export_json(snapshot),
        ExportFormat::Csv => export_csv(snapshot),
    }
}
