//! Student roster import from CSV.
//!
//! Expected headers: `studentId,englishName,arabicName,grade,class`. Rows are
//! enrolled in file order; re-importing refreshes display fields and leaves
//! sizes and status untouched.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};
use uniform_kernel::{PortalError, StudentProfile};

use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RosterRow {
    student_id: String,
    #[serde(default)]
    english_name: String,
    #[serde(default)]
    arabic_name: String,
    #[serde(default)]
    grade: String,
    #[serde(rename = "class", default)]
    class_name: String,
}

impl RosterRow {
    fn profile(&self) -> StudentProfile {
        StudentProfile {
            english_name: self.english_name.trim().to_string(),
            arabic_name: self.arabic_name.trim().to_string(),
            grade: self.grade.trim().to_string(),
            class_name: self.class_name.trim().to_string(),
        }
    }
}

/// Import outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RosterReport {
    pub enrolled: usize,
    pub skipped: usize,
}

pub fn import_roster_file(
    store: &dyn RecordStore,
    path: impl AsRef<Path>,
) -> Result<RosterReport, PortalError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| PortalError::Validation(format!("roster {}: {e}", path.display())))?;
    import_roster(store, file)
}

/// Rows with a blank student id are skipped; a malformed row aborts the
/// import with [PortalError::Validation].
pub fn import_roster(store: &dyn RecordStore, reader: impl Read) -> Result<RosterReport, PortalError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_reader(reader);
    let mut report = RosterReport::default();

    for (index, row) in csv.deserialize::<RosterRow>().enumerate() {
        let line = index + 2;
        let row = row.map_err(|e| PortalError::Validation(format!("roster line {line}: {e}")))?;
        let student_id = row.student_id.trim();
        if student_id.is_empty() {
            warn!(line, "roster row without student id skipped");
            report.skipped += 1;
            continue;
        }
        store.enroll(student_id, &row.profile())?;
        report.enrolled += 1;
    }

    info!(enrolled = report.enrolled, skipped = report.skipped, "roster imported");
    Ok(report)
}
