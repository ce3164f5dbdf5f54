//! Student records and the rows of the staff queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PortalError;
use crate::size::UniformSizes;
use crate::status::RequestStatus;

/// Externally assigned student identity.
pub type StudentId = String;

/// Store-native row handle used by staff mutation calls.
pub type RowId = u64;

/// Display-only fields captured at enrollment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub english_name: String,
    pub arabic_name: String,
    pub grade: String,
    pub class_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub student_id: StudentId,
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(flatten)]
    pub sizes: UniformSizes,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub status: RequestStatus,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentRecord {
    /// A freshly enrolled student: no sizes, no status.
    pub fn enrolled(student_id: impl Into<StudentId>, profile: StudentProfile) -> Self {
        Self {
            student_id: student_id.into(),
            profile,
            sizes: UniformSizes::default(),
            notes: String::new(),
            status: RequestStatus::Unset,
            updated_at: None,
        }
    }

    /// True iff any of shirt/trousers/jacket is set.
    pub fn has_existing_data(&self) -> bool {
        self.sizes.has_any()
    }
}

/// One entry of the staff queue: a record plus its row handle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequestRow {
    pub row: RowId,
    pub record: StudentRecord,
}

impl PendingRequestRow {
    pub fn status(&self) -> RequestStatus {
        self.record.status
    }

    pub fn student_id(&self) -> &str {
        &self.record.student_id
    }
}

/// An owner's submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRequest {
    #[serde(flatten)]
    pub sizes: UniformSizes,
    #[serde(default)]
    pub notes: String,
}

impl SizeRequest {
    pub fn new(sizes: UniformSizes, notes: impl Into<String>) -> Self {
        Self {
            sizes,
            notes: notes.into(),
        }
    }

    /// Rejects a submission that selects no size at all. Runs before any
    /// store or network call.
    pub fn validate(&self) -> Result<(), PortalError> {
        if !self.sizes.has_any() {
            return Err(PortalError::Validation(
                "select at least one uniform size".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::size::SizeLabel;

    fn profile() -> StudentProfile {
        StudentProfile {
            english_name: "Sara Ali".into(),
            arabic_name: "سارة علي".into(),
            grade: "Grade 4".into(),
            class_name: "4B".into(),
        }
    }

    #[test]
    fn enrolled_record_has_no_existing_data() {
        let record = StudentRecord::enrolled("KTS-2024-001", profile());
        assert!(!record.has_existing_data());
        assert_eq!(record.status, RequestStatus::Unset);
    }

    #[test]
    fn submission_without_any_size_is_rejected() {
        let empty = SizeRequest::new(UniformSizes::default(), "tall");
        assert!(matches!(empty.validate(), Err(PortalError::Validation(_))));

        let jacket_only = SizeRequest::new(
            UniformSizes::new(None, None, Some(SizeLabel::XL)),
            "",
        );
        assert!(jacket_only.validate().is_ok());
    }

    #[test]
    fn record_serializes_flat() {
        let mut record = StudentRecord::enrolled("7", profile());
        record.sizes.shirt = Some(SizeLabel::S);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["studentId"], "7");
        assert_eq!(json["className"], "4B");
        assert_eq!(json["shirt"], "S");
        assert_eq!(json["trousers"], "");
        assert_eq!(json["status"], "");
    }
}
