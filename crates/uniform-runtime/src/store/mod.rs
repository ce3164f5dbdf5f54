//! Storage façade for student records and the policy message.

use chrono::{DateTime, Utc};
use uniform_kernel::{
    PendingRequestRow, PolicyMessage, PortalError, RequestStatus, RowId, SizeRequest,
    StudentProfile, StudentRecord,
};

pub mod memory;
#[cfg(feature = "sqlite-persistence")]
pub mod sqlite;

pub use memory::InMemoryRecordStore;
#[cfg(feature = "sqlite-persistence")]
pub use sqlite::SqliteRecordStore;

/// Record store contract used by the approval workflow.
///
/// Every status mutation is a compare-and-set against the caller's expected
/// statuses: a missing row or student fails with [PortalError::NotFound], a
/// status outside `expected` fails with [PortalError::Conflict] and nothing is
/// written. Racing staff sessions therefore never double-apply.
pub trait RecordStore: Send + Sync {
    /// Insert a student, or refresh the display fields of an existing one.
    /// Sizes and status of an existing row are left alone.
    fn enroll(&self, student_id: &str, profile: &StudentProfile) -> Result<RowId, PortalError>;

    fn find_student(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError>;

    /// Rows whose status keeps them in the staff queue, in insertion order.
    fn list_queued(&self) -> Result<Vec<PendingRequestRow>, PortalError>;

    /// Every record, in insertion order.
    fn list_records(&self) -> Result<Vec<StudentRecord>, PortalError>;

    /// Move the row at `row` from `expected` to `next`.
    fn transition_row(
        &self,
        row: RowId,
        expected: RequestStatus,
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError>;

    /// Move a student's record to `next` if its status is one of `expected`.
    fn transition_student(
        &self,
        student_id: &str,
        expected: &[RequestStatus],
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError>;

    /// Store sizes and notes and mark the record `Pending`, if its status is
    /// one of `expected`.
    fn write_submission(
        &self,
        student_id: &str,
        expected: &[RequestStatus],
        request: &SizeRequest,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError>;

    fn load_policy(&self) -> Result<PolicyMessage, PortalError>;

    /// Replace the whole policy message.
    fn save_policy(&self, message: &PolicyMessage) -> Result<(), PortalError>;
}

/// Builds the conflict error used by both stores.
pub(crate) fn status_conflict(
    what: impl std::fmt::Display,
    current: RequestStatus,
    expected: &[RequestStatus],
) -> PortalError {
    let expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    PortalError::Conflict(format!(
        "{what} is {current}, expected one of [{}]",
        expected.join(", ")
    ))
}
