//! In-process record store. Rows are numbered from 1 in enrollment order,
//! like the rows of the roster sheet.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uniform_kernel::{
    PendingRequestRow, PolicyMessage, PortalError, RequestStatus, RowId, SizeRequest,
    StudentProfile, StudentRecord,
};

use super::{status_conflict, RecordStore};

#[derive(Default)]
struct Sheet {
    rows: Vec<StudentRecord>,
    policy: PolicyMessage,
}

impl Sheet {
    fn row_of(&self, student_id: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.student_id == student_id)
    }

    fn row_mut(&mut self, row: RowId) -> Option<&mut StudentRecord> {
        let index = usize::try_from(row).ok()?.checked_sub(1)?;
        self.rows.get_mut(index)
    }
}

#[derive(Default)]
pub struct InMemoryRecordStore {
    sheet: Mutex<Sheet>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sheet(&self) -> Result<MutexGuard<'_, Sheet>, PortalError> {
        self.sheet
            .lock()
            .map_err(|e| PortalError::store("record sheet lock poisoned", e))
    }
}

fn apply_status(
    record: &mut StudentRecord,
    what: impl std::fmt::Display,
    expected: &[RequestStatus],
    next: RequestStatus,
    at: DateTime<Utc>,
) -> Result<(), PortalError> {
    if !expected.contains(&record.status) {
        return Err(status_conflict(what, record.status, expected));
    }
    record.status = next;
    record.updated_at = Some(at);
    Ok(())
}

impl RecordStore for InMemoryRecordStore {
    fn enroll(&self, student_id: &str, profile: &StudentProfile) -> Result<RowId, PortalError> {
        let mut sheet = self.sheet()?;
        if let Some(index) = sheet.row_of(student_id) {
            sheet.rows[index].profile = profile.clone();
            return Ok(index as RowId + 1);
        }
        sheet
            .rows
            .push(StudentRecord::enrolled(student_id, profile.clone()));
        Ok(sheet.rows.len() as RowId)
    }

    fn find_student(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError> {
        let sheet = self.sheet()?;
        Ok(sheet.row_of(student_id).map(|i| sheet.rows[i].clone()))
    }

    fn list_queued(&self) -> Result<Vec<PendingRequestRow>, PortalError> {
        let sheet = self.sheet()?;
        Ok(sheet
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.status.is_queued())
            .map(|(i, r)| PendingRequestRow {
                row: i as RowId + 1,
                record: r.clone(),
            })
            .collect())
    }

    fn list_records(&self) -> Result<Vec<StudentRecord>, PortalError> {
        Ok(self.sheet()?.rows.clone())
    }

    fn transition_row(
        &self,
        row: RowId,
        expected: RequestStatus,
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError> {
        let mut sheet = self.sheet()?;
        let record = sheet
            .row_mut(row)
            .ok_or_else(|| PortalError::NotFound(format!("row {row}")))?;
        apply_status(record, format_args!("row {row}"), &[expected], next, at)?;
        Ok(record.clone())
    }

    fn transition_student(
        &self,
        student_id: &str,
        expected: &[RequestStatus],
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError> {
        let mut sheet = self.sheet()?;
        let index = sheet
            .row_of(student_id)
            .ok_or_else(|| PortalError::NotFound(format!("student {student_id}")))?;
        let record = &mut sheet.rows[index];
        apply_status(record, format_args!("student {student_id}"), expected, next, at)?;
        Ok(record.clone())
    }

    fn write_submission(
        &self,
        student_id: &str,
        expected: &[RequestStatus],
        request: &SizeRequest,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError> {
        let mut sheet = self.sheet()?;
        let index = sheet
            .row_of(student_id)
            .ok_or_else(|| PortalError::NotFound(format!("student {student_id}")))?;
        let record = &mut sheet.rows[index];
        apply_status(
            record,
            format_args!("student {student_id}"),
            expected,
            RequestStatus::Pending,
            at,
        )?;
        record.sizes = request.sizes.clone();
        record.notes = request.notes.clone();
        Ok(record.clone())
    }

    fn load_policy(&self) -> Result<PolicyMessage, PortalError> {
        Ok(self.sheet()?.policy.clone())
    }

    fn save_policy(&self, message: &PolicyMessage) -> Result<(), PortalError> {
        self.sheet()?.policy = message.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract::{assert_record_store_contract, profile};

    #[test]
    fn record_store_contract_in_memory() {
        let store = InMemoryRecordStore::new();
        assert_record_store_contract(&store, "memory");
    }

    #[test]
    fn row_zero_is_never_a_valid_handle() {
        let store = InMemoryRecordStore::new();
        store.enroll("1", &profile("One")).unwrap();
        let err = store
            .transition_row(0, RequestStatus::Pending, RequestStatus::Approved, Utc::now())
            .unwrap_err();
        assert!(matches!(err, PortalError::NotFound(_)));
    }
}
