//! Approval workflow: the operations behind every portal action.
//!
//! Staff operations authorize the credential before touching the store, so an
//! invalid credential never mutates anything and never reveals whether the
//! rest of the request was well formed. Owner operations carry no credential.

use chrono::Utc;
use tracing::{debug, info, warn};
use uniform_kernel::{
    PendingRequestRow, PolicyMessage, PortalError, RequestStatus, RowId, SizeRequest,
    SizeSummary, StudentRecord,
};

use crate::credential::{Authorizer, Credential};
use crate::store::RecordStore;

const ANY_STATUS: &[RequestStatus] = &[
    RequestStatus::Unset,
    RequestStatus::Pending,
    RequestStatus::Approved,
    RequestStatus::ModificationRequested,
    RequestStatus::Modifiable,
];

const OWNER_EDITABLE: &[RequestStatus] = &[RequestStatus::Unset, RequestStatus::Modifiable];

const MODIFICATION_REQUESTABLE: &[RequestStatus] = &[
    RequestStatus::Unset,
    RequestStatus::Pending,
    RequestStatus::Approved,
    RequestStatus::Modifiable,
];

pub struct ApprovalWorkflow {
    store: Box<dyn RecordStore>,
    authorizer: Box<dyn Authorizer>,
}

impl ApprovalWorkflow {
    pub fn new(store: impl RecordStore + 'static, authorizer: impl Authorizer + 'static) -> Self {
        Self {
            store: Box::new(store),
            authorizer: Box::new(authorizer),
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Checks a staff credential without touching the store.
    pub fn authorize(&self, credential: &Credential, operation: &str) -> Result<(), PortalError> {
        self.authorizer.authorize(credential).inspect_err(|_| {
            warn!(operation, "rejected staff call with invalid credential");
        })
    }

    pub fn get_message(&self) -> Result<PolicyMessage, PortalError> {
        self.store.load_policy()
    }

    pub fn update_message(
        &self,
        message: &PolicyMessage,
        credential: &Credential,
    ) -> Result<(), PortalError> {
        self.authorize(credential, "updateMessage")?;
        self.store.save_policy(message)?;
        info!(modification = %message.modification, "policy message replaced");
        Ok(())
    }

    /// Looks a student up. A blank id or an unknown student is `Ok(None)`.
    pub fn search(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Ok(None);
        }
        let found = self.store.find_student(student_id)?;
        debug!(student_id, found = found.is_some(), "student search");
        Ok(found)
    }

    /// Owner asks staff for edit access to an existing submission.
    pub fn request_modification(&self, student_id: &str) -> Result<StudentRecord, PortalError> {
        let student_id = student_id.trim();
        let policy = self.store.load_policy()?;
        if !policy.modification.approval_required() {
            return Err(PortalError::Conflict(
                "edits do not need approval while the modification policy is disabled".into(),
            ));
        }
        let record = self
            .store
            .find_student(student_id)?
            .ok_or_else(|| PortalError::NotFound(format!("student {student_id}")))?;
        if !record.has_existing_data() {
            return Err(PortalError::Conflict(format!(
                "student {student_id} has no submission to modify"
            )));
        }

        let updated = self.store.transition_student(
            student_id,
            MODIFICATION_REQUESTABLE,
            RequestStatus::ModificationRequested,
            Utc::now(),
        )?;
        info!(student_id, "modification requested");
        Ok(updated)
    }

    /// Owner submission. Accepted while the record is owner-editable, when it
    /// holds no sizes yet, or at any status while the policy is disabled.
    pub fn submit_request(
        &self,
        student_id: &str,
        request: &SizeRequest,
    ) -> Result<StudentRecord, PortalError> {
        request.validate()?;
        let student_id = student_id.trim();
        let policy = self.store.load_policy()?;
        let record = self
            .store
            .find_student(student_id)?
            .ok_or_else(|| PortalError::NotFound(format!("student {student_id}")))?;

        let expected =
            if !policy.modification.approval_required() || !record.has_existing_data() {
                ANY_STATUS
            } else {
                OWNER_EDITABLE
            };
        let updated = self
            .store
            .write_submission(student_id, expected, request, Utc::now())?;
        info!(student_id, previous = %record.status, "size request submitted");
        Ok(updated)
    }

    pub fn list_pending(&self, credential: &Credential) -> Result<Vec<PendingRequestRow>, PortalError> {
        self.authorize(credential, "admin")?;
        self.store.list_queued()
    }

    /// `Pending` → `Approved`.
    pub fn approve(&self, row: RowId, credential: &Credential) -> Result<StudentRecord, PortalError> {
        self.authorize(credential, "approve")?;
        let updated = self.store.transition_row(
            row,
            RequestStatus::Pending,
            RequestStatus::Approved,
            Utc::now(),
        )?;
        info!(row, student_id = %updated.student_id, "request approved");
        Ok(updated)
    }

    /// `ModificationRequested` → `Modifiable`.
    pub fn allow_edit(
        &self,
        row: RowId,
        credential: &Credential,
    ) -> Result<StudentRecord, PortalError> {
        self.authorize(credential, "allowEdit")?;
        let updated = self.store.transition_row(
            row,
            RequestStatus::ModificationRequested,
            RequestStatus::Modifiable,
            Utc::now(),
        )?;
        info!(row, student_id = %updated.student_id, "edit access granted");
        Ok(updated)
    }

    pub fn fetch_summary(&self, credential: &Credential) -> Result<SizeSummary, PortalError> {
        self.authorize(credential, "summary")?;
        let records = self.store.list_records()?;
        Ok(SizeSummary::from_records(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::SharedSecretAuthorizer;
    use crate::store::contract::profile;
    use crate::store::InMemoryRecordStore;
    use uniform_kernel::{Garment, ModificationPolicy, SizeLabel, UniformSizes};

    const SECRET: &str = "staff-secret";

    fn workflow() -> ApprovalWorkflow {
        let store = InMemoryRecordStore::new();
        for (id, name) in [("1", "One"), ("2", "Two"), ("3", "Three")] {
            store.enroll(id, &profile(name)).unwrap();
        }
        ApprovalWorkflow::new(store, SharedSecretAuthorizer::new(SECRET))
    }

    fn staff() -> Credential {
        Credential::from(SECRET)
    }

    fn sizes(shirt: SizeLabel) -> SizeRequest {
        SizeRequest::new(UniformSizes::new(Some(shirt), Some(SizeLabel::L), None), "")
    }

    fn status_of(wf: &ApprovalWorkflow, id: &str) -> RequestStatus {
        wf.search(id).unwrap().unwrap().status
    }

    #[test]
    fn invalid_credential_fails_before_any_mutation() {
        let wf = workflow();
        wf.submit_request("1", &sizes(SizeLabel::M)).unwrap();
        let bad = Credential::from("nope");

        assert_eq!(wf.list_pending(&bad), Err(PortalError::Unauthorized));
        assert_eq!(wf.approve(1, &bad), Err(PortalError::Unauthorized));
        assert_eq!(wf.approve(404, &bad), Err(PortalError::Unauthorized));
        assert_eq!(wf.allow_edit(1, &bad), Err(PortalError::Unauthorized));
        assert_eq!(wf.fetch_summary(&bad), Err(PortalError::Unauthorized));
        let message = PolicyMessage::new("hi", "", ModificationPolicy::Disabled);
        assert_eq!(
            wf.update_message(&message, &bad),
            Err(PortalError::Unauthorized)
        );

        assert_eq!(status_of(&wf, "1"), RequestStatus::Pending);
        assert_eq!(wf.get_message().unwrap(), PolicyMessage::default());
    }

    #[test]
    fn approve_moves_pending_to_approved_once() {
        let wf = workflow();
        wf.submit_request("2", &sizes(SizeLabel::M)).unwrap();
        let pending = wf.list_pending(&staff()).unwrap();
        assert_eq!(pending.len(), 1);
        let row = pending[0].row;

        wf.approve(row, &staff()).unwrap();
        assert_eq!(status_of(&wf, "2"), RequestStatus::Approved);
        assert!(wf.list_pending(&staff()).unwrap().is_empty());

        assert!(matches!(wf.approve(row, &staff()), Err(PortalError::Conflict(_))));
        assert!(matches!(wf.approve(77, &staff()), Err(PortalError::NotFound(_))));
        assert_eq!(status_of(&wf, "1"), RequestStatus::Unset);
    }

    #[test]
    fn allow_edit_only_applies_to_modification_requests() {
        let wf = workflow();
        wf.submit_request("1", &sizes(SizeLabel::S)).unwrap();
        let row = wf.list_pending(&staff()).unwrap()[0].row;

        assert!(matches!(wf.allow_edit(row, &staff()), Err(PortalError::Conflict(_))));
        wf.approve(row, &staff()).unwrap();
        wf.request_modification("1").unwrap();
        assert_eq!(status_of(&wf, "1"), RequestStatus::ModificationRequested);

        let queued = wf.list_pending(&staff()).unwrap();
        assert_eq!(queued[0].status(), RequestStatus::ModificationRequested);
        assert!(matches!(wf.approve(row, &staff()), Err(PortalError::Conflict(_))));
        wf.allow_edit(row, &staff()).unwrap();
        assert_eq!(status_of(&wf, "1"), RequestStatus::Modifiable);
        assert!(wf.list_pending(&staff()).unwrap().is_empty());
    }

    #[test]
    fn request_modification_preconditions() {
        let wf = workflow();
        assert!(matches!(
            wf.request_modification("missing"),
            Err(PortalError::NotFound(_))
        ));
        assert!(matches!(
            wf.request_modification("1"),
            Err(PortalError::Conflict(_))
        ));

        wf.submit_request("1", &sizes(SizeLabel::S)).unwrap();
        wf.request_modification("1").unwrap();
        assert!(matches!(
            wf.request_modification("1"),
            Err(PortalError::Conflict(_))
        ));

        let disabled = PolicyMessage::new("", "", ModificationPolicy::Disabled);
        wf.update_message(&disabled, &staff()).unwrap();
        wf.submit_request("2", &sizes(SizeLabel::S)).unwrap();
        assert!(matches!(
            wf.request_modification("2"),
            Err(PortalError::Conflict(_))
        ));
    }

    #[test]
    fn submission_gate_follows_policy() {
        let wf = workflow();
        assert!(matches!(
            wf.submit_request("1", &SizeRequest::default()),
            Err(PortalError::Validation(_))
        ));
        assert!(matches!(
            wf.submit_request("ghost", &sizes(SizeLabel::S)),
            Err(PortalError::NotFound(_))
        ));

        wf.submit_request("1", &sizes(SizeLabel::S)).unwrap();
        assert!(matches!(
            wf.submit_request("1", &sizes(SizeLabel::M)),
            Err(PortalError::Conflict(_))
        ));

        let disabled = PolicyMessage::new("", "", ModificationPolicy::Disabled);
        wf.update_message(&disabled, &staff()).unwrap();
        let overwritten = wf.submit_request("1", &sizes(SizeLabel::M)).unwrap();
        assert_eq!(overwritten.sizes.shirt, Some(SizeLabel::M));
        assert_eq!(overwritten.status, RequestStatus::Pending);
    }

    #[test]
    fn summary_counts_current_sizes() {
        let wf = workflow();
        wf.submit_request("1", &sizes(SizeLabel::S)).unwrap();
        wf.submit_request("2", &sizes(SizeLabel::M)).unwrap();
        wf.submit_request("3", &sizes(SizeLabel::S)).unwrap();

        let summary = wf.fetch_summary(&staff()).unwrap();
        assert_eq!(summary.count(Garment::Shirt, SizeLabel::S), 2);
        assert_eq!(summary.count(Garment::Shirt, SizeLabel::M), 1);
        assert_eq!(summary.shirt.len(), 2);
        assert_eq!(summary.count(Garment::Trousers, SizeLabel::L), 3);
        assert_eq!(summary.total(Garment::Jacket), 0);
    }

    #[test]
    fn update_message_replaces_all_fields() {
        let wf = workflow();
        let first = PolicyMessage::new("Hello", "مرحبا", ModificationPolicy::Disabled);
        wf.update_message(&first, &staff()).unwrap();
        assert_eq!(wf.get_message().unwrap(), first);

        let second = PolicyMessage::new("", "", ModificationPolicy::Enabled);
        wf.update_message(&second, &staff()).unwrap();
        assert_eq!(wf.get_message().unwrap(), second);
    }

    #[test]
    fn blank_search_is_a_negative_result() {
        let wf = workflow();
        assert_eq!(wf.search("   ").unwrap(), None);
        assert_eq!(wf.search("unknown").unwrap(), None);
        assert_eq!(wf.search(" 2 ").unwrap().unwrap().student_id, "2");
    }
}
