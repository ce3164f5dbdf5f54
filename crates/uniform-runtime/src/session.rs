//! Owner and staff sessions over any [PortalBackend].
//!
//! Each action takes `&mut self`, so a session never has two round-trips in
//! flight. Nothing is retried; a failed action leaves the session as it was.
//! The one exception is an edit request whose re-read fails: the store has
//! already queued it, so the session waits for approval where `refresh` can
//! re-read the record.

use tracing::{debug, info, warn};
use uniform_kernel::{
    LifecycleEvent, OwnerAction, OwnerState, PendingRequestRow, PolicyMessage, PortalError,
    RequestStatus, RowId, SizeRequest, SizeSummary, StudentRecord, ViewMode,
};

use crate::backend::PortalBackend;
use crate::credential::Credential;

const SEARCH_SCREEN: &str = "SEARCH";

/// A parent or guardian working on one student's request.
pub struct OwnerSession<B> {
    backend: B,
    message: PolicyMessage,
    state: Option<OwnerState>,
}

impl<B: PortalBackend> OwnerSession<B> {
    /// Fetches the policy message once; it stays fixed for the session.
    pub async fn open(backend: B) -> Self {
        let message = backend.get_message().await;
        Self {
            backend,
            message,
            state: None,
        }
    }

    pub fn message(&self) -> &PolicyMessage {
        &self.message
    }

    pub fn state(&self) -> Option<&OwnerState> {
        self.state.as_ref()
    }

    /// `None` while on the search screen.
    pub fn mode(&self) -> Option<&ViewMode> {
        self.state.as_ref().map(OwnerState::mode)
    }

    /// Looks the student up and enters the lifecycle. `Ok(None)` when the id
    /// is unknown; the session stays on the search screen.
    pub async fn search(&mut self, student_id: &str) -> Result<Option<&ViewMode>, PortalError> {
        let found = self.backend.search(student_id.trim()).await?;
        self.state = found.map(|record| OwnerState::load(record, &self.message));
        Ok(self.mode())
    }

    pub async fn refresh(&mut self) -> Result<&ViewMode, PortalError> {
        let student_id = self.allowed(OwnerAction::Refresh)?;
        let record = self.fetch(&student_id).await?;
        self.apply(LifecycleEvent::Refreshed(record))
    }

    /// Asks staff for edit access, then re-reads the record.
    pub async fn request_edit(&mut self) -> Result<&ViewMode, PortalError> {
        let student_id = self.allowed(OwnerAction::RequestEdit)?;
        self.backend.request_modification(&student_id).await?;
        info!(student_id, "edit access requested");
        let record = match self.fetch(&student_id).await {
            Ok(record) => record,
            Err(err) => {
                warn!(student_id, error = %err, "re-read after edit request failed");
                let mut record = self.active(OwnerAction::RequestEdit)?.record().clone();
                record.status = RequestStatus::ModificationRequested;
                record
            }
        };
        self.apply(LifecycleEvent::EditRequested(record))
    }

    /// Opens the form locally; no backend call.
    pub fn begin_edit(&mut self) -> Result<&ViewMode, PortalError> {
        self.allowed(OwnerAction::BeginEdit)?;
        self.apply(LifecycleEvent::BeginEdit)
    }

    /// Validates, submits, and moves to the confirmation screen.
    pub async fn submit(&mut self, request: SizeRequest) -> Result<&ViewMode, PortalError> {
        let student_id = self.allowed(OwnerAction::Submit)?;
        request.validate()?;
        self.backend.submit_request(&student_id, &request).await?;
        info!(student_id, "sizes submitted");
        self.apply(LifecycleEvent::Submitted(request))
    }

    pub fn cancel(&mut self) -> Result<(), PortalError> {
        self.exit(OwnerAction::Cancel)
    }

    pub fn reset_to_search(&mut self) -> Result<(), PortalError> {
        self.exit(OwnerAction::ResetToSearch)
    }

    fn active(&self, action: OwnerAction) -> Result<&OwnerState, PortalError> {
        self.state
            .as_ref()
            .ok_or_else(|| PortalError::IllegalTransition {
                action: action.to_string(),
                mode: SEARCH_SCREEN.to_string(),
            })
    }

    /// Returns the session's student id if `action` is legal in the current
    /// mode.
    fn allowed(&self, action: OwnerAction) -> Result<String, PortalError> {
        let state = self.active(action)?;
        if !state.mode().allows(action) {
            return Err(state.illegal(action));
        }
        Ok(state.record().student_id.clone())
    }

    async fn fetch(&self, student_id: &str) -> Result<StudentRecord, PortalError> {
        self.backend
            .search(student_id)
            .await?
            .ok_or_else(|| PortalError::NotFound(format!("student {student_id}")))
    }

    fn apply(&mut self, event: LifecycleEvent) -> Result<&ViewMode, PortalError> {
        let next = self.active(event.action())?.apply(event)?;
        debug!(mode = %next.mode(), "owner mode");
        Ok(self.state.insert(next).mode())
    }

    fn exit(&mut self, action: OwnerAction) -> Result<(), PortalError> {
        self.active(action)?.check_exit(action)?;
        self.state = None;
        Ok(())
    }
}

/// A credentialed staff member working the pending queue.
pub struct StaffSession<B> {
    backend: B,
    credential: Credential,
    pending: Vec<PendingRequestRow>,
}

impl<B: PortalBackend> StaffSession<B> {
    /// Loads the queue; a wrong credential fails here.
    pub async fn login(backend: B, credential: Credential) -> Result<Self, PortalError> {
        let pending = backend.list_pending(&credential).await?;
        info!(pending = pending.len(), "staff session opened");
        Ok(Self {
            backend,
            credential,
            pending,
        })
    }

    pub fn pending(&self) -> &[PendingRequestRow] {
        &self.pending
    }

    pub async fn reload(&mut self) -> Result<&[PendingRequestRow], PortalError> {
        self.pending = self.backend.list_pending(&self.credential).await?;
        Ok(&self.pending)
    }

    /// Approves a row; it leaves the local list only if the call succeeds.
    pub async fn approve(&mut self, row: RowId) -> Result<(), PortalError> {
        self.backend.approve(row, &self.credential).await?;
        self.pending.retain(|p| p.row != row);
        Ok(())
    }

    /// Grants edit access; the row leaves the local list only on success.
    pub async fn allow_edit(&mut self, row: RowId) -> Result<(), PortalError> {
        self.backend.allow_edit(row, &self.credential).await?;
        self.pending.retain(|p| p.row != row);
        Ok(())
    }

    pub async fn summary(&self) -> Result<SizeSummary, PortalError> {
        self.backend.fetch_summary(&self.credential).await
    }

    pub async fn update_message(&self, message: &PolicyMessage) -> Result<(), PortalError> {
        self.backend.update_message(message, &self.credential).await
    }
}
