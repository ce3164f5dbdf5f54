//! The portal backend seam used by owner and staff sessions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uniform_kernel::{
    PendingRequestRow, PolicyMessage, PortalError, RowId, SizeRequest, SizeSummary, StudentRecord,
};

use crate::credential::Credential;
use crate::workflow::ApprovalWorkflow;

/// Every portal action, reachable either in-process or over HTTP.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    async fn try_get_message(&self) -> Result<PolicyMessage, PortalError>;

    /// Never fails: any error degrades to the default message.
    async fn get_message(&self) -> PolicyMessage {
        match self.try_get_message().await {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "policy message unavailable, using defaults");
                PolicyMessage::default()
            }
        }
    }

    async fn update_message(
        &self,
        message: &PolicyMessage,
        credential: &Credential,
    ) -> Result<(), PortalError>;

    async fn search(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError>;

    async fn request_modification(&self, student_id: &str) -> Result<(), PortalError>;

    async fn submit_request(
        &self,
        student_id: &str,
        request: &SizeRequest,
    ) -> Result<(), PortalError>;

    async fn list_pending(
        &self,
        credential: &Credential,
    ) -> Result<Vec<PendingRequestRow>, PortalError>;

    async fn approve(&self, row: RowId, credential: &Credential) -> Result<(), PortalError>;

    async fn allow_edit(&self, row: RowId, credential: &Credential) -> Result<(), PortalError>;

    async fn fetch_summary(&self, credential: &Credential) -> Result<SizeSummary, PortalError>;
}

/// In-process backend over a shared [ApprovalWorkflow].
#[derive(Clone)]
pub struct LocalBackend {
    workflow: Arc<ApprovalWorkflow>,
}

impl LocalBackend {
    pub fn new(workflow: Arc<ApprovalWorkflow>) -> Self {
        Self { workflow }
    }

    pub fn workflow(&self) -> &ApprovalWorkflow {
        &self.workflow
    }
}

#[async_trait]
impl PortalBackend for LocalBackend {
    async fn try_get_message(&self) -> Result<PolicyMessage, PortalError> {
        self.workflow.get_message()
    }

    async fn update_message(
        &self,
        message: &PolicyMessage,
        credential: &Credential,
    ) -> Result<(), PortalError> {
        self.workflow.update_message(message, credential)
    }

    async fn search(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError> {
        self.workflow.search(student_id)
    }

    async fn request_modification(&self, student_id: &str) -> Result<(), PortalError> {
        self.workflow.request_modification(student_id).map(|_| ())
    }

    async fn submit_request(
        &self,
        student_id: &str,
        request: &SizeRequest,
    ) -> Result<(), PortalError> {
        self.workflow.submit_request(student_id, request).map(|_| ())
    }

    async fn list_pending(
        &self,
        credential: &Credential,
    ) -> Result<Vec<PendingRequestRow>, PortalError> {
        self.workflow.list_pending(credential)
    }

    async fn approve(&self, row: RowId, credential: &Credential) -> Result<(), PortalError> {
        self.workflow.approve(row, credential).map(|_| ())
    }

    async fn allow_edit(&self, row: RowId, credential: &Credential) -> Result<(), PortalError> {
        self.workflow.allow_edit(row, credential).map(|_| ())
    }

    async fn fetch_summary(&self, credential: &Credential) -> Result<SizeSummary, PortalError> {
        self.workflow.fetch_summary(credential)
    }
}
