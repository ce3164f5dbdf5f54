use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};
use uniform_kernel::{ErrorKind, PolicyMessage, PortalError, SizeRequest, UniformSizes};

use crate::credential::Credential;
use crate::wire::{
    staff_credential, ActionQuery, AdminRow, ErrorBody, PostAction, SearchResponse,
    StatusResponse, ACTION_ADMIN, ACTION_GET_MESSAGE, ACTION_SEARCH, SUB_ACTION_SUMMARY,
};
use crate::workflow::ApprovalWorkflow;

/// Error envelope returned by every failing action.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn rejected(status: StatusCode, message: String) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: message,
                code: Some(ErrorKind::Validation.to_string()),
            },
        }
    }
}

impl From<PortalError> for ApiError {
    fn from(err: PortalError) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::IllegalTransition => StatusCode::CONFLICT,
            ErrorKind::Store
            | ErrorKind::Connectivity
            | ErrorKind::Configuration
            | ErrorKind::Remote => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "action failed");
        }
        Self {
            status,
            body: ErrorBody::from(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Runs a workflow call off the async executor; stores may block.
async fn run<T, F>(workflow: &Arc<ApprovalWorkflow>, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ApprovalWorkflow) -> Result<T, PortalError> + Send + 'static,
{
    let workflow = Arc::clone(workflow);
    tokio::task::spawn_blocking(move || call(&workflow))
        .await
        .map_err(|e| PortalError::Store(format!("worker task failed: {e}")))?
        .map_err(ApiError::from)
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

pub async fn handle_query(
    State(workflow): State<Arc<ApprovalWorkflow>>,
    query: Result<Query<ActionQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) =
        query.map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
    debug!(action = %query.action, "query action");

    match query.action.as_str() {
        ACTION_GET_MESSAGE => {
            let message = run(&workflow, |wf| wf.get_message()).await?;
            Ok(Json(message).into_response())
        }
        ACTION_SEARCH => {
            let student_id = query.student_id.unwrap_or_default();
            let found = run(&workflow, move |wf| wf.search(&student_id)).await?;
            Ok(Json(SearchResponse::from_record(found.as_ref())).into_response())
        }
        ACTION_ADMIN => {
            let credential = Credential::new(query.password.unwrap_or_default());
            if query.sub_action.as_deref() == Some(SUB_ACTION_SUMMARY) {
                let summary = run(&workflow, move |wf| wf.fetch_summary(&credential)).await?;
                return Ok(Json(summary).into_response());
            }
            let pending = run(&workflow, move |wf| wf.list_pending(&credential)).await?;
            let rows: Vec<AdminRow> = pending.iter().map(AdminRow::from).collect();
            Ok(Json(rows).into_response())
        }
        "" => Err(PortalError::Validation("missing action".into()).into()),
        other => Err(PortalError::Validation(format!("unknown action: {other}")).into()),
    }
}

/// Mutating actions. The body is read as JSON whatever its content type, so
/// browser clients can post without a preflight. Staff actions authorize
/// before the body is typed, so a wrong password always answers 401.
pub async fn handle_action(
    State(workflow): State<Arc<ApprovalWorkflow>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let body =
        body.map_err(|rejection| ApiError::rejected(rejection.status(), rejection.body_text()))?;
    let raw: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| PortalError::Validation(format!("malformed action body: {e}")))?;
    if let Some(credential) = staff_credential(&raw) {
        workflow.authorize(&credential, "post action")?;
    }
    let action: PostAction = serde_json::from_value(raw)
        .map_err(|e| PortalError::Validation(format!("malformed action body: {e}")))?;
    debug!(action = action.name(), "post action");

    run(&workflow, move |wf| dispatch(wf, action)).await?;
    Ok(Json(StatusResponse::success()))
}

fn dispatch(workflow: &ApprovalWorkflow, action: PostAction) -> Result<(), PortalError> {
    match action {
        PostAction::UpdateMessage {
            password,
            english,
            arabic,
            modification,
        } => workflow.update_message(
            &PolicyMessage::new(english, arabic, modification),
            &Credential::new(password),
        ),
        PostAction::RequestModification { student_id } => {
            workflow.request_modification(&student_id).map(|_| ())
        }
        PostAction::AllowEdit { row, password } => workflow
            .allow_edit(row, &Credential::new(password))
            .map(|_| ()),
        PostAction::RequestUpdate {
            student_id,
            shirt,
            trousers,
            jacket,
            notes,
        } => {
            let request = SizeRequest::new(UniformSizes::new(shirt, trousers, jacket), notes);
            workflow.submit_request(&student_id, &request).map(|_| ())
        }
        PostAction::Approve { row, password } => workflow
            .approve(row, &Credential::new(password))
            .map(|_| ()),
    }
}
