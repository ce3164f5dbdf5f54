//! HTTP client for a remote portal server.
//!
//! Response interpretation, in order:
//! 1. transport failure or timeout → [PortalError::Connectivity]
//! 2. JSON body with a non-empty `error` → typed error from `code`
//! 3. any other non-2xx status → [PortalError::Connectivity]
//! 4. HTML body → [PortalError::Configuration]
//! 5. any other non-JSON body → [PortalError::Connectivity]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;
use uniform_kernel::{
    PendingRequestRow, PolicyMessage, PortalError, RowId, SizeRequest, SizeSummary, StudentRecord,
};

use crate::backend::PortalBackend;
use crate::credential::Credential;
use crate::wire::{
    ActionQuery, AdminRow, PostAction, SearchResponse, StatusResponse, ACTION_ADMIN,
    ACTION_GET_MESSAGE, ACTION_SEARCH, SUB_ACTION_SUMMARY,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("uniform-portal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

pub struct HttpPortalClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpPortalClient {
    pub fn new(base_url: &str, config: ClientConfig) -> Result<Self, PortalError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PortalError::Configuration(format!("invalid portal url {base_url}: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| PortalError::Configuration(format!("http client: {e}")))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, query: &ActionQuery) -> Result<T, PortalError> {
        debug!(action = %query.action, "portal GET");
        let sent = self
            .http
            .get(self.base_url.clone())
            .query(query)
            .send()
            .await;
        read_response(sent).await
    }

    async fn post(&self, action: &PostAction) -> Result<(), PortalError> {
        debug!(action = action.name(), "portal POST");
        let sent = self
            .http
            .post(self.base_url.clone())
            .json(action)
            .send()
            .await;
        let response: StatusResponse = read_response(sent).await?;
        if !response.is_success() {
            return Err(PortalError::Remote(format!(
                "{} returned status {}",
                action.name(),
                response.status
            )));
        }
        Ok(())
    }

    fn staff_query(credential: &Credential, sub_action: Option<&str>) -> ActionQuery {
        ActionQuery {
            action: ACTION_ADMIN.to_string(),
            password: Some(credential.expose().to_string()),
            sub_action: sub_action.map(str::to_string),
            ..ActionQuery::default()
        }
    }
}

async fn read_response<T: DeserializeOwned>(
    sent: Result<reqwest::Response, reqwest::Error>,
) -> Result<T, PortalError> {
    let response = sent.map_err(|e| PortalError::Connectivity(e.to_string()))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PortalError::Connectivity(e.to_string()))?;
    interpret(status, &text)
}

fn interpret<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T, PortalError> {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        if !status.is_success() {
            return Err(status_failure(status));
        }
        if looks_like_html(text) {
            return Err(PortalError::Configuration(
                "server answered with an HTML page".to_string(),
            ));
        }
        return Err(PortalError::Connectivity(
            "unexpected response format".to_string(),
        ));
    };

    if let Some(message) = error_message(&value) {
        let code = value.get("code").and_then(Value::as_str);
        return Err(PortalError::from_wire(code, message));
    }
    if !status.is_success() {
        return Err(status_failure(status));
    }
    serde_json::from_value(value)
        .map_err(|e| PortalError::Connectivity(format!("unexpected response format: {e}")))
}

fn error_message(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn status_failure(status: StatusCode) -> PortalError {
    PortalError::Connectivity(format!("server connection failed with status {status}"))
}

fn looks_like_html(text: &str) -> bool {
    let head: String = text.trim_start().chars().take(256).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html") || head.contains("<!doctype html>")
}

#[async_trait]
impl PortalBackend for HttpPortalClient {
    async fn try_get_message(&self) -> Result<PolicyMessage, PortalError> {
        self.get(&ActionQuery {
            action: ACTION_GET_MESSAGE.to_string(),
            ..ActionQuery::default()
        })
        .await
    }

    async fn update_message(
        &self,
        message: &PolicyMessage,
        credential: &Credential,
    ) -> Result<(), PortalError> {
        self.post(&PostAction::update_message(message, credential.expose()))
            .await
    }

    async fn search(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Ok(None);
        }
        let response: SearchResponse = self
            .get(&ActionQuery {
                action: ACTION_SEARCH.to_string(),
                student_id: Some(student_id.to_string()),
                ..ActionQuery::default()
            })
            .await?;
        Ok(response.into_record())
    }

    async fn request_modification(&self, student_id: &str) -> Result<(), PortalError> {
        self.post(&PostAction::RequestModification {
            student_id: student_id.trim().to_string(),
        })
        .await
    }

    async fn submit_request(
        &self,
        student_id: &str,
        request: &SizeRequest,
    ) -> Result<(), PortalError> {
        request.validate()?;
        self.post(&PostAction::request_update(student_id.trim(), request))
            .await
    }

    async fn list_pending(
        &self,
        credential: &Credential,
    ) -> Result<Vec<PendingRequestRow>, PortalError> {
        let rows: Vec<AdminRow> = self.get(&Self::staff_query(credential, None)).await?;
        Ok(rows.into_iter().map(AdminRow::into_pending).collect())
    }

    async fn approve(&self, row: RowId, credential: &Credential) -> Result<(), PortalError> {
        self.post(&PostAction::Approve {
            row,
            password: credential.expose().to_string(),
        })
        .await
    }

    async fn allow_edit(&self, row: RowId, credential: &Credential) -> Result<(), PortalError> {
        self.post(&PostAction::AllowEdit {
            row,
            password: credential.expose().to_string(),
        })
        .await
    }

    async fn fetch_summary(&self, credential: &Credential) -> Result<SizeSummary, PortalError> {
        self.get(&Self::staff_query(credential, Some(SUB_ACTION_SUMMARY)))
            .await
    }
}
