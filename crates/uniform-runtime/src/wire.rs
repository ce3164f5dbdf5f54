//! JSON wire contract shared by the action server and the HTTP client.
//!
//! Reads go over `GET /?action=…`, mutations over `POST /` with an `action`
//! discriminator in the JSON body. Empty strings stand for unset sizes and an
//! unset status in both directions.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uniform_kernel::size::optional_size;
use uniform_kernel::{
    ModificationPolicy, PendingRequestRow, PolicyMessage, PortalError, RequestStatus, RowId,
    SizeLabel, SizeRequest, StudentProfile, StudentRecord, UniformSizes,
};

use crate::credential::Credential;

pub const ACTION_GET_MESSAGE: &str = "getMessage";
pub const ACTION_SEARCH: &str = "search";
pub const ACTION_ADMIN: &str = "admin";
pub const SUB_ACTION_SUMMARY: &str = "summary";
pub const STATUS_SUCCESS: &str = "success";

/// POST actions that carry the staff password.
pub const STAFF_ACTIONS: [&str; 3] = ["updateMessage", "allowEdit", "approve"];

/// Query string of a read action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionQuery {
    #[serde(default)]
    pub action: String,
    #[serde(rename = "studentId", default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "subAction", default, skip_serializing_if = "Option::is_none")]
    pub sub_action: Option<String>,
}

/// Body of a mutating action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PostAction {
    UpdateMessage {
        password: String,
        #[serde(default)]
        english: String,
        #[serde(default)]
        arabic: String,
        #[serde(default)]
        modification: ModificationPolicy,
    },
    RequestModification {
        #[serde(rename = "studentId", deserialize_with = "string_or_number")]
        student_id: String,
    },
    AllowEdit {
        row: RowId,
        password: String,
    },
    RequestUpdate {
        #[serde(rename = "studentId", deserialize_with = "string_or_number")]
        student_id: String,
        #[serde(with = "optional_size", default)]
        shirt: Option<SizeLabel>,
        #[serde(with = "optional_size", default)]
        trousers: Option<SizeLabel>,
        #[serde(with = "optional_size", default)]
        jacket: Option<SizeLabel>,
        #[serde(default)]
        notes: String,
    },
    Approve {
        row: RowId,
        password: String,
    },
}

impl PostAction {
    pub fn update_message(message: &PolicyMessage, password: &str) -> Self {
        PostAction::UpdateMessage {
            password: password.to_string(),
            english: message.english.clone(),
            arabic: message.arabic.clone(),
            modification: message.modification,
        }
    }

    pub fn request_update(student_id: &str, request: &SizeRequest) -> Self {
        PostAction::RequestUpdate {
            student_id: student_id.to_string(),
            shirt: request.sizes.shirt,
            trousers: request.sizes.trousers,
            jacket: request.sizes.jacket,
            notes: request.notes.clone(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PostAction::UpdateMessage { .. } => "updateMessage",
            PostAction::RequestModification { .. } => "requestModification",
            PostAction::AllowEdit { .. } => "allowEdit",
            PostAction::RequestUpdate { .. } => "requestUpdate",
            PostAction::Approve { .. } => "approve",
        }
    }
}

/// The staff credential of an untyped action body, or `None` when the action
/// is not a staff action. A missing or non-string password reads as empty.
pub fn staff_credential(body: &Value) -> Option<Credential> {
    let action = body.get("action")?.as_str()?;
    if !STAFF_ACTIONS.contains(&action) {
        return None;
    }
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Some(Credential::new(password))
}

/// Student ids arrive as strings from the portal but as numbers from
/// spreadsheet-backed deployments.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

/// The display and size fields of one student as the portal shows them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    #[serde(deserialize_with = "string_or_number")]
    pub student_id: String,
    #[serde(default)]
    pub english_name: String,
    #[serde(default)]
    pub arabic_name: String,
    #[serde(default)]
    pub grade: String,
    #[serde(rename = "class", default)]
    pub class_name: String,
    #[serde(flatten)]
    pub sizes: UniformSizes,
    #[serde(default)]
    pub status: RequestStatus,
}

impl From<&StudentRecord> for StudentView {
    fn from(record: &StudentRecord) -> Self {
        Self {
            student_id: record.student_id.clone(),
            english_name: record.profile.english_name.clone(),
            arabic_name: record.profile.arabic_name.clone(),
            grade: record.profile.grade.clone(),
            class_name: record.profile.class_name.clone(),
            sizes: record.sizes.clone(),
            status: record.status,
        }
    }
}

impl StudentView {
    pub fn into_record(self) -> StudentRecord {
        let profile = StudentProfile {
            english_name: self.english_name,
            arabic_name: self.arabic_name,
            grade: self.grade,
            class_name: self.class_name,
        };
        let mut record = StudentRecord::enrolled(self.student_id, profile);
        record.sizes = self.sizes;
        record.status = self.status;
        record
    }
}

/// `search` result: `{"found": false}` or the flattened student view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchResponse {
    pub found: bool,
    #[serde(flatten)]
    pub student: Option<StudentView>,
}

// A flattened `Option` swallows inner errors as `None`, so a malformed
// student would read as not found.
impl<'de> Deserialize<'de> for SearchResponse {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        let found = value
            .get("found")
            .and_then(Value::as_bool)
            .ok_or_else(|| D::Error::custom("search response without a boolean `found`"))?;
        let student = if found {
            Some(StudentView::deserialize(value).map_err(D::Error::custom)?)
        } else {
            None
        };
        Ok(Self { found, student })
    }
}

impl SearchResponse {
    pub fn from_record(record: Option<&StudentRecord>) -> Self {
        Self {
            found: record.is_some(),
            student: record.map(StudentView::from),
        }
    }

    pub fn into_record(self) -> Option<StudentRecord> {
        if !self.found {
            return None;
        }
        self.student.map(StudentView::into_record)
    }
}

/// One row of the `admin` list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRow {
    pub row: RowId,
    #[serde(flatten)]
    pub student: StudentView,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub request_status: RequestStatus,
}

impl From<&PendingRequestRow> for AdminRow {
    fn from(pending: &PendingRequestRow) -> Self {
        Self {
            row: pending.row,
            student: StudentView::from(&pending.record),
            notes: pending.record.notes.clone(),
            request_status: pending.record.status,
        }
    }
}

impl AdminRow {
    pub fn into_pending(self) -> PendingRequestRow {
        let mut record = self.student.into_record();
        record.notes = self.notes;
        record.status = self.request_status;
        PendingRequestRow {
            row: self.row,
            record,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Failure envelope. `code` is the snake_case [uniform_kernel::ErrorKind].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&PortalError> for ErrorBody {
    fn from(err: &PortalError) -> Self {
        Self {
            error: err.to_string(),
            code: Some(err.kind().to_string()),
        }
    }
}

impl ErrorBody {
    pub fn into_error(self) -> PortalError {
        PortalError::from_wire(self.code.as_deref(), self.error)
    }
}
