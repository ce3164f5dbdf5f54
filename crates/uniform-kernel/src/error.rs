//! Error taxonomy shared by the kernel, the stores, the workflow and the
//! transports.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Stable classification of a [PortalError], used as the `code` field on the
/// wire so clients can rebuild the typed error.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    Conflict,
    Validation,
    Connectivity,
    Configuration,
    Remote,
    Store,
    IllegalTransition,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("connectivity failure: {0}")]
    Connectivity(String),

    #[error("application configuration error: backend access denied ({0})")]
    Configuration(String),

    #[error("{0}")]
    Remote(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("illegal transition: {action} is not allowed while {mode}")]
    IllegalTransition { action: String, mode: String },
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::NotFound(_) => ErrorKind::NotFound,
            PortalError::Unauthorized => ErrorKind::Unauthorized,
            PortalError::Conflict(_) => ErrorKind::Conflict,
            PortalError::Validation(_) => ErrorKind::Validation,
            PortalError::Connectivity(_) => ErrorKind::Connectivity,
            PortalError::Configuration(_) => ErrorKind::Configuration,
            PortalError::Remote(_) => ErrorKind::Remote,
            PortalError::Store(_) => ErrorKind::Store,
            PortalError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
        }
    }

    /// Rebuilds a typed error from a wire `code` and message. Unknown or
    /// missing codes become [PortalError::Remote].
    pub fn from_wire(code: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        match code.and_then(|c| c.parse::<ErrorKind>().ok()) {
            Some(ErrorKind::NotFound) => PortalError::NotFound(message),
            Some(ErrorKind::Unauthorized) => PortalError::Unauthorized,
            Some(ErrorKind::Conflict) => PortalError::Conflict(message),
            Some(ErrorKind::Validation) => PortalError::Validation(message),
            Some(ErrorKind::Configuration) => PortalError::Configuration(message),
            Some(ErrorKind::Store) => PortalError::Store(message),
            _ => PortalError::Remote(message),
        }
    }

    /// Driver-level failure inside a store implementation.
    pub fn store(prefix: &str, e: impl std::fmt::Display) -> Self {
        PortalError::Store(format!("{prefix}: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_snake_case() {
        assert_eq!(ErrorKind::NotFound.to_string(), "not_found");
        assert_eq!(ErrorKind::IllegalTransition.as_ref(), "illegal_transition");
        assert_eq!(
            serde_json::to_string(&ErrorKind::Unauthorized).unwrap(),
            "\"unauthorized\""
        );
    }

    #[test]
    fn from_wire_restores_typed_errors() {
        assert_eq!(
            PortalError::from_wire(Some("unauthorized"), "Invalid password"),
            PortalError::Unauthorized
        );
        assert_eq!(
            PortalError::from_wire(Some("conflict"), "row 3 is Approved"),
            PortalError::Conflict("row 3 is Approved".into())
        );
        assert_eq!(
            PortalError::from_wire(None, "Script failed"),
            PortalError::Remote("Script failed".into())
        );
        assert_eq!(
            PortalError::from_wire(Some("something_new"), "x").kind(),
            ErrorKind::Remote
        );
    }
}
