//! Request status stored on each student record.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, EnumIter, EnumString};

use crate::error::PortalError;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr,
)]
pub enum RequestStatus {
    /// Nothing submitted yet. Serialized as the empty string.
    #[default]
    #[strum(serialize = "")]
    Unset,
    Pending,
    Approved,
    ModificationRequested,
    Modifiable,
}

impl RequestStatus {
    /// Parses a stored or wire status; blank means [RequestStatus::Unset].
    pub fn parse(raw: &str) -> Result<Self, PortalError> {
        raw.trim()
            .parse::<RequestStatus>()
            .map_err(|_| PortalError::Validation(format!("unknown request status: {raw}")))
    }

    /// Statuses that keep a row in the staff queue.
    pub fn is_queued(self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::ModificationRequested
        )
    }

    /// Owner may edit without any staff action.
    pub fn is_owner_editable(self) -> bool {
        matches!(self, RequestStatus::Unset | RequestStatus::Modifiable)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Unset => f.write_str("unset"),
            other => f.write_str(other.as_ref()),
        }
    }
}

impl Serialize for RequestStatus {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(RequestStatus::Unset),
            Some(raw) => RequestStatus::parse(&raw).map_err(serde::de::Error::custom),
        }
    }
}
