//! Announcement message and the global modification policy flag.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModificationPolicy {
    /// Edits to an existing submission need staff approval.
    #[default]
    Enabled,
    /// Owners edit existing submissions freely.
    Disabled,
}

impl ModificationPolicy {
    pub fn approval_required(self) -> bool {
        matches!(self, ModificationPolicy::Enabled)
    }
}

/// Process-wide announcement and policy singleton. Always written whole.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyMessage {
    #[serde(default)]
    pub english: String,
    #[serde(default)]
    pub arabic: String,
    #[serde(default)]
    pub modification: ModificationPolicy,
}

impl PolicyMessage {
    pub fn new(
        english: impl Into<String>,
        arabic: impl Into<String>,
        modification: ModificationPolicy,
    ) -> Self {
        Self {
            english: english.into(),
            arabic: arabic.into(),
            modification,
        }
    }

    /// An announcement is shown only when at least one text is non-empty.
    pub fn has_announcement(&self) -> bool {
        !self.english.trim().is_empty() || !self.arabic.trim().is_empty()
    }
}
