//! Garments and the closed size enumeration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::PortalError;

/// Closed set of uniform sizes. Labels are the exact strings used on the wire.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
pub enum SizeLabel {
    S,
    M,
    L,
    XL,
    #[serde(rename = "2XL")]
    #[strum(serialize = "2XL")]
    XXL,
}

impl SizeLabel {
    /// Parses an optional wire label: empty (after trimming) means unset.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, PortalError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<SizeLabel>()
            .map(Some)
            .map_err(|_| PortalError::Validation(format!("unknown size label: {raw}")))
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Garment {
    Shirt,
    Trousers,
    Jacket,
}

/// Serde adapter for `Option<SizeLabel>` where the wire uses `""` for unset.
pub mod optional_size {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Option<SizeLabel>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(size) => s.serialize_str(size.as_ref()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SizeLabel>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw {
            None => Ok(None),
            Some(raw) => SizeLabel::parse_optional(&raw).map_err(serde::de::Error::custom),
        }
    }
}

/// The three garment sizes held by one record or carried by one submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformSizes {
    #[serde(with = "optional_size", default)]
    pub shirt: Option<SizeLabel>,
    #[serde(with = "optional_size", default)]
    pub trousers: Option<SizeLabel>,
    #[serde(with = "optional_size", default)]
    pub jacket: Option<SizeLabel>,
}

impl UniformSizes {
    pub fn new(
        shirt: Option<SizeLabel>,
        trousers: Option<SizeLabel>,
        jacket: Option<SizeLabel>,
    ) -> Self {
        Self {
            shirt,
            trousers,
            jacket,
        }
    }

    pub fn get(&self, garment: Garment) -> Option<SizeLabel> {
        match garment {
            Garment::Shirt => self.shirt,
            Garment::Trousers => self.trousers,
            Garment::Jacket => self.jacket,
        }
    }

    /// True iff any garment has a size.
    pub fn has_any(&self) -> bool {
        self.shirt.is_some() || self.trousers.is_some() || self.jacket.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn labels_round_trip_through_wire_strings() {
        let labels: Vec<String> = SizeLabel::iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, vec!["S", "M", "L", "XL", "2XL"]);
        assert_eq!("2XL".parse::<SizeLabel>().unwrap(), SizeLabel::XXL);
        assert_eq!(serde_json::to_string(&SizeLabel::XXL).unwrap(), "\"2XL\"");
    }

    #[test]
    fn empty_label_is_unset_and_unknown_label_is_rejected() {
        assert_eq!(SizeLabel::parse_optional("  ").unwrap(), None);
        assert_eq!(SizeLabel::parse_optional("M").unwrap(), Some(SizeLabel::M));
        let err = SizeLabel::parse_optional("XXXL").unwrap_err();
        assert!(matches!(err, PortalError::Validation(_)));
    }

    #[test]
    fn sizes_use_empty_string_for_unset_garments() {
        let sizes = UniformSizes::new(Some(SizeLabel::M), Some(SizeLabel::L), None);
        let json = serde_json::to_value(&sizes).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"shirt": "M", "trousers": "L", "jacket": ""})
        );

        let parsed: UniformSizes =
            serde_json::from_value(serde_json::json!({"shirt": "", "jacket": "2XL"})).unwrap();
        assert_eq!(parsed.shirt, None);
        assert_eq!(parsed.trousers, None);
        assert_eq!(parsed.jacket, Some(SizeLabel::XXL));
        assert!(parsed.has_any());
        assert!(!UniformSizes::default().has_any());
    }
}
