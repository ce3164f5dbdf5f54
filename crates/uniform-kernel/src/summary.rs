//! Inventory summary derived from current records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::record::StudentRecord;
use crate::size::{Garment, SizeLabel, UniformSizes};

/// Per-garment size counts. Sizes nobody holds are omitted; readers treat a
/// missing label as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSummary {
    #[serde(default)]
    pub shirt: BTreeMap<SizeLabel, u32>,
    #[serde(default)]
    pub trousers: BTreeMap<SizeLabel, u32>,
    #[serde(default)]
    pub jacket: BTreeMap<SizeLabel, u32>,
}

impl SizeSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a StudentRecord>) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add(&record.sizes);
        }
        summary
    }

    pub fn add(&mut self, sizes: &UniformSizes) {
        for garment in Garment::iter() {
            if let Some(size) = sizes.get(garment) {
                *self.counts_mut(garment).entry(size).or_insert(0) += 1;
            }
        }
    }

    pub fn counts(&self, garment: Garment) -> &BTreeMap<SizeLabel, u32> {
        match garment {
            Garment::Shirt => &self.shirt,
            Garment::Trousers => &self.trousers,
            Garment::Jacket => &self.jacket,
        }
    }

    fn counts_mut(&mut self, garment: Garment) -> &mut BTreeMap<SizeLabel, u32> {
        match garment {
            Garment::Shirt => &mut self.shirt,
            Garment::Trousers => &mut self.trousers,
            Garment::Jacket => &mut self.jacket,
        }
    }

    pub fn count(&self, garment: Garment, size: SizeLabel) -> u32 {
        self.counts(garment).get(&size).copied().unwrap_or(0)
    }

    pub fn total(&self, garment: Garment) -> u32 {
        self.counts(garment).values().sum()
    }
}
