use std::collections::BTreeMap;

use serde::Serialize;

use crate::io::Format;

/// Where a structure came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Provenance {
    pub source_format: Option<Format>,
    pub source_path: Option<String>,
    pub notes: BTreeMap<String, String>,
}

impl Provenance {
    pub fn from_format(format: Format) -> Self {
        Self {
            source_format: Some(format),
            ..Self::default()
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_note(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.notes.insert(key.into(), value.into());
        self
    }

    /// Adds notes from `other` whose keys are not already present.
    pub fn absorb(&mut self, other: &Provenance) {
        for (k, v) in &other.notes {
            self.notes.entry(k.clone()).or_insert_with(|| v.clone());
        }
        if self.source_path.is_none() {
            self.source_path.clone_from(&other.source_path);
        }
        if self.source_format.is_none() {
            self.source_format = other.source_format;
        }
    }
}

/// Kinds of verbatim text regions retained for lossless re-export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Region {
    CarHeader,
    CarFooter,
    MdfHeader,
    MdfFooter,
    PdbHeader,
}

/// Verbatim source lines keyed by [`Region`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PreservedText {
    regions: BTreeMap<Region, Vec<String>>,
}

impl PreservedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: Region, lines: Vec<String>) {
        self.regions.insert(region, lines);
    }

    pub fn get(&self, region: Region) -> Option<&[String]> {
        self.regions.get(&region).map(Vec::as_slice)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Region, &[String])> {
        self.regions.iter().map(|(r, l)| (*r, l.as_slice()))
    }

    /// Copies regions from `other` that are absent here.
    pub fn absorb(&mut self, other: &PreservedText) {
        for (region, lines) in &other.regions {
            self.regions
                .entry(*region)
                .or_insert_with(|| lines.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_keeps_existing_regions() {
        let mut car = PreservedText::new();
        car.insert(Region::CarHeader, vec!["!BIOSYM archive 3".into()]);

        let mut other = PreservedText::new();
        other.insert(Region::CarHeader, vec!["other".into()]);
        other.insert(Region::MdfHeader, vec!["!BIOSYM molecular_data 4".into()]);

        car.absorb(&other);
        assert_eq!(car.get(Region::CarHeader).unwrap(), ["!BIOSYM archive 3"]);
        assert_eq!(
            car.get(Region::MdfHeader).unwrap(),
            ["!BIOSYM molecular_data 4"]
        );
        assert_eq!(car.iter().count(), 2);
    }

    #[test]
    fn provenance_absorb_prefers_own_values() {
        let mut p = Provenance::from_format(Format::Car).with_note("title", "a");
        let q = Provenance::from_format(Format::Mdf)
            .with_path("x.mdf")
            .with_note("title", "b")
            .with_note("date", "today");
        p.absorb(&q);
        assert_eq!(p.source_format, Some(Format::Car));
        assert_eq!(p.source_path.as_deref(), Some("x.mdf"));
        assert_eq!(p.notes["title"], "a");
        assert_eq!(p.notes["date"], "today");
    }
}
