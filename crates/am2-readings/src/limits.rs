//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Maximum earth-fault-loop impedance tables."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
//! Maximum permitted earth-fault-loop impedance per protective device.
//!
//! The built-in data is BS 7671 Table 41.3 (0.4 s disconnection, MCBs to
//! BS EN 60898 and RCBOs to BS EN 61009, Uo = 230 V). Tables are plain data:
//! they can be replaced or corrected from a TOML or JSON file without
//! touching the synthesizer.
use am2_common::LimitBasis;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::model::DeviceCurve;

const TABLE_41_3: &[(DeviceCurve, u32, f64)] = &[
    (DeviceCurve::B, 6, 7.28),
    (DeviceCurve::B, 10, 4.37),
    (DeviceCurve::B, 16, 2.73),
    (DeviceCurve::B, 20, 2.19),
    (DeviceCurve::B, 25, 1.75),
    (DeviceCurve::B, 32, 1.37),
    (DeviceCurve::B, 40, 1.09),
    (DeviceCurve::B, 50, 0.87),
    (DeviceCurve::B, 63, 0.69),
    (DeviceCurve::B, 80, 0.55),
    (DeviceCurve::B, 100, 0.44),
    (DeviceCurve::C, 6, 3.64),
    (DeviceCurve::C, 10, 2.19),
    (DeviceCurve::C, 16, 1.37),
    (DeviceCurve::C, 20, 1.09),
    (DeviceCurve::C, 25, 0.87),
    (DeviceCurve::C, 32, 0.68),
    (DeviceCurve::C, 40, 0.55),
    (DeviceCurve::C, 50, 0.44),
    (DeviceCurve::C, 63, 0.35),
    (DeviceCurve::C, 80, 0.27),
    (DeviceCurve::C, 100, 0.22),
    (DeviceCurve::D, 6, 1.82),
    (DeviceCurve::D, 10, 1.09),
    (DeviceCurve::D, 16, 0.68),
    (DeviceCurve::D, 20, 0.55),
    (DeviceCurve::D, 25, 0.44),
    (DeviceCurve::D, 32, 0.34),
    (DeviceCurve::D, 40, 0.27),
    (DeviceCurve::D, 50, 0.22),
    (DeviceCurve::D, 63, 0.17),
    (DeviceCurve::D, 80, 0.14),
    (DeviceCurve::D, 100, 0.11),
];

static BS7671: Lazy<LimitTable> = Lazy::new(|| {
    LimitTable::from_entries(
        TABLE_41_3
            .iter()
            .map(|&(curve, rating_a, max_zs_ohm)| LimitEntry {
                curve,
                rating_a,
                max_zs_ohm,
            }),
    )
});

/// One row of a limit table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LimitEntry {
    pub curve: DeviceCurve,
    pub rating_a: u32,
    pub max_zs_ohm: f64,
}

/// File representation: `[[entries]]` in TOML or `{"entries": [...]}` in JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitTableDocument {
    #[serde(default)]
    pub entries: Vec<LimitEntry>,
}

/// Read-only lookup from (curve, rating) to maximum loop impedance in ohms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitTable {
    entries: IndexMap<(DeviceCurve, u32), f64>,
}

impl LimitTable {
    /// Shared BS 7671 Table 41.3 instance.
    pub fn bs7671() -> &'static LimitTable {
        &BS7671
    }

    /// Build a table; later entries for the same device replace earlier ones.
    pub fn from_entries(entries: impl IntoIterator<Item = LimitEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table.insert(entry);
        }
        table
    }

    pub fn insert(&mut self, entry: LimitEntry) -> Option<f64> {
        self.entries
            .insert((entry.curve, entry.rating_a), entry.max_zs_ohm)
    }

    /// Copy of this table with `overrides` applied on top.
    pub fn with_overrides(&self, overrides: impl IntoIterator<Item = LimitEntry>) -> Self {
        let mut table = self.clone();
        for entry in overrides {
            table.insert(entry);
        }
        table
    }

    /// Tabulated limit, `None` when the device is not listed.
    pub fn max_zs(&self, curve: DeviceCurve, rating_a: u32) -> Option<f64> {
        self.entries.get(&(curve, rating_a)).copied()
    }

    /// Limit after applying the configured correction basis.
    pub fn max_zs_for(&self, curve: DeviceCurve, rating_a: u32, basis: LimitBasis) -> Option<f64> {
        self.max_zs(curve, rating_a).map(|limit| limit * basis.factor())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = LimitEntry> + '_ {
        self.entries
            .iter()
            .map(|(&(curve, rating_a), &max_zs_ohm)| LimitEntry {
                curve,
                rating_a,
                max_zs_ohm,
            })
    }

    pub fn to_document(&self) -> LimitTableDocument {
        LimitTableDocument {
            entries: self.entries().collect(),
        }
    }
}

impl From<LimitTableDocument> for LimitTable {
    fn from(document: LimitTableDocument) -> Self {
        LimitTable::from_entries(document.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_41_3_reference_values() {
        let table = LimitTable::bs7671();
        let reference = [
            (DeviceCurve::B, 6, 7.28),
            (DeviceCurve::B, 16, 2.73),
            (DeviceCurve::B, 32, 1.37),
            (DeviceCurve::C, 16, 1.37),
            (DeviceCurve::C, 32, 0.68),
            (DeviceCurve::D, 6, 1.82),
            (DeviceCurve::D, 100, 0.11),
        ];
        for (curve, rating, expected) in reference {
            assert_eq!(table.max_zs(curve, rating), Some(expected), "{curve}{rating}");
        }
        assert_eq!(table.len(), 33);
    }

    #[test]
    fn unlisted_devices_resolve_to_none() {
        let table = LimitTable::bs7671();
        assert_eq!(table.max_zs(DeviceCurve::B, 45), None);
        assert_eq!(table.max_zs(DeviceCurve::D, 125), None);
    }

    #[test]
    fn rule_of_thumb_scales_tabulated_limit() {
        let table = LimitTable::bs7671();
        let corrected = table
            .max_zs_for(DeviceCurve::B, 32, LimitBasis::RuleOfThumb)
            .unwrap();
        assert!((corrected - 1.096).abs() < 1e-9);
        assert_eq!(
            table.max_zs_for(DeviceCurve::B, 32, LimitBasis::Tabulated),
            Some(1.37)
        );
    }

    #[test]
    fn overrides_replace_and_extend() {
        let table = LimitTable::bs7671().with_overrides([
            LimitEntry {
                curve: DeviceCurve::B,
                rating_a: 32,
                max_zs_ohm: 1.2,
            },
            LimitEntry {
                curve: DeviceCurve::B,
                rating_a: 3,
                max_zs_ohm: 14.57,
            },
        ]);
        assert_eq!(table.max_zs(DeviceCurve::B, 32), Some(1.2));
        assert_eq!(table.max_zs(DeviceCurve::B, 3), Some(14.57));
        assert_eq!(LimitTable::bs7671().max_zs(DeviceCurve::B, 32), Some(1.37));
    }

    #[test]
    fn parses_toml_document() {
        let document: LimitTableDocument = toml::from_str(
            r#"
            [[entries]]
            curve = "C"
            rating_a = 10
            max_zs_ohm = 2.19
            "#,
        )
        .unwrap();
        let table = LimitTable::from(document);
        assert_eq!(table.max_zs(DeviceCurve::C, 10), Some(2.19));
        assert_eq!(table.to_document().entries.len(), 1);
    }
}
