//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Circuit, request and test-kind types consumed by the reading engine."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ReadingError, Result};

/// Authored description of one simulated circuit and its "true" characteristics.
///
/// Nominal values are optional so that incomplete test data can be reported
/// instead of silently replaced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitSpecification {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ze_ohm: Option<f64>,
    #[serde(default)]
    pub r1_plus_r2_ohm: Option<f64>,
    #[serde(default)]
    pub ring: Option<RingLegs>,
    #[serde(default)]
    pub zs_ohm: Option<f64>,
    #[serde(default)]
    pub insulation_baseline_mohm: Option<f64>,
    #[serde(default)]
    pub rcd_trip_time_ms: Option<f64>,
    #[serde(default)]
    pub pfc_ka: Option<f64>,
    pub device: ProtectiveDevice,
}

impl CircuitSpecification {
    pub fn is_ring(&self) -> bool {
        self.ring.is_some()
    }

    /// Nominal loop impedance, derived as `Ze + (R1+R2)` when not authored directly.
    pub fn nominal_zs(&self) -> Option<f64> {
        self.zs_ohm.or_else(|| match (self.ze_ohm, self.r1_plus_r2_ohm) {
            (Some(ze), Some(r1r2)) => Some(ze + r1r2),
            _ => None,
        })
    }

    /// Every test kind that can be carried out on this circuit, in certificate column order.
    pub fn applicable_tests(&self) -> Vec<TestKind> {
        let mut kinds = Vec::with_capacity(11);
        if self.is_ring() {
            kinds.extend([
                TestKind::Continuity(ContinuityLeg::R1),
                TestKind::Continuity(ContinuityLeg::Rn),
                TestKind::Continuity(ContinuityLeg::R2),
            ]);
        }
        kinds.extend([
            TestKind::Continuity(ContinuityLeg::R1PlusR2),
            TestKind::InsulationResistance(InsulationPair::LiveNeutral),
            TestKind::InsulationResistance(InsulationPair::LiveEarth),
            TestKind::Continuity(ContinuityLeg::Polarity),
            TestKind::LoopImpedance,
            TestKind::Rcd(RcdCheck::TripTime),
            TestKind::Rcd(RcdCheck::TestButton),
            TestKind::ProspectiveFaultCurrent,
        ]);
        kinds
    }
}

/// End-to-end resistances of the three ring conductors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RingLegs {
    pub r1_ohm: f64,
    pub rn_ohm: f64,
    pub r2_ohm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProtectiveDevice {
    pub curve: DeviceCurve,
    pub rating_a: u32,
    /// Limit recorded on the circuit's schedule row, used when the table has no entry.
    #[serde(default)]
    pub max_zs_ohm: Option<f64>,
    #[serde(default)]
    pub breaking_capacity_ka: Option<f64>,
}

/// Instantaneous trip characteristic of an MCB or RCBO.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceCurve {
    B,
    C,
    D,
}

impl fmt::Display for DeviceCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceCurve::B => "B",
            DeviceCurve::C => "C",
            DeviceCurve::D => "D",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for DeviceCurve {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B" | "TYPE B" => Ok(DeviceCurve::B),
            "C" | "TYPE C" => Ok(DeviceCurve::C),
            "D" | "TYPE D" => Ok(DeviceCurve::D),
            other => Err(format!("unknown device curve: {}", other)),
        }
    }
}

/// One UI interaction asking the rig for a reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestRequest {
    pub circuit_id: String,
    pub test_point_id: String,
    pub test_type: String,
    #[serde(default)]
    pub sub_test: Option<String>,
}

impl TestRequest {
    pub fn new(
        circuit_id: impl Into<String>,
        test_point_id: impl Into<String>,
        test_type: impl Into<String>,
        sub_test: Option<&str>,
    ) -> Self {
        Self {
            circuit_id: circuit_id.into(),
            test_point_id: test_point_id.into(),
            test_type: test_type.into(),
            sub_test: sub_test.map(str::to_owned),
        }
    }

    pub fn kind(&self) -> Result<TestKind> {
        TestKind::from_selector(&self.test_type, self.sub_test.as_deref())
    }
}

/// Measurement families offered by the multifunction tester.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Continuity,
    InsulationResistance,
    LoopImpedance,
    RcdTripTime,
    ProspectiveFaultCurrent,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Continuity => "continuity",
            TestType::InsulationResistance => "insulation_resistance",
            TestType::LoopImpedance => "loop_impedance",
            TestType::RcdTripTime => "rcd_trip_time",
            TestType::ProspectiveFaultCurrent => "prospective_fault_current",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuity" => Ok(TestType::Continuity),
            "insulation" | "insulation_resistance" | "ir" => Ok(TestType::InsulationResistance),
            "zs" | "loop_impedance" => Ok(TestType::LoopImpedance),
            "rcd" | "rcd_trip_time" => Ok(TestType::RcdTripTime),
            "pfc" | "prospective_fault_current" => Ok(TestType::ProspectiveFaultCurrent),
            other => Err(format!("unknown test type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContinuityLeg {
    R1,
    Rn,
    R2,
    R1PlusR2,
    Polarity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsulationPair {
    /// Single reading entered against both insulation columns.
    Combined,
    LiveNeutral,
    LiveEarth,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RcdCheck {
    TripTime,
    TestButton,
}

/// Typed (test type, sub-test) pair. Every variant has a synthesis rule, a
/// display rule and a certificate route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Continuity(ContinuityLeg),
    InsulationResistance(InsulationPair),
    LoopImpedance,
    Rcd(RcdCheck),
    ProspectiveFaultCurrent,
}

impl TestKind {
    /// Resolve the UI's text selectors, rejecting any pair without a rule.
    pub fn from_selector(test_type: &str, sub_test: Option<&str>) -> Result<Self> {
        let unsupported = || ReadingError::UnsupportedTest {
            test_type: test_type.to_owned(),
            sub_test: sub_test.map(str::to_owned),
        };
        let parsed: TestType = test_type.parse().map_err(|_| unsupported())?;
        let sub = sub_test
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());

        let kind = match (parsed, sub.as_deref()) {
            (TestType::Continuity, None | Some("r1r2" | "r1_r2" | "r1+r2")) => {
                TestKind::Continuity(ContinuityLeg::R1PlusR2)
            }
            (TestType::Continuity, Some("r1")) => TestKind::Continuity(ContinuityLeg::R1),
            (TestType::Continuity, Some("rn")) => TestKind::Continuity(ContinuityLeg::Rn),
            (TestType::Continuity, Some("r2")) => TestKind::Continuity(ContinuityLeg::R2),
            (TestType::Continuity, Some("polarity")) => {
                TestKind::Continuity(ContinuityLeg::Polarity)
            }
            (TestType::InsulationResistance, None) => {
                TestKind::InsulationResistance(InsulationPair::Combined)
            }
            (TestType::InsulationResistance, Some("live_neutral" | "l-n" | "ln")) => {
                TestKind::InsulationResistance(InsulationPair::LiveNeutral)
            }
            (TestType::InsulationResistance, Some("live_earth" | "l-e" | "le")) => {
                TestKind::InsulationResistance(InsulationPair::LiveEarth)
            }
            (TestType::LoopImpedance, None) => TestKind::LoopImpedance,
            (TestType::RcdTripTime, None | Some("trip_time" | "x1")) => {
                TestKind::Rcd(RcdCheck::TripTime)
            }
            (TestType::RcdTripTime, Some("test_button")) => TestKind::Rcd(RcdCheck::TestButton),
            (TestType::ProspectiveFaultCurrent, None) => TestKind::ProspectiveFaultCurrent,
            _ => return Err(unsupported()),
        };
        Ok(kind)
    }

    pub fn test_type(&self) -> TestType {
        match self {
            TestKind::Continuity(_) => TestType::Continuity,
            TestKind::InsulationResistance(_) => TestType::InsulationResistance,
            TestKind::LoopImpedance => TestType::LoopImpedance,
            TestKind::Rcd(_) => TestType::RcdTripTime,
            TestKind::ProspectiveFaultCurrent => TestType::ProspectiveFaultCurrent,
        }
    }

    /// Canonical sub-test selector, `None` for kinds without sub-tests.
    pub fn sub_test(&self) -> Option<&'static str> {
        match self {
            TestKind::Continuity(ContinuityLeg::R1) => Some("r1"),
            TestKind::Continuity(ContinuityLeg::Rn) => Some("rn"),
            TestKind::Continuity(ContinuityLeg::R2) => Some("r2"),
            TestKind::Continuity(ContinuityLeg::R1PlusR2) => Some("r1r2"),
            TestKind::Continuity(ContinuityLeg::Polarity) => Some("polarity"),
            TestKind::InsulationResistance(InsulationPair::Combined) => None,
            TestKind::InsulationResistance(InsulationPair::LiveNeutral) => Some("live_neutral"),
            TestKind::InsulationResistance(InsulationPair::LiveEarth) => Some("live_earth"),
            TestKind::LoopImpedance => None,
            TestKind::Rcd(RcdCheck::TripTime) => Some("trip_time"),
            TestKind::Rcd(RcdCheck::TestButton) => Some("test_button"),
            TestKind::ProspectiveFaultCurrent => None,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            TestKind::Continuity(_) | TestKind::LoopImpedance => Unit::Ohm,
            TestKind::InsulationResistance(_) => Unit::Megohm,
            TestKind::Rcd(RcdCheck::TripTime) => Unit::Millisecond,
            TestKind::Rcd(RcdCheck::TestButton) => Unit::Indicator,
            TestKind::ProspectiveFaultCurrent => Unit::Kiloamp,
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sub_test() {
            Some(sub) => write!(f, "{}/{}", self.test_type(), sub),
            None => write!(f, "{}", self.test_type()),
        }
    }
}

/// Nominal circuit values a test can depend on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NominalField {
    Ze,
    R1PlusR2,
    RingR1,
    RingRn,
    RingR2,
    Zs,
    MaxZs,
    InsulationBaseline,
    RcdTripTime,
    ProspectiveFaultCurrent,
    BreakingCapacity,
}

impl fmt::Display for NominalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NominalField::Ze => "ze_ohm",
            NominalField::R1PlusR2 => "r1_plus_r2_ohm",
            NominalField::RingR1 => "ring.r1_ohm",
            NominalField::RingRn => "ring.rn_ohm",
            NominalField::RingR2 => "ring.r2_ohm",
            NominalField::Zs => "zs_ohm",
            NominalField::MaxZs => "device.max_zs_ohm",
            NominalField::InsulationBaseline => "insulation_baseline_mohm",
            NominalField::RcdTripTime => "rcd_trip_time_ms",
            NominalField::ProspectiveFaultCurrent => "pfc_ka",
            NominalField::BreakingCapacity => "device.breaking_capacity_ka",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Unit {
    #[serde(rename = "Ω")]
    Ohm,
    #[serde(rename = "MΩ")]
    Megohm,
    #[serde(rename = "ms")]
    Millisecond,
    #[serde(rename = "kA")]
    Kiloamp,
    #[serde(rename = "")]
    Indicator,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Ohm => "Ω",
            Unit::Megohm => "MΩ",
            Unit::Millisecond => "ms",
            Unit::Kiloamp => "kA",
            Unit::Indicator => "",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_resolve_to_kinds() {
        assert_eq!(
            TestKind::from_selector("continuity", None).unwrap(),
            TestKind::Continuity(ContinuityLeg::R1PlusR2)
        );
        assert_eq!(
            TestKind::from_selector("Continuity", Some("R1")).unwrap(),
            TestKind::Continuity(ContinuityLeg::R1)
        );
        assert_eq!(
            TestKind::from_selector("ir", Some("l-e")).unwrap(),
            TestKind::InsulationResistance(InsulationPair::LiveEarth)
        );
        assert_eq!(
            TestKind::from_selector("rcd", Some("test_button")).unwrap(),
            TestKind::Rcd(RcdCheck::TestButton)
        );
        assert_eq!(
            TestKind::from_selector("zs", Some("")).unwrap(),
            TestKind::LoopImpedance
        );
    }

    #[test]
    fn unknown_pairs_are_rejected() {
        let err = TestKind::from_selector("zs", Some("polarity")).unwrap_err();
        assert!(matches!(err, ReadingError::UnsupportedTest { .. }));
        assert!(err.is_request());
        assert!(TestKind::from_selector("earth_electrode", None).is_err());
        assert!(TestKind::from_selector("pfc", Some("live_earth")).is_err());
    }

    #[test]
    fn canonical_selectors_round_trip() {
        let circuit = CircuitSpecification {
            id: "ring".into(),
            description: None,
            ze_ohm: Some(0.35),
            r1_plus_r2_ohm: Some(0.52),
            ring: Some(RingLegs {
                r1_ohm: 0.8,
                rn_ohm: 0.8,
                r2_ohm: 1.3,
            }),
            zs_ohm: None,
            insulation_baseline_mohm: None,
            rcd_trip_time_ms: None,
            pfc_ka: None,
            device: ProtectiveDevice {
                curve: DeviceCurve::B,
                rating_a: 32,
                max_zs_ohm: None,
                breaking_capacity_ka: None,
            },
        };
        for kind in circuit.applicable_tests() {
            let parsed = TestKind::from_selector(kind.test_type().as_str(), kind.sub_test())
                .expect("canonical selector");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn nominal_zs_is_derived_from_ze_and_r1r2() {
        let mut circuit: CircuitSpecification = serde_json::from_value(serde_json::json!({
            "id": "radial",
            "ze_ohm": 0.35,
            "r1_plus_r2_ohm": 0.52,
            "device": { "curve": "B", "rating_a": 32 }
        }))
        .unwrap();
        assert!((circuit.nominal_zs().unwrap() - 0.87).abs() < 1e-9);
        circuit.zs_ohm = Some(0.9);
        assert_eq!(circuit.nominal_zs(), Some(0.9));
        circuit.zs_ohm = None;
        circuit.ze_ohm = None;
        assert_eq!(circuit.nominal_zs(), None);
        assert_eq!(circuit.applicable_tests().len(), 8);
    }
}
