//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Per-test rules turning nominal values into clamped, assessed readings."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use am2_common::{EngineConfig, NominalPolicy};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    errors::{ReadingError, Result},
    limits::LimitTable,
    model::{CircuitSpecification, ContinuityLeg, NominalField, RcdCheck, TestKind},
    variation::Variation,
};

/// Insulation baseline substituted under [`NominalPolicy::Lenient`].
pub const LENIENT_INSULATION_BASELINE_MOHM: f64 = 250.0;
/// RCD trip time substituted under [`NominalPolicy::Lenient`].
pub const LENIENT_RCD_TRIP_TIME_MS: f64 = 22.0;

pub const CONTINUITY_FLOOR_OHM: f64 = 0.01;
pub const CONTINUITY_CEILING_OHM: f64 = 10.0;
pub const POLARITY_NOMINAL_OHM: f64 = 0.03;
pub const POLARITY_STD_DEV_OHM: f64 = 0.005;
pub const POLARITY_CEILING_OHM: f64 = 0.1;
pub const INSULATION_MINIMUM_MOHM: f64 = 1.0;
pub const INSULATION_RANGE_MOHM: (f64, f64) = (0.5, 999.0);
pub const ZS_CEILING_FACTOR: f64 = 1.5;
pub const RCD_STD_DEV_MS: f64 = 4.0;
pub const RCD_RANGE_MS: (f64, f64) = (8.0, 295.0);
pub const RCD_MAX_TRIP_MS: f64 = 300.0;
pub const PFC_RANGE_KA: (f64, f64) = (0.5, 20.0);

/// Value reported by the RCD test button, which has no measured quantity.
pub const TEST_BUTTON_VALUE: f64 = 1.0;

const RING_LEG_SPREAD: f64 = 0.05;
const RING_LEG_CEILING_FACTOR: f64 = 3.0;
const R1R2_SPREAD: f64 = 0.06;
const R1R2_CEILING_FACTOR: f64 = 2.0;
const INSULATION_SPREAD: f64 = 0.10;
const ZS_SPREAD: f64 = 0.08;
const PFC_SPREAD: f64 = 0.05;

/// Physically plausible bounds for a test kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClampRange {
    pub min: f64,
    pub max: f64,
}

impl ClampRange {
    /// `None` when the bounds are not finite or do not form a range.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        (min.is_finite() && max.is_finite() && min <= max).then_some(Self { min, max })
    }

    pub fn apply(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }
}

/// Noise model for one test kind on one circuit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub mean: f64,
    pub std_dev: f64,
    pub range: ClampRange,
}

/// Raw outcome of a synthesized measurement, before formatting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub kind: TestKind,
    pub value: f64,
    pub compliant: bool,
    /// Clamp bounds applied, `None` for indicator-only checks.
    pub range: Option<ClampRange>,
}

/// Applies the per-kind rules against one limit table and engine policy.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
    limits: &'a LimitTable,
    config: &'a EngineConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(limits: &'a LimitTable, config: &'a EngineConfig) -> Self {
        Self { limits, config }
    }

    /// Draw, clamp and assess one reading.
    pub fn measure<V: Variation + ?Sized>(
        &self,
        circuit: &CircuitSpecification,
        kind: TestKind,
        variation: &mut V,
    ) -> Result<Measurement> {
        let measurement = match self.rule(circuit, kind)? {
            Some(rule) => {
                let raw = variation.generate(rule.mean, rule.std_dev);
                let value = rule.range.apply(raw);
                Measurement {
                    kind,
                    value,
                    compliant: self.assess(circuit, kind, value)?,
                    range: Some(rule.range),
                }
            }
            None => Measurement {
                kind,
                value: TEST_BUTTON_VALUE,
                compliant: true,
                range: None,
            },
        };
        debug!(
            circuit = %circuit.id,
            kind = %kind,
            value = measurement.value,
            compliant = measurement.compliant,
            "synthesized measurement"
        );
        Ok(measurement)
    }

    /// Noise rule for `kind`, or `None` when the check bypasses measurement.
    pub fn rule(&self, circuit: &CircuitSpecification, kind: TestKind) -> Result<Option<Rule>> {
        let rule = match kind {
            TestKind::Continuity(leg) => self.continuity_rule(circuit, kind, leg)?,
            TestKind::InsulationResistance(_) => {
                let nominal = self.nominal_or_default(
                    circuit,
                    circuit.insulation_baseline_mohm,
                    NominalField::InsulationBaseline,
                    kind,
                    LENIENT_INSULATION_BASELINE_MOHM,
                )?;
                Rule {
                    mean: nominal,
                    std_dev: nominal * INSULATION_SPREAD,
                    range: self.range(circuit, INSULATION_RANGE_MOHM.0, INSULATION_RANGE_MOHM.1)?,
                }
            }
            TestKind::LoopImpedance => {
                let nominal = required(circuit, circuit.nominal_zs(), NominalField::Zs, kind)?;
                let ze = required(circuit, circuit.ze_ohm, NominalField::Ze, kind)?;
                let stored_limit = circuit
                    .device
                    .max_zs_ohm
                    .or_else(|| self.limits.max_zs(circuit.device.curve, circuit.device.rating_a));
                let max_zs = required(circuit, stored_limit, NominalField::MaxZs, kind)?;
                Rule {
                    mean: nominal,
                    std_dev: nominal * ZS_SPREAD,
                    range: self.range(circuit, ze, ZS_CEILING_FACTOR * max_zs)?,
                }
            }
            TestKind::Rcd(RcdCheck::TestButton) => return Ok(None),
            TestKind::Rcd(RcdCheck::TripTime) => {
                let nominal = self.nominal_or_default(
                    circuit,
                    circuit.rcd_trip_time_ms,
                    NominalField::RcdTripTime,
                    kind,
                    LENIENT_RCD_TRIP_TIME_MS,
                )?;
                Rule {
                    mean: nominal,
                    std_dev: RCD_STD_DEV_MS,
                    range: self.range(circuit, RCD_RANGE_MS.0, RCD_RANGE_MS.1)?,
                }
            }
            TestKind::ProspectiveFaultCurrent => {
                let nominal =
                    required(circuit, circuit.pfc_ka, NominalField::ProspectiveFaultCurrent, kind)?;
                Rule {
                    mean: nominal,
                    std_dev: nominal * PFC_SPREAD,
                    range: self.range(circuit, PFC_RANGE_KA.0, PFC_RANGE_KA.1)?,
                }
            }
        };
        Ok(Some(rule))
    }

    fn continuity_rule(
        &self,
        circuit: &CircuitSpecification,
        kind: TestKind,
        leg: ContinuityLeg,
    ) -> Result<Rule> {
        let (value, field, spread, ceiling_factor) = match leg {
            ContinuityLeg::Polarity => {
                return Ok(Rule {
                    mean: POLARITY_NOMINAL_OHM,
                    std_dev: POLARITY_STD_DEV_OHM,
                    range: self.range(circuit, CONTINUITY_FLOOR_OHM, POLARITY_CEILING_OHM)?,
                })
            }
            ContinuityLeg::R1PlusR2 => (
                circuit.r1_plus_r2_ohm,
                NominalField::R1PlusR2,
                R1R2_SPREAD,
                R1R2_CEILING_FACTOR,
            ),
            ContinuityLeg::R1 => (
                circuit.ring.map(|r| r.r1_ohm),
                NominalField::RingR1,
                RING_LEG_SPREAD,
                RING_LEG_CEILING_FACTOR,
            ),
            ContinuityLeg::Rn => (
                circuit.ring.map(|r| r.rn_ohm),
                NominalField::RingRn,
                RING_LEG_SPREAD,
                RING_LEG_CEILING_FACTOR,
            ),
            ContinuityLeg::R2 => (
                circuit.ring.map(|r| r.r2_ohm),
                NominalField::RingR2,
                RING_LEG_SPREAD,
                RING_LEG_CEILING_FACTOR,
            ),
        };
        let nominal = required(circuit, value, field, kind)?;
        Ok(Rule {
            mean: nominal,
            std_dev: nominal * spread,
            range: self.range(circuit, CONTINUITY_FLOOR_OHM, nominal * ceiling_factor)?,
        })
    }

    /// Compliance verdict for an already clamped value.
    pub fn assess(&self, circuit: &CircuitSpecification, kind: TestKind, value: f64) -> Result<bool> {
        let compliant = match kind {
            TestKind::Continuity(ContinuityLeg::Polarity) => true,
            TestKind::Continuity(_) => value > 0.0 && value < CONTINUITY_CEILING_OHM,
            TestKind::InsulationResistance(_) => value >= INSULATION_MINIMUM_MOHM,
            TestKind::LoopImpedance => value <= self.zs_limit(circuit)?,
            TestKind::Rcd(RcdCheck::TestButton) => true,
            TestKind::Rcd(RcdCheck::TripTime) => value <= RCD_MAX_TRIP_MS,
            TestKind::ProspectiveFaultCurrent => {
                let capacity = required(
                    circuit,
                    circuit.device.breaking_capacity_ka,
                    NominalField::BreakingCapacity,
                    kind,
                )?;
                value <= capacity
            }
        };
        Ok(compliant)
    }

    /// Maximum loop impedance a reading is judged against.
    ///
    /// The table value (with the configured basis) wins; the circuit's stored
    /// limit is used as authored when the table has no entry.
    pub fn zs_limit(&self, circuit: &CircuitSpecification) -> Result<f64> {
        let device = &circuit.device;
        if let Some(limit) =
            self.limits
                .max_zs_for(device.curve, device.rating_a, self.config.limit_basis)
        {
            return Ok(limit);
        }
        match device.max_zs_ohm {
            Some(stored) => {
                warn!(
                    circuit = %circuit.id,
                    curve = %device.curve,
                    rating_a = device.rating_a,
                    stored,
                    "no tabulated max Zs for device, using circuit limit"
                );
                Ok(stored)
            }
            None => required(circuit, None, NominalField::MaxZs, TestKind::LoopImpedance),
        }
    }

    fn nominal_or_default(
        &self,
        circuit: &CircuitSpecification,
        value: Option<f64>,
        field: NominalField,
        kind: TestKind,
        default: f64,
    ) -> Result<f64> {
        match (value, self.config.nominal_defaults) {
            (Some(value), _) => Ok(value),
            (None, NominalPolicy::Lenient) => {
                warn!(
                    circuit = %circuit.id,
                    field = %field,
                    default,
                    "nominal value missing, substituting legacy default"
                );
                Ok(default)
            }
            (None, NominalPolicy::Strict) => required(circuit, None, field, kind),
        }
    }

    fn range(&self, circuit: &CircuitSpecification, min: f64, max: f64) -> Result<ClampRange> {
        ClampRange::new(min, max).ok_or_else(|| ReadingError::InconsistentCircuit {
            circuit_id: circuit.id.clone(),
            reason: format!("clamp range [{min}, {max}] is empty"),
        })
    }
}

fn required(
    circuit: &CircuitSpecification,
    value: Option<f64>,
    field: NominalField,
    kind: TestKind,
) -> Result<f64> {
    value.ok_or_else(|| ReadingError::MissingNominal {
        circuit_id: circuit.id.clone(),
        field,
        test: kind.test_type(),
    })
}
