//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Schedule-of-test-results column routing."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
//! Destination columns on the EIC schedule of test results.
//!
//! Indices are zero-based positions in the schedule grid, which runs from
//! wiring type (0) through the protective device and RCD details to the
//! measured results. Prospective fault current is a certificate header field
//! and therefore has no grid column.
use crate::model::{ContinuityLeg, InsulationPair, RcdCheck, TestKind};

pub const RING_R1: u8 = 15;
pub const RING_RN: u8 = 16;
pub const RING_R2: u8 = 17;
pub const R1_PLUS_R2: u8 = 18;
pub const INSULATION_LIVE_NEUTRAL: u8 = 21;
pub const INSULATION_LIVE_EARTH: u8 = 22;
pub const POLARITY: u8 = 23;
pub const ZS: u8 = 24;
pub const RCD_TRIP_TIME: u8 = 25;
pub const RCD_TEST_BUTTON: u8 = 26;

/// Ordered grid columns a reading of `kind` populates; empty for header fields.
pub fn columns_for(kind: TestKind) -> &'static [u8] {
    match kind {
        TestKind::Continuity(ContinuityLeg::R1) => &[RING_R1],
        TestKind::Continuity(ContinuityLeg::Rn) => &[RING_RN],
        TestKind::Continuity(ContinuityLeg::R2) => &[RING_R2],
        TestKind::Continuity(ContinuityLeg::R1PlusR2) => &[R1_PLUS_R2],
        TestKind::Continuity(ContinuityLeg::Polarity) => &[POLARITY],
        TestKind::InsulationResistance(InsulationPair::Combined) => {
            &[INSULATION_LIVE_NEUTRAL, INSULATION_LIVE_EARTH]
        }
        TestKind::InsulationResistance(InsulationPair::LiveNeutral) => &[INSULATION_LIVE_NEUTRAL],
        TestKind::InsulationResistance(InsulationPair::LiveEarth) => &[INSULATION_LIVE_EARTH],
        TestKind::LoopImpedance => &[ZS],
        TestKind::Rcd(RcdCheck::TripTime) => &[RCD_TRIP_TIME],
        TestKind::Rcd(RcdCheck::TestButton) => &[RCD_TEST_BUTTON],
        TestKind::ProspectiveFaultCurrent => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_agree() {
        let kinds = [
            TestKind::Continuity(ContinuityLeg::R1),
            TestKind::InsulationResistance(InsulationPair::Combined),
            TestKind::LoopImpedance,
            TestKind::Rcd(RcdCheck::TestButton),
            TestKind::ProspectiveFaultCurrent,
        ];
        for kind in kinds {
            let first = columns_for(kind).to_vec();
            for _ in 0..100 {
                assert_eq!(columns_for(kind), first.as_slice());
            }
        }
    }

    #[test]
    fn header_fields_have_no_grid_column() {
        assert!(columns_for(TestKind::ProspectiveFaultCurrent).is_empty());
    }

    #[test]
    fn combined_insulation_fills_both_columns_in_order() {
        assert_eq!(
            columns_for(TestKind::InsulationResistance(InsulationPair::Combined)),
            &[21, 22]
        );
        assert_eq!(columns_for(TestKind::LoopImpedance), &[24]);
        assert_eq!(columns_for(TestKind::Rcd(RcdCheck::TripTime)), &[25]);
        assert_eq!(columns_for(TestKind::Continuity(ContinuityLeg::Polarity)), &[23]);
    }
}
