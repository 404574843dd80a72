//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Instrument display rendering for synthesized readings."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use crate::model::{RcdCheck, TestKind};

/// Shown by the insulation tester once the reading passes its display range.
pub const INSULATION_OVER_RANGE: &str = ">200";
pub const TEST_BUTTON_DISPLAY: &str = "PASS";

const INSULATION_OVER_RANGE_MOHM: f64 = 200.0;
const INSULATION_COARSE_MOHM: f64 = 100.0;

/// Render a clamped value the way the handheld tester would show it.
pub fn display_value(kind: TestKind, value: f64) -> String {
    match kind {
        TestKind::Continuity(_) | TestKind::LoopImpedance | TestKind::ProspectiveFaultCurrent => {
            format!("{:.2}", value)
        }
        TestKind::InsulationResistance(_) => insulation(value),
        TestKind::Rcd(RcdCheck::TripTime) => whole(value),
        TestKind::Rcd(RcdCheck::TestButton) => TEST_BUTTON_DISPLAY.to_owned(),
    }
}

// Resolution coarsens at high readings.
fn insulation(value: f64) -> String {
    if value >= INSULATION_OVER_RANGE_MOHM {
        INSULATION_OVER_RANGE.to_owned()
    } else if value >= INSULATION_COARSE_MOHM {
        whole(value)
    } else {
        format!("{:.1}", value)
    }
}

// `{:.0}` rounds ties to even; the tester rounds half up.
fn whole(value: f64) -> String {
    format!("{}", value.round() as i64)
}
