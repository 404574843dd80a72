//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Simulated multifunction-tester reading engine."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
//! Reading engine behind the virtual AM2 rig.
//!
//! A call takes an authored [`CircuitSpecification`] and a [`TestRequest`],
//! perturbs the circuit's nominal value with a caller-supplied
//! [`Variation`] source, clamps it to the instrument's plausible range,
//! judges it against BS 7671 limits, formats it for the display and routes it
//! to schedule-of-test columns. The engine keeps no state between calls.
pub mod api;
pub mod errors;
pub mod format;
pub mod io;
pub mod limits;
pub mod model;
pub mod reading;
pub mod reports;
pub mod routing;
pub mod synthesizer;
pub mod variation;

use std::borrow::Cow;

use am2_common::EngineConfig;
use chrono::Utc;
use tracing::info;

pub use errors::{ReadingError, Result};
pub use io::CircuitCatalog;
pub use limits::{LimitEntry, LimitTable};
pub use model::{
    CircuitSpecification, ContinuityLeg, DeviceCurve, InsulationPair, NominalField,
    ProtectiveDevice, RcdCheck, RingLegs, TestKind, TestRequest, TestType, Unit,
};
pub use reading::TestReading;
pub use synthesizer::{ClampRange, Measurement, Synthesizer};
pub use variation::{BoxMuller, NoiseSource, NormalNoise, Variation};

/// Shareable engine holding only read-only data.
#[derive(Debug, Clone)]
pub struct ReadingEngine {
    limits: Cow<'static, LimitTable>,
    config: EngineConfig,
}

impl Default for ReadingEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ReadingEngine {
    /// Engine judging against the built-in BS 7671 table.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            limits: Cow::Borrowed(LimitTable::bs7671()),
            config,
        }
    }

    /// Engine whose built-in table is overlaid with `config.limit_table`, if any.
    ///
    /// File rows add devices or correct tabulated values; devices the file
    /// does not list keep their BS 7671 limit.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let engine = match &config.limit_table {
            Some(path) => {
                let overrides = io::load_limit_table(path)?;
                let table = LimitTable::bs7671().with_overrides(overrides.entries());
                info!(
                    path = %path.display(),
                    overrides = overrides.len(),
                    entries = table.len(),
                    "loaded limit table overrides"
                );
                Self::new(config.clone()).with_limits(table)
            }
            None => Self::new(config),
        };
        Ok(engine)
    }

    /// Replace the whole limit table.
    pub fn with_limits(mut self, limits: LimitTable) -> Self {
        self.limits = Cow::Owned(limits);
        self
    }

    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn synthesizer(&self) -> Synthesizer<'_> {
        Synthesizer::new(&self.limits, &self.config)
    }

    /// Produce the reading the rig's tester shows for `request`.
    pub fn take_reading<V: Variation + ?Sized>(
        &self,
        circuit: &CircuitSpecification,
        request: &TestRequest,
        variation: &mut V,
    ) -> Result<TestReading> {
        if request.circuit_id != circuit.id {
            return Err(ReadingError::CircuitMismatch {
                requested: request.circuit_id.clone(),
                supplied: circuit.id.clone(),
            });
        }
        let kind = request.kind()?;
        self.reading_for(circuit, &request.test_point_id, kind, variation)
    }

    /// Reading for an already resolved kind.
    pub fn reading_for<V: Variation + ?Sized>(
        &self,
        circuit: &CircuitSpecification,
        test_point_id: &str,
        kind: TestKind,
        variation: &mut V,
    ) -> Result<TestReading> {
        let measurement = self.synthesizer().measure(circuit, kind, variation)?;
        Ok(TestReading::new(
            &circuit.id,
            test_point_id,
            measurement,
            Utc::now(),
        ))
    }

    /// One reading per applicable test, in schedule column order.
    pub fn take_schedule<V: Variation + ?Sized>(
        &self,
        circuit: &CircuitSpecification,
        test_point_id: &str,
        variation: &mut V,
    ) -> Result<Vec<TestReading>> {
        circuit
            .applicable_tests()
            .into_iter()
            .map(|kind| self.reading_for(circuit, test_point_id, kind, variation))
            .collect()
    }

    /// Look the circuit up in `catalog`, then take the reading.
    pub fn take_catalog_reading<V: Variation + ?Sized>(
        &self,
        catalog: &CircuitCatalog,
        request: &TestRequest,
        variation: &mut V,
    ) -> Result<TestReading> {
        let circuit = catalog.get(&request.circuit_id)?;
        self.take_reading(circuit, request, variation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn ring() -> CircuitSpecification {
        CircuitSpecification {
            id: "ring-1".into(),
            description: None,
            ze_ohm: Some(0.35),
            r1_plus_r2_ohm: Some(0.52),
            ring: Some(RingLegs {
                r1_ohm: 0.82,
                rn_ohm: 0.82,
                r2_ohm: 1.36,
            }),
            zs_ohm: Some(0.87),
            insulation_baseline_mohm: Some(250.0),
            rcd_trip_time_ms: Some(22.0),
            pfc_ka: Some(1.6),
            device: ProtectiveDevice {
                curve: DeviceCurve::B,
                rating_a: 32,
                max_zs_ohm: Some(1.37),
                breaking_capacity_ka: Some(6.0),
            },
        }
    }

    #[test]
    fn request_for_other_circuit_is_rejected() {
        let engine = ReadingEngine::default();
        let request = TestRequest::new("radial-2", "db", "zs", None);
        let err = engine
            .take_reading(&ring(), &request, &mut BoxMuller::seeded(1))
            .unwrap_err();
        assert!(matches!(err, ReadingError::CircuitMismatch { .. }));
    }

    #[test]
    fn unsupported_request_never_yields_a_reading() {
        let engine = ReadingEngine::default();
        let request = TestRequest::new("ring-1", "db", "continuity", Some("earth_rod"));
        let err = engine
            .take_reading(&ring(), &request, &mut BoxMuller::seeded(1))
            .unwrap_err();
        assert!(matches!(err, ReadingError::UnsupportedTest { .. }));
    }

    #[test]
    fn schedule_covers_every_column_in_order() {
        let engine = ReadingEngine::default();
        let readings = engine
            .take_schedule(&ring(), "db", &mut BoxMuller::seeded(11))
            .unwrap();
        assert_eq!(readings.len(), 11);
        let columns: Vec<u8> = readings
            .iter()
            .flat_map(|r| r.eic_columns().iter().copied())
            .collect();
        assert_eq!(columns, vec![15, 16, 17, 18, 21, 22, 23, 24, 25, 26]);
        assert!(readings.iter().all(|r| r.circuit_id() == "ring-1"));
    }

    #[test]
    fn seeded_sessions_repeat_values() {
        let engine = ReadingEngine::default();
        let request = TestRequest::new("ring-1", "db", "insulation", Some("live_earth"));
        let a = engine
            .take_reading(&ring(), &request, &mut BoxMuller::seeded(5))
            .unwrap();
        let b = engine
            .take_reading(&ring(), &request, &mut BoxMuller::seeded(5))
            .unwrap();
        assert_eq!(a.value(), b.value());
        assert_eq!(a.display_value(), b.display_value());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn engine_is_shared_across_threads() {
        let engine = ReadingEngine::default();
        let circuit = ring();
        let results: Vec<Vec<TestReading>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4u64)
                .map(|seed| {
                    let engine = &engine;
                    let circuit = &circuit;
                    scope.spawn(move || {
                        engine
                            .take_schedule(circuit, "db", &mut BoxMuller::seeded(seed))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|schedule| schedule.len() == 11));
    }

    #[test]
    fn custom_limit_table_changes_verdict() {
        let strict_table = LimitTable::bs7671().with_overrides([LimitEntry {
            curve: DeviceCurve::B,
            rating_a: 32,
            max_zs_ohm: 0.2,
        }]);
        let engine = ReadingEngine::default().with_limits(strict_table);
        let reading = engine
            .take_reading(
                &ring(),
                &TestRequest::new("ring-1", "db", "zs", None),
                &mut BoxMuller::seeded(3),
            )
            .unwrap();
        assert!(!reading.compliant());
    }
}
