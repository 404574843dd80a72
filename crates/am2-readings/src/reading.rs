//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Immutable reading record handed to the certificate UI and grading."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    format::display_value,
    model::{TestKind, TestType, Unit},
    routing::columns_for,
    synthesizer::Measurement,
};

/// One synthesized instrument reading. Each call produces an independent record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TestReading {
    id: Uuid,
    circuit_id: String,
    test_point_id: String,
    test_type: TestType,
    #[serde(default)]
    sub_test: Option<String>,
    value: f64,
    display_value: String,
    unit: Unit,
    compliant: bool,
    timestamp: DateTime<Utc>,
    eic_columns: Vec<u8>,
}

impl TestReading {
    pub(crate) fn new(
        circuit_id: &str,
        test_point_id: &str,
        measurement: Measurement,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let kind = measurement.kind;
        Self {
            id: Uuid::new_v4(),
            circuit_id: circuit_id.to_owned(),
            test_point_id: test_point_id.to_owned(),
            test_type: kind.test_type(),
            sub_test: kind.sub_test().map(str::to_owned),
            value: measurement.value,
            display_value: display_value(kind, measurement.value),
            unit: kind.unit(),
            compliant: measurement.compliant,
            timestamp,
            eic_columns: columns_for(kind).to_vec(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn circuit_id(&self) -> &str {
        &self.circuit_id
    }

    pub fn test_point_id(&self) -> &str {
        &self.test_point_id
    }

    pub fn test_type(&self) -> TestType {
        self.test_type
    }

    pub fn sub_test(&self) -> Option<&str> {
        self.sub_test.as_deref()
    }

    /// Typed kind this reading answers.
    pub fn kind(&self) -> Option<TestKind> {
        TestKind::from_selector(self.test_type.as_str(), self.sub_test.as_deref()).ok()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn display_value(&self) -> &str {
        &self.display_value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn compliant(&self) -> bool {
        self.compliant
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn eic_columns(&self) -> &[u8] {
        &self.eic_columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InsulationPair, RcdCheck};

    #[test]
    fn record_is_assembled_from_measurement() {
        let measurement = Measurement {
            kind: TestKind::InsulationResistance(InsulationPair::Combined),
            value: 312.4,
            compliant: true,
            range: None,
        };
        let reading = TestReading::new("c1", "db", measurement, Utc::now());
        assert_eq!(reading.display_value(), ">200");
        assert_eq!(reading.unit(), Unit::Megohm);
        assert_eq!(reading.eic_columns(), &[21, 22]);
        assert_eq!(reading.sub_test(), None);
        assert_eq!(reading.kind(), Some(measurement.kind));
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let measurement = Measurement {
            kind: TestKind::Rcd(RcdCheck::TestButton),
            value: 1.0,
            compliant: true,
            range: None,
        };
        let reading = TestReading::new("c1", "socket-1", measurement, Utc::now());
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["displayValue"], "PASS");
        assert_eq!(json["eicColumns"], serde_json::json!([26]));
        assert_eq!(json["testType"], "rcd_trip_time");
        assert_eq!(json["subTest"], "test_button");
        assert_eq!(json["unit"], "");
        let back: TestReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, reading);
    }

    #[test]
    fn every_record_has_its_own_identity() {
        let measurement = Measurement {
            kind: TestKind::LoopImpedance,
            value: 0.9,
            compliant: true,
            range: None,
        };
        let a = TestReading::new("c1", "db", measurement, Utc::now());
        let b = TestReading::new("c1", "db", measurement, Utc::now());
        assert_ne!(a.id(), b.id());
    }
}
