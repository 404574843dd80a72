//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "JSON export of synthesized readings."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use std::{fs, io::Write, path::Path};

use am2_common::{LimitBasis, NominalPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{errors::Result, reading::TestReading, ReadingEngine};

/// Envelope around a batch of readings, self-describing via an embedded schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingReport {
    pub timestamp: DateTime<Utc>,
    pub limit_basis: LimitBasis,
    pub nominal_defaults: NominalPolicy,
    #[serde(default)]
    pub seed: Option<u64>,
    pub schema: serde_json::Value,
    pub readings: Vec<TestReading>,
}

impl ReadingReport {
    pub fn new(engine: &ReadingEngine, seed: Option<u64>, readings: Vec<TestReading>) -> Self {
        Self {
            timestamp: Utc::now(),
            limit_basis: engine.config().limit_basis,
            nominal_defaults: engine.config().nominal_defaults,
            seed,
            schema: reading_schema(),
            readings,
        }
    }

    pub fn compliant_count(&self) -> usize {
        self.readings.iter().filter(|r| r.compliant()).count()
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        info!(
            path = %path.display(),
            readings = self.readings.len(),
            compliant = self.compliant_count(),
            "reading report exported"
        );
        Ok(())
    }
}

fn reading_schema() -> serde_json::Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "TestReading",
        "type": "object",
        "properties": {
            "id": {"type": "string", "format": "uuid"},
            "circuitId": {"type": "string"},
            "testPointId": {"type": "string"},
            "testType": {"type": "string"},
            "subTest": {"type": ["string", "null"]},
            "value": {"type": "number"},
            "displayValue": {"type": "string"},
            "unit": {"type": "string"},
            "compliant": {"type": "boolean"},
            "timestamp": {"type": "string", "format": "date-time"},
            "eicColumns": {"type": "array", "items": {"type": "integer", "minimum": 0}}
        },
        "required": ["id", "circuitId", "testType", "value", "displayValue", "unit", "compliant", "eicColumns"],
    })
}
