//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Loading authored circuits, requests and limit tables."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use std::{fs, path::Path};

use indexmap::IndexMap;
use tracing::warn;

use crate::{
    errors::{ReadingError, Result},
    limits::{LimitTable, LimitTableDocument},
    model::{CircuitSpecification, TestRequest},
};

/// Authored circuits of one rig board, indexed by id in authoring order.
#[derive(Debug, Clone, Default)]
pub struct CircuitCatalog {
    circuits: IndexMap<String, CircuitSpecification>,
}

impl CircuitCatalog {
    /// Build a catalog; a repeated id keeps the last definition.
    pub fn new(circuits: impl IntoIterator<Item = CircuitSpecification>) -> Self {
        let mut map = IndexMap::new();
        for circuit in circuits {
            if let Some(previous) = map.insert(circuit.id.clone(), circuit) {
                warn!(circuit = %previous.id, "duplicate circuit id, keeping last definition");
            }
        }
        Self { circuits: map }
    }

    pub fn get(&self, id: &str) -> Result<&CircuitSpecification> {
        self.circuits
            .get(id)
            .ok_or_else(|| ReadingError::UnknownCircuit(id.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CircuitSpecification> {
        self.circuits.values()
    }

    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}

/// Circuits from a JSON or YAML list.
pub fn load_circuits_from_file(path: impl AsRef<Path>) -> Result<Vec<CircuitSpecification>> {
    let data = fs::read_to_string(path)?;
    let circuits = if data.trim_start().starts_with('[') {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data).map_err(ReadingError::YamlSerializationFailed)?
    };
    Ok(circuits)
}

pub fn load_catalog(path: impl AsRef<Path>) -> Result<CircuitCatalog> {
    Ok(CircuitCatalog::new(load_circuits_from_file(path)?))
}

pub fn load_requests_from_json(path: impl AsRef<Path>) -> Result<Vec<TestRequest>> {
    let data = fs::read_to_string(path)?;
    let requests = serde_json::from_str(&data)?;
    Ok(requests)
}

/// Limit table from TOML (`[[entries]]`) or JSON (`{"entries": [...]}`).
pub fn load_limit_table(path: impl AsRef<Path>) -> Result<LimitTable> {
    let data = fs::read_to_string(path)?;
    let document: LimitTableDocument = if data.trim_start().starts_with('{') {
        serde_json::from_str(&data)?
    } else {
        toml::from_str(&data)?
    };
    Ok(LimitTable::from(document))
}
