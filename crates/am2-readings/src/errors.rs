//! ---
//! am2_section: "08-instrument-simulation"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Error types for the reading engine."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use thiserror::Error;

use crate::model::{NominalField, TestType};

pub type Result<T> = std::result::Result<T, ReadingError>;

#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("circuit {circuit_id} has no {field} value, required for {test} readings")]
    MissingNominal {
        circuit_id: String,
        field: NominalField,
        test: TestType,
    },
    #[error("unsupported test selector {test_type}/{}", .sub_test.as_deref().unwrap_or("-"))]
    UnsupportedTest {
        test_type: String,
        sub_test: Option<String>,
    },
    #[error("circuit {circuit_id} is inconsistent: {reason}")]
    InconsistentCircuit { circuit_id: String, reason: String },
    #[error("request targets circuit {requested} but circuit {supplied} was supplied")]
    CircuitMismatch { requested: String, supplied: String },
    #[error("circuit {0} not found in catalog")]
    UnknownCircuit(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("toml parse error: {0}")]
    TomlParseFailed(#[from] toml::de::Error),
}

impl ReadingError {
    /// Errors the caller fixes by correcting authored circuit data.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReadingError::MissingNominal { .. }
                | ReadingError::InconsistentCircuit { .. }
                | ReadingError::UnknownCircuit(_)
        )
    }

    /// Errors the caller fixes by correcting the request.
    pub fn is_request(&self) -> bool {
        matches!(
            self,
            ReadingError::UnsupportedTest { .. } | ReadingError::CircuitMismatch { .. }
        )
    }
}
