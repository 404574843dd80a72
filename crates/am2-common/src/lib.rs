//! ---
//! am2_section: "01-core-functionality"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Shared primitives and utilities for the rig runtime."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
//! Shared primitives for the AM2 rig workspace.
//! This crate exposes configuration loading and tracing setup consumed by
//! the reading engine and the generator CLI.

pub mod config;
pub mod logging;

pub use config::{
    AppConfig, EngineConfig, LimitBasis, LoadedAppConfig, LoggingConfig, NoiseModel,
    NominalPolicy, SimulationConfig,
};
pub use logging::{init_tracing, LogFormat};
