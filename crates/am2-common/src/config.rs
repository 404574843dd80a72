//! ---
//! am2_section: "01-core-functionality"
//! am2_subsection: "module"
//! am2_type: "source"
//! am2_scope: "code"
//! am2_description: "Shared primitives and utilities for the rig runtime."
//! am2_version: "v0.0.0-prealpha"
//! am2_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object for the rig runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "AM2_RIG_CONFIG";

    /// Load configuration from disk, respecting the `AM2_RIG_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    ///
    /// Unlike the override variable, missing candidates are not an error: the
    /// built-in defaults are returned with `source` set to `None`.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!(
            inspected = %candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "no configuration file found, using defaults"
        );
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// How the engine treats a circuit that lacks a nominal value a test needs.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NominalPolicy {
    /// Missing nominal values are reported as configuration errors.
    #[default]
    Strict,
    /// Legacy convenience defaults are substituted for the insulation
    /// baseline and the RCD trip time.
    Lenient,
}

/// Which maximum earth-fault-loop impedance a reading is judged against.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum LimitBasis {
    /// Tabulated value at the reference temperature.
    #[default]
    Tabulated,
    /// Tabulated value scaled by the 0.8 operating-temperature correction.
    RuleOfThumb,
}

impl LimitBasis {
    pub const RULE_OF_THUMB_FACTOR: f64 = 0.8;

    pub fn factor(&self) -> f64 {
        match self {
            LimitBasis::Tabulated => 1.0,
            LimitBasis::RuleOfThumb => Self::RULE_OF_THUMB_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub nominal_defaults: NominalPolicy,
    #[serde(default)]
    pub limit_basis: LimitBasis,
    #[serde(default)]
    pub limit_table: Option<PathBuf>,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.limit_table {
            if !path.is_file() {
                return Err(anyhow!(
                    "engine limit_table {} does not exist or is not a file",
                    path.display()
                ));
            }
        }
        Ok(())
    }
}

/// Random source used to perturb nominal values.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoiseModel {
    #[default]
    BoxMuller,
    Normal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Fixed seed for reproducible sessions; entropy is used when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub noise: NoiseModel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

impl std::str::FromStr for NominalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(NominalPolicy::Strict),
            "lenient" => Ok(NominalPolicy::Lenient),
            other => Err(format!("unknown nominal policy: {}", other)),
        }
    }
}

impl std::str::FromStr for LimitBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "tabulated" => Ok(LimitBasis::Tabulated),
            "rule_of_thumb" => Ok(LimitBasis::RuleOfThumb),
            other => Err(format!("unknown limit basis: {}", other)),
        }
    }
}
