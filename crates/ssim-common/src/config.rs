//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Configuration schema and loading for the reliability simulator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::logging::LogFormat;

/// Seconds per hour; every duration in the reliability schema is given in hours.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

const PROBABILITY_TOLERANCE: f64 = 1e-6;

fn default_enabled() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Convert a duration expressed in hours to seconds.
pub fn hours_to_seconds(hours: f64) -> f64 {
    hours * SECONDS_PER_HOUR
}

/// Primary configuration object for the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "SSIM_CONFIG";

    /// Load configuration from disk, respecting the `SSIM_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Parse a configuration file, picking the format from its extension.
    ///
    /// `.toml` and `.json` are parsed as such; anything else is treated as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config: AppConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents).map_err(anyhow::Error::new),
            Some("json") => serde_json::from_str(&contents).map_err(anyhow::Error::new),
            _ => serde_yaml::from_str(&contents).map_err(anyhow::Error::new),
        }
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.reliability.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    /// Parse a YAML document.
    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            serde_yaml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// The `reliability` section. An absent category disables it entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReliabilityConfig {
    /// Seed for the model RNG. A fresh random seed is drawn when unset.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub line: Option<FailureModeConfig>,
    #[serde(default)]
    pub switch: Option<SwitchReliabilityConfig>,
    #[serde(default)]
    pub generator: Option<GeneratorReliabilityConfig>,
}

impl ReliabilityConfig {
    /// Lines configuration, if present and enabled.
    pub fn line(&self) -> Option<&FailureModeConfig> {
        self.line.as_ref().filter(|cfg| cfg.enabled)
    }

    /// Switch configuration, if present and enabled.
    pub fn switch(&self) -> Option<&SwitchReliabilityConfig> {
        self.switch.as_ref().filter(|cfg| cfg.enabled)
    }

    /// Generator aging configuration, if present and enabled.
    pub fn generator_aging(&self) -> Option<&FailureModeConfig> {
        self.generator
            .as_ref()
            .and_then(|g| g.aging.as_ref())
            .filter(|cfg| cfg.enabled)
    }

    /// Generator operating wear-out configuration, if present and enabled.
    pub fn generator_wear_out(&self) -> Option<&FailureModeConfig> {
        self.generator
            .as_ref()
            .and_then(|g| g.operating_wear_out.as_ref())
            .filter(|cfg| cfg.enabled)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(line) = &self.line {
            line.validate("line")?;
        }
        if let Some(switch) = &self.switch {
            switch.validate()?;
        }
        if let Some(generator) = &self.generator {
            if let Some(aging) = &generator.aging {
                aging.validate("generator.aging")?;
            }
            if let Some(wear_out) = &generator.operating_wear_out {
                wear_out.validate("generator.operating_wear_out")?;
            }
        }
        Ok(())
    }
}

/// Failure/repair parameters for one failure mode. Durations are in hours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FailureModeConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Mean time between failures.
    pub mtbf: f64,
    pub min_repair: f64,
    pub max_repair: f64,
}

impl FailureModeConfig {
    pub fn new(mtbf: f64, min_repair: f64, max_repair: f64) -> Self {
        Self {
            enabled: true,
            mtbf,
            min_repair,
            max_repair,
        }
    }

    pub fn mtbf_seconds(&self) -> f64 {
        hours_to_seconds(self.mtbf)
    }

    pub fn min_repair_seconds(&self) -> f64 {
        hours_to_seconds(self.min_repair)
    }

    pub fn max_repair_seconds(&self) -> f64 {
        hours_to_seconds(self.max_repair)
    }

    pub fn validate(&self, section: &str) -> Result<()> {
        if !self.mtbf.is_finite() || self.mtbf <= 0.0 {
            bail!("{section}.mtbf must be a positive number (got {})", self.mtbf);
        }
        if !self.min_repair.is_finite() || self.min_repair < 0.0 {
            bail!(
                "{section}.min_repair must be non-negative (got {})",
                self.min_repair
            );
        }
        if !self.max_repair.is_finite() || self.max_repair < self.min_repair {
            bail!(
                "{section}.max_repair must be at least min_repair ({} < {})",
                self.max_repair,
                self.min_repair
            );
        }
        Ok(())
    }
}

/// Switch failure parameters plus the failure-state probability split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SwitchReliabilityConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub mtbf: f64,
    pub min_repair: f64,
    pub max_repair: f64,
    pub p_open: f64,
    pub p_closed: f64,
    pub p_current: f64,
}

impl SwitchReliabilityConfig {
    /// The failure/repair timing parameters as a plain mode config.
    pub fn timing(&self) -> FailureModeConfig {
        FailureModeConfig {
            enabled: self.enabled,
            mtbf: self.mtbf,
            min_repair: self.min_repair,
            max_repair: self.max_repair,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.timing().validate("switch")?;
        for (name, p) in [
            ("p_open", self.p_open),
            ("p_closed", self.p_closed),
            ("p_current", self.p_current),
        ] {
            if !(0.0..=1.0).contains(&p) {
                bail!("switch.{name} must be within [0, 1] (got {p})");
            }
        }
        let total = self.p_open + self.p_closed + self.p_current;
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            warn!(
                p_open = self.p_open,
                p_closed = self.p_closed,
                p_current = self.p_current,
                total,
                "switch failure-state probabilities do not sum to 1"
            );
        }
        Ok(())
    }
}

/// Generator failure modes; both may be enabled at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorReliabilityConfig {
    #[serde(default)]
    pub aging: Option<FailureModeConfig>,
    #[serde(default)]
    pub operating_wear_out: Option<FailureModeConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file. Console only when unset.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: None,
            format: default_log_format(),
        }
    }
}
