//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Shared primitives for the reliability simulator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Shared primitives for the grid reliability simulator workspace.
//! This crate exposes the configuration schema and loader, plus the tracing
//! setup used by the binaries.

pub mod config;
pub mod logging;

pub use config::{
    hours_to_seconds, AppConfig, FailureModeConfig, GeneratorReliabilityConfig, LoadedAppConfig,
    LoggingConfig, ReliabilityConfig, SwitchReliabilityConfig, SECONDS_PER_HOUR,
};
pub use logging::{init_tracing, LogFormat};
