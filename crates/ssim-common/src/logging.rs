//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tracing subscriber setup for simulator binaries."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "SSIM_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

// Dropping a guard stops its writer thread, so both live for the process.
static GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

/// Console and file log encodings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Build the filter from `SSIM_LOG`, then `RUST_LOG`, then `info`.
///
/// An unparsable directive falls back to `info` instead of failing start-up.
fn log_filter(ssim_log: Option<&str>, rust_log: Option<&str>) -> EnvFilter {
    ssim_log
        .or(rust_log)
        .and_then(|directive| match EnvFilter::try_new(directive) {
            Ok(filter) => Some(filter),
            Err(err) => {
                eprintln!("invalid log directive {directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
                None
            }
        })
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber for a simulator binary.
///
/// Console output goes to stderr so event streams on stdout stay machine
/// readable. With `config.directory` set, a daily rolling JSON file named
/// after `service_name` is written there too. Calling this twice keeps the
/// first subscriber.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let ssim_log = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(ssim_log.as_deref(), rust_log.as_deref());

    let mut guards = Vec::new();
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);

    let console = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stderr_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stderr_writer)
            .boxed(),
    };

    let file = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory)?;
            let appender = daily(directory, format!("{service_name}.log"));
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            guards.push(file_guard);
            Some(
                fmt::layer()
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .is_ok();
    if installed {
        let _ = GUARDS.set(guards);
    }

    info!(
        service = %service_name,
        log_dir = ?config.directory,
        format = ?config.format,
        installed,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn ssim_log_takes_precedence_over_rust_log() {
        let filter = log_filter(Some("ssim_reliability=debug"), Some("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let filter = log_filter(None, Some("warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn missing_or_invalid_directive_defaults_to_info() {
        assert_eq!(log_filter(None, None).max_level_hint(), Some(LevelFilter::INFO));
        let filter = log_filter(Some("ssim=notalevel"), Some("trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn log_format_uses_kebab_case_names() {
        let format: LogFormat = serde_yaml::from_str("structured-json").unwrap();
        assert_eq!(format, LogFormat::StructuredJson);
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }
}
