//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Error types for the reliability engine."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReliabilityError>;

#[derive(Debug, Error)]
pub enum ReliabilityError {
    #[error("operating-time failure mode updated without an operating time")]
    MissingOperatingTime,
    #[error("generator {0} has no reliability model")]
    UnknownGenerator(String),
    #[error("switch {0} not found in grid topology")]
    UnknownSwitch(String),
    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },
    #[error("invalid reliability configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed event: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("event serialization failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed topology: {0}")]
    Topology(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReliabilityError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
