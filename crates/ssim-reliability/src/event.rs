//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Failure, repair, and event records exchanged with the topology layer."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ReliabilityError, Result};

/// Arbitrary payload carried by failures, repairs, and events.
pub type EventData = Map<String, Value>;

/// Connection state of a component after a failure or restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Open,
    Closed,
    /// Leave the connection as it is.
    Current,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Open => "open",
            Mode::Closed => "closed",
            Mode::Current => "current",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Fail,
    Restore,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Fail => f.write_str("fail"),
            EventType::Restore => f.write_str("restore"),
        }
    }
}

/// State applied when a repair completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repair {
    pub connection: Mode,
    #[serde(default)]
    pub data: EventData,
}

impl Repair {
    pub fn new(connection: Mode) -> Self {
        Self {
            connection,
            data: EventData::new(),
        }
    }
}

/// Consequence of a failure together with its eventual repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Time needed to complete the repair, in seconds.
    pub repair_time: f64,
    pub repair: Repair,
    pub connection: Mode,
    #[serde(default)]
    pub data: EventData,
}

impl Failure {
    pub fn new(connection: Mode, repair_time: f64, repair: Repair) -> Self {
        Self {
            repair_time,
            repair,
            connection,
            data: EventData::new(),
        }
    }
}

/// Grid element category; the prefix of a qualified element name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Line,
    Switch,
    Generator,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Line => "line",
            ElementKind::Switch => "switch",
            ElementKind::Generator => "generator",
        }
    }

    /// Qualified element name, e.g. `line.line2`.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.as_str(), name)
    }
}

/// A failure or restoration of a single grid element.
///
/// Serialized as `{"type", "mode", "element", "data"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventType,
    pub mode: Mode,
    pub element: String,
    pub data: EventData,
}

impl Event {
    pub fn new(kind: EventType, mode: Mode, element: impl Into<String>) -> Self {
        Self {
            kind,
            mode,
            element: element.into(),
            data: EventData::new(),
        }
    }

    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// `FAIL` event for `element` in the failure's connection state.
    pub fn from_failure(failure: &Failure, element: impl Into<String>) -> Self {
        Self::new(EventType::Fail, failure.connection, element).with_data(failure.data.clone())
    }

    /// `RESTORE` event for `element` in the repair's connection state.
    pub fn from_repair(repair: &Repair, element: impl Into<String>) -> Self {
        Self::new(EventType::Restore, repair.connection, element).with_data(repair.data.clone())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(ReliabilityError::Decode)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ReliabilityError::Encode)
    }
}
