//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Read-only grid topology queried when reliability models are built."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::{ReliabilityError, Result};
use crate::event::Mode;

/// A line in the circuit; switches are lines with `is_switch` set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineElement {
    pub name: String,
    pub is_switch: bool,
}

/// Control state of a switch, as reported by the power-flow engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchControl {
    /// Normal state of the breaker controller governing the switch, if any.
    #[serde(default)]
    pub breaker_normal_state: Option<Mode>,
    /// Open/closed flag for each terminal of the switch element.
    #[serde(default)]
    pub terminals_open: Vec<bool>,
}

impl SwitchControl {
    /// The electrically normal state a repaired switch returns to.
    pub fn normal_state(&self) -> Mode {
        match self.breaker_normal_state {
            Some(state) => state,
            None if self.terminals_open.iter().any(|open| *open) => Mode::Open,
            None => Mode::Closed,
        }
    }
}

/// Static facts the reliability models need from the circuit.
pub trait GridTopology {
    /// All lines, in circuit order.
    fn lines(&self) -> Vec<LineElement>;

    /// All generator names, in circuit order.
    fn generators(&self) -> Vec<String>;

    fn switch_control(&self, switch: &str) -> Result<SwitchControl>;
}

/// Topology description loaded from a JSON or YAML file.
///
/// ```json
/// {
///   "lines": ["line1", "line2"],
///   "switches": { "sw1": { "breaker_normal_state": "open" }, "sw2": { "terminals_open": [false, true] } },
///   "generators": ["gen1"]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticTopology {
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub switches: IndexMap<String, SwitchControl>,
    #[serde(default)]
    pub generators: Vec<String>,
}

impl StaticTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line(mut self, name: impl Into<String>) -> Self {
        self.lines.push(name.into());
        self
    }

    pub fn with_switch(mut self, name: impl Into<String>, control: SwitchControl) -> Self {
        self.switches.insert(name.into(), control);
        self
    }

    pub fn with_generator(mut self, name: impl Into<String>) -> Self {
        self.generators.push(name.into());
        self
    }

    /// Load a topology, choosing JSON for `.json` files and YAML otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let topology = if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            serde_json::from_str(&data)
                .map_err(|err| ReliabilityError::Topology(format!("{}: {err}", path.display())))?
        } else {
            serde_yaml::from_str(&data)
                .map_err(|err| ReliabilityError::Topology(format!("{}: {err}", path.display())))?
        };
        Ok(topology)
    }
}

impl GridTopology for StaticTopology {
    fn lines(&self) -> Vec<LineElement> {
        self.lines
            .iter()
            .map(|name| LineElement {
                name: name.clone(),
                is_switch: false,
            })
            .chain(self.switches.keys().map(|name| LineElement {
                name: name.clone(),
                is_switch: true,
            }))
            .collect()
    }

    fn generators(&self) -> Vec<String> {
        self.generators.clone()
    }

    fn switch_control(&self, switch: &str) -> Result<SwitchControl> {
        self.switches
            .get(switch)
            .cloned()
            .ok_or_else(|| ReliabilityError::UnknownSwitch(switch.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn breaker_normal_state_takes_precedence() {
        let control = SwitchControl {
            breaker_normal_state: Some(Mode::Closed),
            terminals_open: vec![true, true],
        };
        assert_eq!(control.normal_state(), Mode::Closed);
    }

    #[test]
    fn open_terminal_means_normally_open() {
        let control = SwitchControl {
            breaker_normal_state: None,
            terminals_open: vec![false, true],
        };
        assert_eq!(control.normal_state(), Mode::Open);
        assert_eq!(SwitchControl::default().normal_state(), Mode::Closed);
    }

    #[test]
    fn lines_list_switches_after_plain_lines() {
        let topology = StaticTopology::new()
            .with_line("line1")
            .with_switch("sw1", SwitchControl::default())
            .with_line("line2");
        let lines = topology.lines();
        let names: Vec<(&str, bool)> = lines
            .iter()
            .map(|l| (l.name.as_str(), l.is_switch))
            .collect();
        assert_eq!(
            names,
            vec![("line1", false), ("line2", false), ("sw1", true)]
        );
        assert!(matches!(
            topology.switch_control("missing"),
            Err(ReliabilityError::UnknownSwitch(_))
        ));
    }

    #[test]
    fn loads_json_topology() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        write!(
            file,
            r#"{{"lines": ["l1"], "switches": {{"sw1": {{"breaker_normal_state": "open"}}}}, "generators": ["g1", "g2"]}}"#
        )?;
        let topology = StaticTopology::from_path(file.path())?;
        assert_eq!(topology.generators(), vec!["g1".to_owned(), "g2".to_owned()]);
        assert_eq!(topology.switch_control("sw1")?.normal_state(), Mode::Open);
        Ok(())
    }

    #[test]
    fn rejects_unknown_topology_keys() -> anyhow::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        writeln!(file, "lines: [l1]\ntransformers: [t1]")?;
        assert!(matches!(
            StaticTopology::from_path(file.path()),
            Err(ReliabilityError::Topology(_))
        ));
        Ok(())
    }
}
