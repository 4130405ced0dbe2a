//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Grid-wide reliability orchestrator merging per-component event streams."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use ssim_common::config::ReliabilityConfig;
use tracing::{debug, info};

use crate::errors::{ReliabilityError, Result};
use crate::event::{ElementKind, Event};
use crate::failure_mode::{
    ConnectionSampler, FailureDistribution, FailureMode, StateProbabilities, Tick,
};
use crate::multimode::{ComponentEvent, MultiModeReliabilityModel};
use crate::topology::GridTopology;

/// Operating time reported for one generator on a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorStatus {
    pub name: String,
    /// Cumulative operating time in seconds.
    pub operating_time: f64,
}

impl GeneratorStatus {
    pub fn new(name: impl Into<String>, operating_time: f64) -> Self {
        Self {
            name: name.into(),
            operating_time,
        }
    }
}

type ComponentModels = IndexMap<String, MultiModeReliabilityModel>;

/// Reliability models for every line, switch, and generator of a grid.
///
/// Components are visited lines first, then switches, then generators, each
/// in the order the topology listed them. Event output follows that order.
#[derive(Debug, Clone)]
pub struct GridReliabilityModel {
    seed: u64,
    rng: StdRng,
    lines: ComponentModels,
    switches: ComponentModels,
    generators: ComponentModels,
}

impl GridReliabilityModel {
    /// A model with no components.
    pub fn empty(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
            lines: IndexMap::new(),
            switches: IndexMap::new(),
            generators: IndexMap::new(),
        }
    }

    /// Build one model per enabled grid element.
    ///
    /// The RNG is seeded from `config.seed`, or from a fresh random seed when
    /// none is configured. Any configuration or topology error aborts the build.
    pub fn new(config: &ReliabilityConfig, topology: &dyn GridTopology) -> Result<Self> {
        config
            .validate()
            .map_err(|err| ReliabilityError::InvalidConfig(format!("{err:#}")))?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let mut model = Self::empty(seed);

        let lines = topology.lines();
        if let Some(line_config) = config.line() {
            let distribution = FailureDistribution::from_config(line_config)?;
            for line in lines.iter().filter(|line| !line.is_switch) {
                let mode = FailureMode::aging(distribution.clone(), &mut model.rng);
                insert_unique(
                    &mut model.lines,
                    ElementKind::Line,
                    &line.name,
                    vec![mode],
                )?;
            }
        }

        if let Some(switch_config) = config.switch() {
            let distribution = FailureDistribution::from_config(&switch_config.timing())?
                .with_failure_state(ConnectionSampler::Weighted(StateProbabilities {
                    p_open: switch_config.p_open,
                    p_closed: switch_config.p_closed,
                    p_current: switch_config.p_current,
                }));
            for switch in lines.iter().filter(|line| line.is_switch) {
                let normal_state = topology.switch_control(&switch.name)?.normal_state();
                debug!(switch = %switch.name, normal_state = %normal_state, "switch normal state");
                let mode = FailureMode::aging(
                    distribution
                        .clone()
                        .with_repair_state(ConnectionSampler::Fixed(normal_state)),
                    &mut model.rng,
                );
                insert_unique(
                    &mut model.switches,
                    ElementKind::Switch,
                    &switch.name,
                    vec![mode],
                )?;
            }
        }

        let aging = config
            .generator_aging()
            .map(FailureDistribution::from_config)
            .transpose()?;
        let wear_out = config
            .generator_wear_out()
            .map(FailureDistribution::from_config)
            .transpose()?;
        if aging.is_some() || wear_out.is_some() {
            for generator in topology.generators() {
                let mut modes = Vec::with_capacity(2);
                if let Some(distribution) = &aging {
                    modes.push(FailureMode::aging(distribution.clone(), &mut model.rng));
                }
                if let Some(distribution) = &wear_out {
                    modes.push(FailureMode::operating_wear_out(
                        distribution.clone(),
                        &mut model.rng,
                    ));
                }
                insert_unique(
                    &mut model.generators,
                    ElementKind::Generator,
                    &generator,
                    modes,
                )?;
            }
        }

        info!(
            seed,
            lines = model.lines.len(),
            switches = model.switches.len(),
            generators = model.generators.len(),
            "created grid reliability model"
        );
        Ok(model)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Earliest time any component needs to be revisited; infinite when there
    /// are no components.
    pub fn peek(&self) -> f64 {
        self.models()
            .map(|(_, _, model)| model.next_update())
            .fold(f64::INFINITY, f64::min)
    }

    /// Drain at most one event per component.
    pub fn events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        drain_events(
            ElementKind::Line,
            &mut self.lines,
            &mut self.rng,
            &mut events,
        );
        drain_events(
            ElementKind::Switch,
            &mut self.switches,
            &mut self.rng,
            &mut events,
        );
        drain_events(
            ElementKind::Generator,
            &mut self.generators,
            &mut self.rng,
            &mut events,
        );
        events
    }

    /// Advance lines and switches to `time`, and each reported generator to
    /// its operating time. Generators without a status entry are not advanced.
    ///
    /// Generator names are checked before anything is advanced, so an unknown
    /// name leaves the model unchanged.
    pub fn update(&mut self, time: f64, generator_status: &[GeneratorStatus]) -> Result<()> {
        if let Some(status) = generator_status
            .iter()
            .find(|status| !self.generators.contains_key(&status.name))
        {
            return Err(ReliabilityError::UnknownGenerator(status.name.clone()));
        }
        let tick = Tick::wall(time);
        for model in self.lines.values_mut().chain(self.switches.values_mut()) {
            model.update(&tick)?;
        }
        for status in generator_status {
            if let Some(model) = self.generators.get_mut(&status.name) {
                model.update(&Tick::operating(time, status.operating_time))?;
            }
        }
        Ok(())
    }

    pub fn line(&self, name: &str) -> Option<&MultiModeReliabilityModel> {
        self.lines.get(name)
    }

    pub fn switch(&self, name: &str) -> Option<&MultiModeReliabilityModel> {
        self.switches.get(name)
    }

    pub fn generator(&self, name: &str) -> Option<&MultiModeReliabilityModel> {
        self.generators.get(name)
    }

    pub fn generator_names(&self) -> impl Iterator<Item = &str> {
        self.generators.keys().map(String::as_str)
    }

    pub fn component_count(&self) -> usize {
        self.lines.len() + self.switches.len() + self.generators.len()
    }

    /// Every component with its kind, in event order.
    pub fn models(&self) -> impl Iterator<Item = (ElementKind, &str, &MultiModeReliabilityModel)> {
        tagged(ElementKind::Line, &self.lines)
            .chain(tagged(ElementKind::Switch, &self.switches))
            .chain(tagged(ElementKind::Generator, &self.generators))
    }

    /// Names of the components that are currently failed or have failures queued.
    pub fn failed_elements(&self) -> Vec<String> {
        self.models()
            .filter(|(_, _, model)| model.is_failed())
            .map(|(kind, name, _)| kind.qualify(name))
            .collect()
    }
}

fn tagged(
    kind: ElementKind,
    models: &ComponentModels,
) -> impl Iterator<Item = (ElementKind, &str, &MultiModeReliabilityModel)> {
    models
        .iter()
        .map(move |(name, model)| (kind, name.as_str(), model))
}

fn insert_unique(
    models: &mut ComponentModels,
    kind: ElementKind,
    name: &str,
    modes: Vec<FailureMode>,
) -> Result<()> {
    let element = kind.qualify(name);
    if models.contains_key(name) {
        return Err(ReliabilityError::Topology(format!("duplicate element {element}")));
    }
    models.insert(name.to_owned(), MultiModeReliabilityModel::new(element, modes));
    Ok(())
}

fn drain_events(
    kind: ElementKind,
    models: &mut ComponentModels,
    rng: &mut StdRng,
    events: &mut Vec<Event>,
) {
    for (name, model) in models.iter_mut() {
        let event = match model.next_event(rng) {
            Some(ComponentEvent::Fail(failure)) => Event::from_failure(&failure, kind.qualify(name)),
            Some(ComponentEvent::Restore(repair)) => {
                Event::from_repair(&repair, kind.qualify(name))
            }
            None => continue,
        };
        info!(
            element = %event.element,
            kind = %event.kind,
            mode = %event.mode,
            time = model.time(),
            "reliability event"
        );
        events.push(event);
    }
}
