//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Tick driver advancing a grid reliability model over a horizon."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{ReliabilityError, Result};
use crate::event::{Event, EventType};
use crate::grid::{GeneratorStatus, GridReliabilityModel};

/// An event together with the simulation time it was emitted at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedEvent {
    pub time: f64,
    #[serde(flatten)]
    pub event: Event,
}

/// Totals reported at the end of [`ReliabilityRunner::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub failures: u64,
    pub restorations: u64,
    /// Time of the last tick, if any ran.
    pub end_time: Option<f64>,
}

/// Drives a [`GridReliabilityModel`] tick by tick.
///
/// Each tick calls `update` for every model and then drains `events`. The next
/// tick is at the model's `peek()` time, but never sooner than `resolution`
/// seconds after the previous tick.
#[derive(Debug)]
pub struct ReliabilityRunner {
    model: GridReliabilityModel,
    resolution: f64,
    time: Option<f64>,
}

impl ReliabilityRunner {
    pub fn new(model: GridReliabilityModel, resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(ReliabilityError::invalid(
                "resolution",
                format!("must be a positive number of seconds, got {resolution}"),
            ));
        }
        Ok(Self {
            model,
            resolution,
            time: None,
        })
    }

    pub fn model(&self) -> &GridReliabilityModel {
        &self.model
    }

    pub fn into_model(self) -> GridReliabilityModel {
        self.model
    }

    /// Time of the last tick.
    pub fn time(&self) -> Option<f64> {
        self.time
    }

    /// Time of the next tick; the first tick is at zero.
    pub fn next_time(&self) -> f64 {
        match self.time {
            None => 0.0,
            Some(now) => self.model.peek().max(now + self.resolution),
        }
    }

    /// Run a single tick at `time`.
    pub fn step(&mut self, time: f64, generator_status: &[GeneratorStatus]) -> Result<Vec<Event>> {
        self.model.update(time, generator_status)?;
        self.time = Some(time);
        Ok(self.model.events())
    }

    /// Tick until the next tick would fall after `horizon`.
    ///
    /// `status` supplies the generator status records for each tick time and
    /// `sink` receives every event in emission order.
    pub fn run<S, F>(&mut self, horizon: f64, mut status: S, mut sink: F) -> Result<RunSummary>
    where
        S: FnMut(f64) -> Vec<GeneratorStatus>,
        F: FnMut(TimedEvent) -> Result<()>,
    {
        let mut summary = RunSummary::default();
        loop {
            let time = self.next_time();
            if time > horizon {
                debug!(next = time, horizon, "horizon reached");
                break;
            }
            let statuses = status(time);
            let events = self.step(time, &statuses)?;
            summary.ticks += 1;
            summary.end_time = Some(time);
            for event in events {
                match event.kind {
                    EventType::Fail => summary.failures += 1,
                    EventType::Restore => summary.restorations += 1,
                }
                sink(TimedEvent { time, event })?;
            }
        }
        info!(
            ticks = summary.ticks,
            failures = summary.failures,
            restorations = summary.restorations,
            "reliability run complete"
        );
        Ok(summary)
    }
}
