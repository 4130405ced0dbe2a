//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "01-bootstrap"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Reliability engine module exports and shared types."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Stochastic reliability of electric grid components.
//!
//! Each line, switch, and generator gets a [`MultiModeReliabilityModel`] that
//! arbitrates between independent [`FailureMode`]s. A [`GridReliabilityModel`]
//! owns them all together with the seeded RNG, and is driven once per tick:
//! `update` pushes wall and operating time in, `peek` reports when the grid
//! next needs attention, and `events` drains failures and restorations as
//! [`Event`]s for the topology layer.

pub mod errors;
pub mod event;
pub mod failure_mode;
pub mod grid;
pub mod multimode;
pub mod runner;
pub mod topology;

pub use errors::{ReliabilityError, Result};
pub use event::{ElementKind, Event, EventData, EventType, Failure, Mode, Repair};
pub use failure_mode::{
    AgingFailure, ConnectionSampler, FailureDistribution, FailureMode, OperatingWearOut,
    StateProbabilities, Tick,
};
pub use grid::{GeneratorStatus, GridReliabilityModel};
pub use multimode::{
    ActiveFailure, ComponentEvent, FailureQueue, ModeStatus, MultiModeReliabilityModel,
    PendingFailure,
};
pub use runner::{ReliabilityRunner, RunSummary, TimedEvent};
pub use topology::{GridTopology, LineElement, StaticTopology, SwitchControl};
