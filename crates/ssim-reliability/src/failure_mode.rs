//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Stochastic failure modes sampled in wall-clock or operating time."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! Single-cause failure processes.
//!
//! A [`FailureMode`] holds the time of its next failure and a pre-sampled
//! [`Failure`] describing what happens when it fires. Both are drawn together
//! whenever the mode is reset, so the repair duration and connection states of a
//! failure are fixed the moment it is scheduled.

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::Exp;
use ssim_common::config::FailureModeConfig;

use crate::errors::{ReliabilityError, Result};
use crate::event::{Failure, Mode, Repair};

/// Clock values pushed into a model on every simulation tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Wall time in seconds.
    pub time: f64,
    /// Cumulative operating time in seconds, for components that report it.
    pub operating_time: Option<f64>,
}

impl Tick {
    pub fn wall(time: f64) -> Self {
        Self {
            time,
            operating_time: None,
        }
    }

    pub fn operating(time: f64, operating_time: f64) -> Self {
        Self {
            time,
            operating_time: Some(operating_time),
        }
    }
}

/// Probability split used to pick a switch's connection state on failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateProbabilities {
    pub p_open: f64,
    pub p_closed: f64,
    pub p_current: f64,
}

impl StateProbabilities {
    /// Map a uniform draw in `[0, 1)` onto a connection state.
    pub fn choose(&self, p: f64) -> Mode {
        if p < self.p_open {
            Mode::Open
        } else if p < self.p_open + self.p_closed {
            Mode::Closed
        } else {
            Mode::Current
        }
    }
}

/// Source of the connection state attached to a failure or repair.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionSampler {
    Fixed(Mode),
    Weighted(StateProbabilities),
}

impl ConnectionSampler {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Mode {
        match self {
            ConnectionSampler::Fixed(mode) => *mode,
            ConnectionSampler::Weighted(probabilities) => probabilities.choose(rng.gen::<f64>()),
        }
    }
}

/// Exponential time-to-failure and uniform repair duration, both in seconds.
#[derive(Debug, Clone)]
pub struct FailureDistribution {
    mtbf: f64,
    min_repair: f64,
    max_repair: f64,
    time_to_failure: Exp<f64>,
    repair_duration: Uniform<f64>,
    failure_state: ConnectionSampler,
    repair_state: ConnectionSampler,
}

impl FailureDistribution {
    /// Failures open the component and repairs close it unless overridden.
    pub fn new(mtbf: f64, min_repair: f64, max_repair: f64) -> Result<Self> {
        if !mtbf.is_finite() || mtbf <= 0.0 {
            return Err(ReliabilityError::invalid(
                "mtbf",
                format!("must be positive, got {mtbf}"),
            ));
        }
        if !min_repair.is_finite() || min_repair < 0.0 {
            return Err(ReliabilityError::invalid(
                "min_repair",
                format!("must be non-negative, got {min_repair}"),
            ));
        }
        if !max_repair.is_finite() || max_repair < min_repair {
            return Err(ReliabilityError::invalid(
                "max_repair",
                format!("must be at least min_repair ({min_repair}), got {max_repair}"),
            ));
        }
        let time_to_failure = Exp::new(1.0 / mtbf)
            .map_err(|err| ReliabilityError::invalid("mtbf", err.to_string()))?;
        Ok(Self {
            mtbf,
            min_repair,
            max_repair,
            time_to_failure,
            repair_duration: Uniform::new_inclusive(min_repair, max_repair),
            failure_state: ConnectionSampler::Fixed(Mode::Open),
            repair_state: ConnectionSampler::Fixed(Mode::Closed),
        })
    }

    /// Build from a configuration section given in hours.
    pub fn from_config(config: &FailureModeConfig) -> Result<Self> {
        Self::new(
            config.mtbf_seconds(),
            config.min_repair_seconds(),
            config.max_repair_seconds(),
        )
    }

    pub fn with_failure_state(mut self, sampler: ConnectionSampler) -> Self {
        self.failure_state = sampler;
        self
    }

    pub fn with_repair_state(mut self, sampler: ConnectionSampler) -> Self {
        self.repair_state = sampler;
        self
    }

    pub fn mtbf(&self) -> f64 {
        self.mtbf
    }

    pub fn repair_bounds(&self) -> (f64, f64) {
        (self.min_repair, self.max_repair)
    }

    fn sample_time_to_failure<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.time_to_failure.sample(rng)
    }

    fn sample_failure<R: Rng + ?Sized>(&self, rng: &mut R) -> Failure {
        let repair_time = self.repair_duration.sample(rng);
        let connection = self.failure_state.sample(rng);
        let repair = Repair::new(self.repair_state.sample(rng));
        Failure::new(connection, repair_time, repair)
    }
}

/// Wall-clock aging: fails an exponentially distributed time after the last reset.
#[derive(Debug, Clone)]
pub struct AgingFailure {
    distribution: FailureDistribution,
    time: f64,
    failure_time: f64,
    failure: Failure,
}

impl AgingFailure {
    pub fn new<R: Rng + ?Sized>(distribution: FailureDistribution, rng: &mut R) -> Self {
        let failure_time = distribution.sample_time_to_failure(rng);
        let failure = distribution.sample_failure(rng);
        Self {
            distribution,
            time: 0.0,
            failure_time,
            failure,
        }
    }

    /// A mode whose first failure is already decided.
    pub fn scheduled(
        distribution: FailureDistribution,
        failure_time: f64,
        failure: Failure,
    ) -> Self {
        Self {
            distribution,
            time: 0.0,
            failure_time,
            failure,
        }
    }

    /// Schedule the next failure relative to the current wall time.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.failure_time = self.time + self.distribution.sample_time_to_failure(rng);
        self.failure = self.distribution.sample_failure(rng);
    }

    pub fn update(&mut self, time: f64) {
        self.time = time;
    }

    pub fn failure(&self) -> Option<&Failure> {
        (self.time >= self.failure_time).then_some(&self.failure)
    }

    pub fn next_update(&self) -> f64 {
        self.failure_time
    }

    pub fn failure_time(&self) -> f64 {
        self.failure_time
    }
}

/// Wear-out measured in cumulative operating time rather than wall time.
#[derive(Debug, Clone)]
pub struct OperatingWearOut {
    distribution: FailureDistribution,
    time: f64,
    operating_time: f64,
    failure_operating_time: f64,
    failure: Failure,
}

impl OperatingWearOut {
    pub fn new<R: Rng + ?Sized>(distribution: FailureDistribution, rng: &mut R) -> Self {
        let failure_operating_time = distribution.sample_time_to_failure(rng);
        let failure = distribution.sample_failure(rng);
        Self {
            distribution,
            time: 0.0,
            operating_time: 0.0,
            failure_operating_time,
            failure,
        }
    }

    /// A mode whose first failure is already decided, in operating seconds.
    pub fn scheduled(
        distribution: FailureDistribution,
        failure_operating_time: f64,
        failure: Failure,
    ) -> Self {
        Self {
            distribution,
            time: 0.0,
            operating_time: 0.0,
            failure_operating_time,
            failure,
        }
    }

    /// Schedule the next failure relative to the current operating time.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.failure_operating_time =
            self.operating_time + self.distribution.sample_time_to_failure(rng);
        self.failure = self.distribution.sample_failure(rng);
    }

    pub fn update(&mut self, time: f64, operating_time: Option<f64>) -> Result<()> {
        let operating_time = operating_time.ok_or(ReliabilityError::MissingOperatingTime)?;
        self.time = time;
        self.operating_time = operating_time;
        Ok(())
    }

    pub fn failure(&self) -> Option<&Failure> {
        (self.operating_time >= self.failure_operating_time).then_some(&self.failure)
    }

    /// Earliest wall time the failure could occur, assuming the component
    /// operates continuously from now on.
    pub fn next_update(&self) -> f64 {
        self.time + (self.failure_operating_time - self.operating_time).max(0.0)
    }

    pub fn failure_operating_time(&self) -> f64 {
        self.failure_operating_time
    }
}

/// One independent cause of failure for a component.
#[derive(Debug, Clone)]
pub enum FailureMode {
    Aging(AgingFailure),
    OperatingWearOut(OperatingWearOut),
}

impl FailureMode {
    pub fn aging<R: Rng + ?Sized>(distribution: FailureDistribution, rng: &mut R) -> Self {
        FailureMode::Aging(AgingFailure::new(distribution, rng))
    }

    pub fn operating_wear_out<R: Rng + ?Sized>(
        distribution: FailureDistribution,
        rng: &mut R,
    ) -> Self {
        FailureMode::OperatingWearOut(OperatingWearOut::new(distribution, rng))
    }

    pub fn label(&self) -> &'static str {
        match self {
            FailureMode::Aging(_) => "aging",
            FailureMode::OperatingWearOut(_) => "operating_wear_out",
        }
    }

    /// Fail if `tick` lacks a clock this mode needs, without touching state.
    pub fn check(&self, tick: &Tick) -> Result<()> {
        match self {
            FailureMode::OperatingWearOut(_) if tick.operating_time.is_none() => {
                Err(ReliabilityError::MissingOperatingTime)
            }
            _ => Ok(()),
        }
    }

    pub fn update(&mut self, tick: &Tick) -> Result<()> {
        match self {
            FailureMode::Aging(mode) => {
                mode.update(tick.time);
                Ok(())
            }
            FailureMode::OperatingWearOut(mode) => mode.update(tick.time, tick.operating_time),
        }
    }

    /// Move the mode's clock to `tick` without checking for a usage error.
    ///
    /// Used when a suppressed mode is reinstated, so its next failure is
    /// scheduled from the present rather than from when it was frozen.
    pub fn resume_at(&mut self, tick: &Tick) {
        match self {
            FailureMode::Aging(mode) => mode.update(tick.time),
            FailureMode::OperatingWearOut(mode) => {
                mode.time = tick.time;
                if let Some(operating_time) = tick.operating_time {
                    mode.operating_time = operating_time;
                }
            }
        }
    }

    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        match self {
            FailureMode::Aging(mode) => mode.reset(rng),
            FailureMode::OperatingWearOut(mode) => mode.reset(rng),
        }
    }

    /// The pending failure, once the mode's clock has reached its failure time.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            FailureMode::Aging(mode) => mode.failure(),
            FailureMode::OperatingWearOut(mode) => mode.failure(),
        }
    }

    pub fn next_update(&self) -> f64 {
        match self {
            FailureMode::Aging(mode) => mode.next_update(),
            FailureMode::OperatingWearOut(mode) => mode.next_update(),
        }
    }
}
