//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Per-component arbitration between competing failure modes."
//! ems_version: "v0.1.0"
//! ems_owner: "tbd"
//! ---
//! A component with several independent failure causes.
//!
//! Only one failure is active on a component at a time. Modes that trigger
//! while another failure is active or queued are deferred: their clocks stop
//! and their failures wait in a FIFO queue until the component is repaired.
//! A mode is reset and made live again when the failure it raised is repaired.

use std::collections::VecDeque;

use rand::Rng;
use tracing::debug;

use crate::errors::Result;
use crate::event::{Failure, Repair};
use crate::failure_mode::{FailureMode, Tick};

/// Whether a failure mode may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeStatus {
    Live,
    /// Triggered; frozen until its failure is repaired.
    Deferred,
}

#[derive(Debug, Clone)]
struct ModeSlot {
    mode: FailureMode,
    status: ModeStatus,
}

/// A triggered failure that has not yet become active.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingFailure {
    pub failure: Failure,
    /// Index of the mode that raised the failure.
    pub mode: usize,
    pub detected_at: f64,
}

/// First-in first-out queue of triggered failures.
#[derive(Debug, Clone, Default)]
pub struct FailureQueue {
    entries: VecDeque<PendingFailure>,
}

impl FailureQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, pending: PendingFailure) {
        self.entries.push_back(pending);
    }

    /// Remove the oldest entry.
    pub fn dequeue(&mut self) -> Option<PendingFailure> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&PendingFailure> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &PendingFailure> {
        self.entries.iter()
    }
}

/// The failure currently in effect on a component.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveFailure {
    pub failure: Failure,
    pub mode: usize,
    pub activated_at: f64,
    /// Single source of truth for when the repair finishes.
    pub repair_completes_at: f64,
}

/// Outcome of [`MultiModeReliabilityModel::next_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentEvent {
    Fail(Failure),
    Restore(Repair),
}

#[derive(Debug, Clone)]
pub struct MultiModeReliabilityModel {
    label: String,
    time: f64,
    last_tick: Option<Tick>,
    modes: Vec<ModeSlot>,
    pending: FailureQueue,
    active: Option<ActiveFailure>,
}

impl MultiModeReliabilityModel {
    /// Build a model from its failure modes; `label` only tags log output.
    pub fn new(label: impl Into<String>, modes: Vec<FailureMode>) -> Self {
        Self {
            label: label.into(),
            time: 0.0,
            last_tick: None,
            modes: modes
                .into_iter()
                .map(|mode| ModeSlot {
                    mode,
                    status: ModeStatus::Live,
                })
                .collect(),
            pending: FailureQueue::new(),
            active: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Advance every live mode and queue the failures that trigger.
    ///
    /// Deferred modes are not updated. A tick missing a clock that a live
    /// mode needs is rejected before any state changes.
    pub fn update(&mut self, tick: &Tick) -> Result<()> {
        for slot in &self.modes {
            if slot.status == ModeStatus::Live {
                slot.mode.check(tick)?;
            }
        }
        self.time = tick.time;
        self.last_tick = Some(*tick);
        for (index, slot) in self.modes.iter_mut().enumerate() {
            if slot.status == ModeStatus::Deferred {
                continue;
            }
            slot.mode.update(tick)?;
            if let Some(failure) = slot.mode.failure() {
                debug!(
                    component = %self.label,
                    mode = slot.mode.label(),
                    time = tick.time,
                    repair_time = failure.repair_time,
                    "failure mode triggered"
                );
                self.pending.enqueue(PendingFailure {
                    failure: failure.clone(),
                    mode: index,
                    detected_at: tick.time,
                });
                slot.status = ModeStatus::Deferred;
            }
        }
        Ok(())
    }

    /// Produce at most one event for the current time.
    ///
    /// With no active failure the oldest queued failure is activated. With an
    /// active failure whose repair has completed, the failure is cleared and
    /// the mode that raised it is reset and made live again.
    pub fn next_event<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<ComponentEvent> {
        let Some(active) = &self.active else {
            return self.activate_pending().map(ComponentEvent::Fail);
        };
        if self.time < active.repair_completes_at {
            return None;
        }
        let active = self.active.take()?;
        let slot = &mut self.modes[active.mode];
        if let Some(tick) = &self.last_tick {
            slot.mode.resume_at(tick);
        }
        slot.mode.reset(rng);
        slot.status = ModeStatus::Live;
        debug!(
            component = %self.label,
            mode = slot.mode.label(),
            time = self.time,
            next_failure = slot.mode.next_update(),
            "repair completed"
        );
        Some(ComponentEvent::Restore(active.failure.repair))
    }

    fn activate_pending(&mut self) -> Option<Failure> {
        let pending = self.pending.dequeue()?;
        let repair_completes_at = self.time + pending.failure.repair_time;
        debug!(
            component = %self.label,
            mode = self.modes[pending.mode].mode.label(),
            time = self.time,
            repair_completes_at,
            "failure activated"
        );
        let failure = pending.failure.clone();
        self.active = Some(ActiveFailure {
            failure: pending.failure,
            mode: pending.mode,
            activated_at: self.time,
            repair_completes_at,
        });
        Some(failure)
    }

    /// Earliest time this model must be revisited.
    ///
    /// Covers live modes, the active repair, and queued failures. Queued
    /// failures are due now when nothing is active and otherwise wait for
    /// the active repair.
    ///
    /// Deferred modes are excluded: their frozen failure time is already in
    /// the past and would pin the result there for the whole outage. They
    /// count again through the queue term, and after repair as live modes.
    pub fn next_update(&self) -> f64 {
        let live = self
            .modes
            .iter()
            .filter(|slot| slot.status == ModeStatus::Live)
            .map(|slot| slot.mode.next_update())
            .fold(f64::INFINITY, f64::min);
        match &self.active {
            Some(active) => live.min(active.repair_completes_at),
            None if !self.pending.is_empty() => live.min(self.time),
            None => live,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.active.is_some() || !self.pending.is_empty()
    }

    pub fn active_failure(&self) -> Option<&ActiveFailure> {
        self.active.as_ref()
    }

    pub fn pending(&self) -> &FailureQueue {
        &self.pending
    }

    pub fn mode_count(&self) -> usize {
        self.modes.len()
    }

    pub fn mode(&self, index: usize) -> Option<&FailureMode> {
        self.modes.get(index).map(|slot| &slot.mode)
    }

    pub fn mode_status(&self, index: usize) -> Option<ModeStatus> {
        self.modes.get(index).map(|slot| slot.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Mode;
    use crate::errors::ReliabilityError;
    use crate::failure_mode::{AgingFailure, FailureDistribution, OperatingWearOut};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn scheduled(failure_time: f64, connection: Mode, repair_time: f64) -> FailureMode {
        // Huge MTBF so reinstated modes never fire again within a test.
        let distribution = FailureDistribution::new(1e15, 1.0, 2.0).unwrap();
        let failure = Failure::new(connection, repair_time, Repair::new(connection));
        FailureMode::Aging(AgingFailure::scheduled(
            distribution,
            failure_time,
            failure,
        ))
    }

    fn run(
        model: &mut MultiModeReliabilityModel,
        rng: &mut StdRng,
        until: u32,
    ) -> Vec<(f64, ComponentEvent)> {
        let mut events = Vec::new();
        for second in 0..=until {
            let time = f64::from(second);
            model.update(&Tick::wall(time)).unwrap();
            if let Some(event) = model.next_event(rng) {
                events.push((time, event));
            }
        }
        events
    }

    #[test]
    fn single_mode_fails_then_restores() {
        let mut rng = StdRng::seed_from_u64(42);
        let distribution = FailureDistribution::new(3600.0, 60.0, 120.0).unwrap();
        let mode = FailureMode::aging(distribution, &mut rng);
        let failure_time = mode.next_update();
        let mut model = MultiModeReliabilityModel::new("line.a", vec![mode]);

        let mut fail_at = None;
        let mut restore_at = None;
        let mut repair_time = 0.0;
        let mut second = 0u32;
        while restore_at.is_none() {
            let time = f64::from(second);
            model.update(&Tick::wall(time)).unwrap();
            match model.next_event(&mut rng) {
                Some(ComponentEvent::Fail(failure)) => {
                    assert!(fail_at.is_none(), "second failure before restoration");
                    fail_at = Some(time);
                    repair_time = failure.repair_time;
                    assert!(model.is_failed());
                }
                Some(ComponentEvent::Restore(repair)) => {
                    assert_eq!(repair.connection, Mode::Closed);
                    restore_at = Some(time);
                }
                None => {}
            }
            second += 1;
        }

        let fail_at = fail_at.unwrap();
        assert!(fail_at >= failure_time && fail_at < failure_time + 1.0);
        assert!((60.0..=120.0).contains(&repair_time));
        let restore_at = restore_at.unwrap();
        assert!(restore_at >= fail_at + repair_time && restore_at < fail_at + repair_time + 1.0);
        assert!(!model.is_failed());
        assert_eq!(model.mode_status(0), Some(ModeStatus::Live));
        assert!(model.next_update() >= restore_at);
    }

    #[test]
    fn queued_failures_are_applied_in_detection_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = MultiModeReliabilityModel::new(
            "generator.g1",
            vec![
                scheduled(20.0, Mode::Current, 5.0),
                scheduled(1.0, Mode::Open, 100.0),
                scheduled(10.0, Mode::Closed, 5.0),
            ],
        );

        let events = run(&mut model, &mut rng, 150);
        let summary: Vec<(f64, &str, Mode)> = events
            .iter()
            .map(|(time, event)| match event {
                ComponentEvent::Fail(failure) => (*time, "fail", failure.connection),
                ComponentEvent::Restore(repair) => (*time, "restore", repair.connection),
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                (1.0, "fail", Mode::Open),
                (101.0, "restore", Mode::Open),
                (102.0, "fail", Mode::Closed),
                (107.0, "restore", Mode::Closed),
                (108.0, "fail", Mode::Current),
                (113.0, "restore", Mode::Current),
            ]
        );
        assert!(!model.is_failed());
    }

    #[test]
    fn deferred_modes_are_frozen_while_a_failure_is_active() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = MultiModeReliabilityModel::new(
            "line.b",
            vec![
                scheduled(1.0, Mode::Open, 100.0),
                scheduled(10.0, Mode::Open, 5.0),
                scheduled(20.0, Mode::Open, 5.0),
            ],
        );

        run(&mut model, &mut rng, 5);
        assert_eq!(model.active_failure().map(|a| a.mode), Some(0));
        assert_eq!(model.active_failure().map(|a| a.repair_completes_at), Some(101.0));
        // Live modes still bound the next revisit.
        assert_eq!(model.next_update(), 10.0);

        for second in 6..=30 {
            model.update(&Tick::wall(f64::from(second))).unwrap();
            assert!(model.next_event(&mut rng).is_none());
        }
        assert_eq!(model.pending().len(), 2);
        let queued: Vec<usize> = model.pending().iter().map(|p| p.mode).collect();
        assert_eq!(queued, vec![1, 2]);
        assert_eq!(model.mode_status(1), Some(ModeStatus::Deferred));
        assert_eq!(model.mode_status(2), Some(ModeStatus::Deferred));
        assert_eq!(model.next_update(), 101.0);

        model.update(&Tick::wall(101.0)).unwrap();
        assert!(matches!(
            model.next_event(&mut rng),
            Some(ComponentEvent::Restore(_))
        ));
        assert_eq!(model.mode_status(0), Some(ModeStatus::Live));
        assert!(model.is_failed(), "queued failures keep the component failed");
        assert_eq!(model.next_update(), 101.0);
    }

    fn wear_out(failure_operating_time: f64, repair_time: f64) -> FailureMode {
        let distribution = FailureDistribution::new(1e15, 1.0, 2.0).unwrap();
        let failure = Failure::new(Mode::Open, repair_time, Repair::new(Mode::Closed));
        FailureMode::OperatingWearOut(OperatingWearOut::scheduled(
            distribution,
            failure_operating_time,
            failure,
        ))
    }

    #[test]
    fn repaired_wear_out_schedules_from_present_operating_time() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut model = MultiModeReliabilityModel::new(
            "generator.g1",
            vec![scheduled(1e12, Mode::Open, 1.0), wear_out(6.0, 5.0)],
        );

        let mut fail_at = None;
        let mut restore_at = None;
        for second in 0..=20u32 {
            let time = f64::from(second);
            // Operating time keeps running through the outage.
            model.update(&Tick::operating(time, time)).unwrap();
            match model.next_event(&mut rng) {
                Some(ComponentEvent::Fail(_)) => fail_at = Some(time),
                Some(ComponentEvent::Restore(_)) => {
                    restore_at = Some(time);
                    break;
                }
                None => {}
            }
        }
        assert_eq!(fail_at, Some(6.0));
        assert_eq!(restore_at, Some(11.0));
        assert_eq!(model.mode_status(1), Some(ModeStatus::Live));

        let Some(FailureMode::OperatingWearOut(mode)) = model.mode(1) else {
            panic!("expected a wear-out mode");
        };
        // Rescheduled from the operating time at restore, not the frozen one.
        let budget = mode.failure_operating_time() - 11.0;
        assert!(budget > 0.0);
        assert!(model.next_update() >= 11.0);
        assert_eq!(mode.next_update(), 11.0 + budget);
    }

    #[test]
    fn same_tick_triggers_queue_aging_before_wear_out() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut model = MultiModeReliabilityModel::new(
            "generator.g2",
            vec![scheduled(5.0, Mode::Current, 2.0), wear_out(5.0, 2.0)],
        );

        let mut fails = Vec::new();
        for second in 0..=20u32 {
            let time = f64::from(second);
            model.update(&Tick::operating(time, time)).unwrap();
            if let Some(ComponentEvent::Fail(failure)) = model.next_event(&mut rng) {
                fails.push((time, failure.connection));
            }
        }
        assert_eq!(fails, vec![(5.0, Mode::Current), (8.0, Mode::Open)]);
    }

    #[test]
    fn missing_operating_time_leaves_model_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut model = MultiModeReliabilityModel::new(
            "generator.g3",
            vec![scheduled(2.0, Mode::Open, 1.0), wear_out(50.0, 1.0)],
        );
        model.update(&Tick::operating(1.0, 1.0)).unwrap();

        let err = model.update(&Tick::wall(3.0)).unwrap_err();
        assert!(matches!(err, ReliabilityError::MissingOperatingTime));
        assert_eq!(model.time(), 1.0);
        assert!(model.pending().is_empty());
        assert!(model.next_event(&mut rng).is_none());
    }

    #[test]
    fn idle_model_reports_earliest_live_mode() {
        let model = MultiModeReliabilityModel::new(
            "line.c",
            vec![
                scheduled(50.0, Mode::Open, 1.0),
                scheduled(30.0, Mode::Open, 1.0),
            ],
        );
        assert_eq!(model.next_update(), 30.0);
        assert!(!model.is_failed());
        assert_eq!(model.mode_count(), 2);

        let empty = MultiModeReliabilityModel::new("line.d", Vec::new());
        assert_eq!(empty.next_update(), f64::INFINITY);
    }

    #[test]
    fn fifo_queue_dequeues_oldest_first() {
        let mut queue = FailureQueue::new();
        for mode in 0..3 {
            queue.enqueue(PendingFailure {
                failure: Failure::new(Mode::Open, 1.0, Repair::new(Mode::Closed)),
                mode,
                detected_at: mode as f64,
            });
        }
        assert_eq!(queue.peek().map(|p| p.mode), Some(0));
        let order: Vec<usize> = std::iter::from_fn(|| queue.dequeue()).map(|p| p.mode).collect();
        assert_eq!(order, vec![0, 1, 2]);
        assert!(queue.is_empty());
    }
}
