//! Recurring operation driven by the interval alarm
//!
//! The alarm is armed with the same initial delay and repeat interval, and every
//! delivered tick wakes the loop for one step. A tick that lands while a step is
//! still running means the step took at least its whole period.

use std::time::Duration;

use metronome_clock::{ClockAdapter, Latch};
use tracing::{debug, warn};

use crate::{TimedWait, TimingError, validate};

/// What the step callback wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tick {
    #[default]
    Continue,
    Stop,
    /// Keep going with a new period, re-arming the alarm from now
    Retime(Duration),
}

impl From<()> for Tick {
    fn from(_: ()) -> Self {
        Tick::Continue
    }
}

impl From<bool> for Tick {
    /// `true` keeps going, `false` stops
    fn from(keep_going: bool) -> Self {
        if keep_going { Tick::Continue } else { Tick::Stop }
    }
}

/// A step took longer than the period under strict timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task execution time {tet:?} exceeded the {step:?} period after {iteration} steps")]
pub struct RealTimeError {
    /// Execution time of the step that overran
    pub tet: Duration,
    pub step: Duration,
    /// Index of the step that overran
    pub iteration: u64,
}

impl RealTimeError {
    /// Execution time as a percentage of the period
    pub fn ratio(&self) -> f64 {
        self.tet.as_secs_f64() / self.step.as_secs_f64() * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OperationReport {
    pub iterations: u64,
    /// Ticks skipped because a step was still running when they arrived
    pub missed_ticks: u64,
    pub last_tet: Duration,
}

/// Runs a step callback once per period
#[derive(Debug)]
pub struct Operation<C, L> {
    engine: TimedWait<C>,
    latch: L,
    step: Duration,
    strict_timing: bool,
    tet: Duration,
    active: bool,
}

impl<C: ClockAdapter, L: Latch> Operation<C, L> {
    /// `latch` must count the signal the alarm delivers (SIGALRM on a real clock).
    pub fn new(engine: TimedWait<C>, latch: L, step_secs: f64) -> Result<Self, TimingError> {
        let step = validate::seconds("step", step_secs)?;
        validate::period("step", step)?;
        Ok(Self {
            engine,
            latch,
            step,
            strict_timing: false,
            tet: Duration::ZERO,
            active: false,
        })
    }

    /// Fail with [`RealTimeError`] instead of skipping ticks when a step overruns
    pub fn with_strict_timing(mut self, strict: bool) -> Self {
        self.strict_timing = strict;
        self
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Execution time of the most recent step
    pub fn tet(&self) -> Duration {
        self.tet
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn strict_timing(&self) -> bool {
        self.strict_timing
    }

    /// Change the period; takes effect on the next run, or immediately if running.
    pub fn set_step(&mut self, step_secs: f64) -> Result<(), TimingError> {
        let step = validate::seconds("step", step_secs)?;
        self.retime(step)
    }

    /// [`Operation::set_step`] for a period already held as a Duration
    pub fn set_period(&mut self, step: Duration) -> Result<(), TimingError> {
        self.retime(step)
    }

    fn retime(&mut self, step: Duration) -> Result<(), TimingError> {
        validate::period("step", step)?;
        self.step = step;
        if self.active {
            self.schedule()?;
        }
        Ok(())
    }

    fn schedule(&mut self) -> Result<(), TimingError> {
        let micros = validate::period("step", self.step)?;
        self.engine
            .clock_mut()
            .set_interval_alarm(micros, micros)?;
        Ok(())
    }

    /// Call `f(iteration, previous_tet)` once per period until it returns
    /// [`Tick::Stop`] or `n_iter` steps have run. The alarm is disarmed on return.
    pub fn run<F, R>(&mut self, n_iter: Option<u64>, f: F) -> Result<OperationReport, TimingError>
    where
        F: FnMut(u64, Duration) -> R,
        R: Into<Tick>,
    {
        let stale = self.latch.take();
        if stale > 0 {
            debug!(target: "metronome", stale, "discarded ticks from before start");
        }

        self.active = true;
        let result = self.schedule().and_then(|_| self.drive(n_iter, f));
        let stopped = self.stop();

        let report = result?;
        stopped?;
        debug!(target: "metronome", ?report, "operation finished");
        Ok(report)
    }

    fn drive<F, R>(&mut self, n_iter: Option<u64>, mut f: F) -> Result<OperationReport, TimingError>
    where
        F: FnMut(u64, Duration) -> R,
        R: Into<Tick>,
    {
        let mut report = OperationReport::default();

        while n_iter.map_or(true, |n| report.iterations < n) {
            let ticks = self.engine.wait_for_latch(&self.latch)?;
            if ticks > 1 {
                // Woken late rather than overrun: nothing was running
                let missed = (ticks - 1) as u64;
                debug!(target: "metronome", missed, "woke after several ticks");
                report.missed_ticks += missed;
            }

            let started = self.engine.clock().monotonic();
            let tick = f(report.iterations, self.tet).into();
            self.tet = self.engine.clock().monotonic().saturating_sub(started);
            report.last_tet = self.tet;

            // Any tick delivered while the step ran means TET reached the period
            let late = self.latch.take();
            if late > 0 {
                if self.strict_timing {
                    return Err(RealTimeError {
                        tet: self.tet,
                        step: self.step,
                        iteration: report.iterations,
                    }
                    .into());
                }
                warn!(
                    target: "metronome",
                    missed = late,
                    tet = ?self.tet,
                    step = ?self.step,
                    "step overran its period, skipping ticks"
                );
                report.missed_ticks += late as u64;
            }
            report.iterations += 1;

            match tick {
                Tick::Continue => {}
                Tick::Stop => break,
                Tick::Retime(step) => self.retime(step)?,
            }
        }

        Ok(report)
    }

    /// Disarm the alarm. Safe to call when not running.
    pub fn stop(&mut self) -> Result<(), TimingError> {
        self.active = false;
        self.engine.cancel_alarm()?;
        Ok(())
    }

    pub fn into_parts(self) -> (TimedWait<C>, L) {
        (self.engine, self.latch)
    }
}
