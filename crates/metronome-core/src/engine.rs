use std::time::Duration;

use metronome_clock::{ClockAdapter, Errno, Latch, alarm_seconds};
use tracing::{debug, trace};

use crate::{TimingError, validate};

const MICROS_PER_SEC: u64 = 1_000_000;

/// Result of a single timed wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    /// The whole duration elapsed
    Completed,
    /// A signal arrived first; `residual` is the time that was not slept
    Interrupted { residual: Duration, os_error: Errno },
}

impl SleepOutcome {
    /// Unslept time, zero for a completed wait
    pub fn residual(&self) -> Duration {
        match self {
            SleepOutcome::Completed => Duration::ZERO,
            SleepOutcome::Interrupted { residual, .. } => *residual,
        }
    }

    /// Turn an early wake into [`TimingError::SleepInterrupted`]
    pub fn into_result(self) -> Result<(), TimingError> {
        match self {
            SleepOutcome::Completed => Ok(()),
            SleepOutcome::Interrupted { residual, os_error } => {
                Err(TimingError::SleepInterrupted { residual, os_error })
            }
        }
    }
}

/// Timed waits and alarm scheduling over a [`ClockAdapter`]
///
/// The alarm slot belongs to the process, not to this value: two `TimedWait`s over
/// the real clock still share (and replace) the same pending alarm.
#[derive(Debug)]
pub struct TimedWait<C> {
    clock: C,
}

impl<C: ClockAdapter> TimedWait<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn into_inner(self) -> C {
        self.clock
    }

    /// Sleep for `secs` fractional seconds.
    ///
    /// An early wake is an error, [`TimingError::SleepInterrupted`], carrying the
    /// unslept time so the caller can resume.
    pub fn sleep(&mut self, secs: f64) -> Result<(), TimingError> {
        let duration = validate::seconds("sleep duration", secs)?;
        self.sleep_duration(duration)
    }

    pub fn sleep_duration(&mut self, duration: Duration) -> Result<(), TimingError> {
        self.wait(duration)?.into_result()
    }

    /// Sleep and report the outcome as a value instead of an error.
    ///
    /// A zero duration completes without touching the clock.
    pub fn wait(&mut self, duration: Duration) -> Result<SleepOutcome, TimingError> {
        let duration = validate::duration("sleep duration", duration)?;
        if duration.is_zero() {
            return Ok(SleepOutcome::Completed);
        }

        debug!(
            target: "metronome",
            secs = duration.as_secs(),
            nanos = duration.subsec_nanos(),
            "sleeping"
        );
        let report = self.clock.sleep_for(duration)?;
        if report.completed {
            return Ok(SleepOutcome::Completed);
        }

        let residual = report.residual.min(duration);
        let os_error = report.os_error.unwrap_or(Errno::EINTR);
        debug!(target: "metronome", ?residual, %os_error, "sleep woke early");
        Ok(SleepOutcome::Interrupted { residual, os_error })
    }

    /// Arm a one-shot alarm `delay_secs` from now, replacing any pending one.
    ///
    /// Returns the whole seconds that were left on the replaced alarm (0 if none).
    /// A delay of 0 cancels the pending alarm.
    pub fn schedule_alarm(&mut self, delay_secs: i64) -> Result<u32, TimingError> {
        let delay = validate::whole_seconds("alarm delay", delay_secs)?;
        let previous = self.clock.set_alarm(delay)?;
        trace!(target: "metronome", delay, previous, "alarm scheduled");
        Ok(previous)
    }

    /// Arm a microsecond alarm that fires after `initial_micros` and then every
    /// `repeat_micros`, replacing any pending one.
    ///
    /// Returns the microseconds that were left on the replaced alarm (0 if none).
    pub fn schedule_micro_alarm(
        &mut self,
        initial_micros: i64,
        repeat_micros: i64,
    ) -> Result<u64, TimingError> {
        let initial = validate::micros("initial alarm delay", initial_micros)?;
        let repeat = validate::micros("alarm repeat interval", repeat_micros)?;
        let previous = self.clock.set_interval_alarm(initial, repeat)?;
        trace!(target: "metronome", initial, repeat, previous, "interval alarm scheduled");
        Ok(previous)
    }

    /// Whole-second form of [`TimedWait::schedule_micro_alarm`].
    ///
    /// The replaced alarm's remaining time is reported in whole seconds the way
    /// alarm(2) reports it, see [`alarm_seconds`].
    pub fn schedule_repeating_alarm(
        &mut self,
        initial_secs: i64,
        repeat_secs: i64,
    ) -> Result<u32, TimingError> {
        let initial = validate::whole_seconds("initial alarm delay", initial_secs)?;
        let repeat = validate::whole_seconds("alarm repeat interval", repeat_secs)?;
        let previous = self.clock.set_interval_alarm(
            u64::from(initial) * MICROS_PER_SEC,
            u64::from(repeat) * MICROS_PER_SEC,
        )?;
        Ok(alarm_seconds(Duration::from_micros(previous)))
    }

    /// Disarm whatever alarm is pending, returning its remaining microseconds.
    pub fn cancel_alarm(&mut self) -> Result<u64, TimingError> {
        Ok(self.clock.set_interval_alarm(0, 0)?)
    }

    /// Block until any signal is delivered.
    pub fn wait_for_signal(&mut self) -> Result<(), TimingError> {
        trace!(target: "metronome", "waiting for signal");
        Ok(self.clock.block_until_signal()?)
    }

    /// Block until `latch` has counted at least one delivery, then take the count.
    pub fn wait_for_latch(&mut self, latch: &dyn Latch) -> Result<usize, TimingError> {
        Ok(self.clock.wait_for_latch(latch)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metronome_clock::{ClockCall, FakeClock};

    fn engine() -> (TimedWait<FakeClock>, FakeClock) {
        let clock = FakeClock::new();
        (TimedWait::new(clock.clone()), clock)
    }

    #[test]
    fn test_zero_sleep_completes_without_clock_call() {
        let (mut engine, clock) = engine();
        assert!(engine.sleep(0.0).is_ok());
        assert_eq!(engine.wait(Duration::ZERO).unwrap(), SleepOutcome::Completed);
        assert!(clock.calls().is_empty());
    }

    #[test]
    fn test_full_sleep_advances_time() {
        let (mut engine, clock) = engine();
        engine.sleep(1.5).unwrap();
        assert_eq!(clock.now(), Duration::from_millis(1500));
        assert_eq!(
            clock.calls(),
            vec![ClockCall::SleepFor(Duration::from_millis(1500))]
        );
    }

    #[test]
    fn test_negative_values_never_reach_the_clock() {
        let (mut engine, clock) = engine();
        assert!(matches!(
            engine.sleep(-1.0),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            engine.schedule_alarm(-1),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            engine.schedule_micro_alarm(-1, 10),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            engine.schedule_micro_alarm(10, -1),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            engine.schedule_repeating_alarm(1, -1),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(clock.calls().is_empty());
        assert_eq!(clock.pending_alarm(), None);
    }

    #[test]
    fn test_sleep_longer_than_time_t_never_reaches_the_clock() {
        let (mut engine, clock) = engine();
        assert!(matches!(
            engine.sleep(1e19),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(matches!(
            engine.sleep_duration(Duration::from_secs(u64::MAX)),
            Err(TimingError::InvalidArgument { .. })
        ));
        assert!(clock.calls().is_empty());
    }

    #[test]
    fn test_alarm_interrupts_sleep_with_remaining_time() {
        let (mut engine, clock) = engine();
        assert_eq!(engine.schedule_alarm(2).unwrap(), 0);

        let err = engine.sleep(5.0).unwrap_err();
        match err {
            TimingError::SleepInterrupted { residual, os_error } => {
                assert_eq!(residual, Duration::from_secs(3));
                assert_eq!(os_error, Errno::EINTR);
            }
            other => panic!("expected interruption, got {other:?}"),
        }
        assert_eq!(clock.now(), Duration::from_secs(2));
    }

    #[test]
    fn test_external_signal_interrupts_sleep() {
        let (mut engine, clock) = engine();
        clock.inject_signal_after(Duration::from_millis(100));

        let outcome = engine.wait(Duration::from_millis(400)).unwrap();
        assert_eq!(outcome.residual(), Duration::from_millis(300));
        assert!(outcome.into_result().unwrap_err().is_interrupted());
    }

    #[test]
    fn test_alarm_replace_returns_previous_remaining() {
        let (mut engine, clock) = engine();
        engine.schedule_alarm(5).unwrap();
        clock.advance(Duration::from_secs(1));

        let previous = engine.schedule_alarm(8).unwrap();
        assert!(previous <= 5);
        assert_eq!(previous, 4);
        assert_eq!(clock.pending_alarm(), Some(Duration::from_secs(8)));
    }

    #[test]
    fn test_micro_alarm_replace_returns_previous_micros() {
        let (mut engine, clock) = engine();
        engine.schedule_micro_alarm(750_000, 250_000).unwrap();
        clock.advance(Duration::from_millis(500));

        assert_eq!(engine.schedule_micro_alarm(0, 0).unwrap(), 250_000);
        assert_eq!(clock.pending_alarm(), None);
    }

    #[test]
    fn test_repeating_alarm_reports_previous_to_nearest_second() {
        let (mut engine, clock) = engine();
        engine.schedule_repeating_alarm(3, 1).unwrap();
        clock.advance(Duration::from_millis(1200));
        assert_eq!(engine.schedule_repeating_alarm(10, 0).unwrap(), 2);

        clock.advance(Duration::from_millis(8700));
        assert_eq!(engine.schedule_repeating_alarm(5, 0).unwrap(), 1);
        assert_eq!(engine.cancel_alarm().unwrap(), 5_000_000);
    }

    #[test]
    fn test_wait_for_signal_returns_on_alarm() {
        let (mut engine, clock) = engine();
        engine.schedule_alarm(1).unwrap();
        engine.wait_for_signal().unwrap();
        assert_eq!(clock.now(), Duration::from_secs(1));
        assert_eq!(clock.pending_alarm(), None);
    }
}
