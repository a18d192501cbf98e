//! In-memory clock with a simulated alarm slot
//!
//! Time only moves when something sleeps, blocks or calls [`FakeClock::advance`].
//! Alarm expiry and injected external signals are "delivered" by bumping a counter
//! (see the [`Latch`] impl), exactly like the real signal handler does.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::Signal;

use crate::{ClockAdapter, ClockError, Latch, SleepReport, alarm_seconds};

/// A call the fake received, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockCall {
    SetAlarm(u32),
    SetIntervalAlarm(u64, u64),
    BlockUntilSignal,
    SleepFor(Duration),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    expires_at: Duration,
    interval: Duration,
}

#[derive(Debug, Default)]
struct FakeState {
    now: Duration,
    slot: Option<Slot>,
    /// Absolute times of external signals, kept sorted
    external: Vec<Duration>,
    deliveries: usize,
    calls: Vec<ClockCall>,
}

impl FakeState {
    fn next_event(&self) -> Option<Duration> {
        let alarm = self.slot.map(|slot| slot.expires_at);
        let external = self.external.first().copied();
        match (alarm, external) {
            (Some(a), Some(e)) => Some(a.min(e)),
            (a, e) => a.or(e),
        }
    }

    /// Jump to `at` and deliver whatever is due there
    fn fire(&mut self, at: Duration) {
        self.now = at;
        if let Some(slot) = self.slot {
            if slot.expires_at == at {
                self.deliveries += 1;
                self.slot = (!slot.interval.is_zero()).then(|| Slot {
                    expires_at: at + slot.interval,
                    ..slot
                });
            }
        }
        while self.external.first() == Some(&at) {
            self.external.remove(0);
            self.deliveries += 1;
        }
    }

    fn advance_to(&mut self, target: Duration) {
        while let Some(at) = self.next_event().filter(|at| *at <= target) {
            self.fire(at);
        }
        self.now = target;
    }

    fn remaining(&self) -> Duration {
        self.slot
            .map(|slot| slot.expires_at.saturating_sub(self.now))
            .unwrap_or_default()
    }

    fn replace_slot(&mut self, initial: Duration, interval: Duration) -> Duration {
        let previous = self.remaining();
        self.slot = if initial.is_zero() {
            None
        } else {
            Some(Slot {
                expires_at: self.now + initial,
                interval,
            })
        };
        previous
    }
}

/// Cloneable handle to a simulated clock; clones share the same state
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    state: Arc<Mutex<FakeState>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current simulated time since the clock was created
    pub fn now(&self) -> Duration {
        self.state().now
    }

    /// Move time forward, delivering every alarm expiry that falls inside
    pub fn advance(&self, by: Duration) {
        let mut state = self.state();
        let target = state.now + by;
        state.advance_to(target);
    }

    /// Schedule an external signal (an interrupt not caused by the alarm)
    pub fn inject_signal_after(&self, delay: Duration) {
        let mut state = self.state();
        let at = state.now + delay;
        let pos = state.external.partition_point(|t| *t <= at);
        state.external.insert(pos, at);
    }

    /// Time left on the pending alarm, if any
    pub fn pending_alarm(&self) -> Option<Duration> {
        let state = self.state();
        state.slot.map(|_| state.remaining())
    }

    /// Every adapter call received so far
    pub fn calls(&self) -> Vec<ClockCall> {
        self.state().calls.clone()
    }
}

impl ClockAdapter for FakeClock {
    fn set_alarm(&mut self, delay_secs: u32) -> Result<u32, ClockError> {
        let mut state = self.state();
        state.calls.push(ClockCall::SetAlarm(delay_secs));
        let previous = state.replace_slot(Duration::from_secs(delay_secs.into()), Duration::ZERO);
        Ok(alarm_seconds(previous))
    }

    fn set_interval_alarm(
        &mut self,
        initial_micros: u64,
        repeat_micros: u64,
    ) -> Result<u64, ClockError> {
        let mut state = self.state();
        state
            .calls
            .push(ClockCall::SetIntervalAlarm(initial_micros, repeat_micros));
        let previous = state.replace_slot(
            Duration::from_micros(initial_micros),
            Duration::from_micros(repeat_micros),
        );
        Ok(u64::try_from(previous.as_micros()).unwrap_or(u64::MAX))
    }

    fn block_until_signal(&mut self) -> Result<(), ClockError> {
        let mut state = self.state();
        state.calls.push(ClockCall::BlockUntilSignal);
        match state.next_event() {
            Some(at) => {
                state.fire(at);
                Ok(())
            }
            None => panic!("FakeClock would block forever: no alarm armed and no signal injected"),
        }
    }

    fn wait_for_latch(&mut self, latch: &dyn Latch) -> Result<usize, ClockError> {
        // Simulated time can't race, checking then blocking is exact here
        loop {
            let count = latch.take();
            if count > 0 {
                return Ok(count);
            }
            self.block_until_signal()?;
        }
    }

    fn sleep_for(&mut self, duration: Duration) -> Result<SleepReport, ClockError> {
        let mut state = self.state();
        state.calls.push(ClockCall::SleepFor(duration));
        let target = state.now + duration;
        match state.next_event().filter(|at| *at < target) {
            Some(at) => {
                state.fire(at);
                Ok(SleepReport::interrupted(target - at, Errno::EINTR))
            }
            None => {
                state.advance_to(target);
                Ok(SleepReport::completed())
            }
        }
    }

    fn monotonic(&self) -> Duration {
        self.now()
    }
}

impl Latch for FakeClock {
    fn take(&self) -> usize {
        std::mem::take(&mut self.state().deliveries)
    }

    fn pending(&self) -> usize {
        self.state().deliveries
    }

    /// Alarm expiries and injected signals all count as SIGALRM
    fn signal(&self) -> Signal {
        Signal::SIGALRM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_replace_returns_previous_remaining() {
        let mut clock = FakeClock::new();
        assert_eq!(clock.set_alarm(10).unwrap(), 0);

        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.set_alarm(4).unwrap(), 7);
        assert_eq!(clock.pending_alarm(), Some(Duration::from_secs(4)));
    }

    #[test]
    fn test_alarm_reports_under_a_second_as_one() {
        let mut clock = FakeClock::new();
        clock.set_alarm(2).unwrap();
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.set_alarm(0).unwrap(), 1);
        assert_eq!(clock.pending_alarm(), None);
    }

    #[test]
    fn test_alarm_rounds_previous_to_nearest_second() {
        let mut clock = FakeClock::new();
        clock.set_interval_alarm(1_300_000, 0).unwrap();
        assert_eq!(clock.set_alarm(0).unwrap(), 1);

        clock.set_interval_alarm(1_600_000, 0).unwrap();
        assert_eq!(clock.set_alarm(0).unwrap(), 2);
    }

    #[test]
    fn test_interval_alarm_rearms_after_expiry() {
        let mut clock = FakeClock::new();
        clock.set_interval_alarm(100, 50).unwrap();

        clock.advance(Duration::from_micros(210));
        assert_eq!(clock.take(), 3);
        assert_eq!(clock.pending_alarm(), Some(Duration::from_micros(40)));
    }

    #[test]
    fn test_sleep_interrupted_by_alarm_reports_residual() {
        let mut clock = FakeClock::new();
        clock.set_alarm(2).unwrap();

        let report = clock.sleep_for(Duration::from_secs(5)).unwrap();
        assert!(!report.completed);
        assert_eq!(report.residual, Duration::from_secs(3));
        assert_eq!(report.os_error, Some(Errno::EINTR));
        assert_eq!(clock.now(), Duration::from_secs(2));
        assert_eq!(clock.pending(), 1);
    }

    #[test]
    fn test_sleep_completes_when_alarm_is_later() {
        let mut clock = FakeClock::new();
        clock.set_alarm(10).unwrap();

        let report = clock.sleep_for(Duration::from_secs(5)).unwrap();
        assert_eq!(report, SleepReport::completed());
        assert_eq!(clock.pending_alarm(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_block_until_injected_signal() {
        let mut clock = FakeClock::new();
        clock.inject_signal_after(Duration::from_millis(250));

        clock.block_until_signal().unwrap();
        assert_eq!(clock.now(), Duration::from_millis(250));
        assert_eq!(clock.take(), 1);
    }

    #[test]
    fn test_wait_for_latch_with_pending_tick_does_not_block() {
        let mut clock = FakeClock::new();
        clock.set_alarm(1).unwrap();
        clock.advance(Duration::from_secs(1));

        let latch = clock.clone();
        assert_eq!(clock.wait_for_latch(&latch).unwrap(), 1);
        assert!(!clock.calls().contains(&ClockCall::BlockUntilSignal));
    }

    #[test]
    fn test_wait_for_latch_blocks_until_delivery() {
        let mut clock = FakeClock::new();
        clock.set_interval_alarm(200_000, 200_000).unwrap();

        let latch = clock.clone();
        assert_eq!(clock.wait_for_latch(&latch).unwrap(), 1);
        assert_eq!(clock.now(), Duration::from_millis(200));
    }

    #[test]
    #[should_panic(expected = "block forever")]
    fn test_block_with_nothing_pending_panics() {
        let mut clock = FakeClock::new();
        let _ = clock.block_until_signal();
    }

    #[test]
    fn test_clones_share_state() {
        let mut clock = FakeClock::new();
        let observer = clock.clone();
        clock.set_alarm(1).unwrap();
        assert_eq!(observer.calls(), vec![ClockCall::SetAlarm(1)]);
    }
}
