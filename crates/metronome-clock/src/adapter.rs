use std::time::Duration;

use nix::errno::Errno;

use crate::{ClockError, Latch};

/// Outcome of a single blocking sleep as reported by the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepReport {
    /// True if the full duration elapsed without a signal arriving
    pub completed: bool,
    /// Unslept time; always zero when `completed` is true
    pub residual: Duration,
    /// Error code the kernel returned when the sleep was cut short
    pub os_error: Option<Errno>,
}

impl SleepReport {
    pub fn completed() -> Self {
        Self {
            completed: true,
            residual: Duration::ZERO,
            os_error: None,
        }
    }

    pub fn interrupted(residual: Duration, os_error: Errno) -> Self {
        Self {
            completed: false,
            residual,
            os_error: Some(os_error),
        }
    }
}

/// Remaining alarm time as `alarm(2)` reports it in whole seconds
///
/// Rounds to the nearest second, except that anything pending under a second
/// still reads as 1 so a live alarm never looks disarmed.
pub fn alarm_seconds(remaining: Duration) -> u32 {
    let micros = remaining.subsec_micros();
    let mut secs = remaining.as_secs();
    if (secs == 0 && micros > 0) || micros >= 500_000 {
        secs += 1;
    }
    u32::try_from(secs).unwrap_or(u32::MAX)
}

/// Timer and signal-wait operations with process-wide effect
///
/// There is exactly one alarm slot per process. Every scheduling call replaces
/// whatever was pending and hands back the time that was left on it, which is the
/// only way to observe the slot. Implementations never see negative values:
/// arguments are validated by the caller and arrive as unsigned integers.
pub trait ClockAdapter {
    /// Arm a one-shot alarm `delay_secs` from now (0 disarms it).
    ///
    /// Returns the seconds that were left on the previous alarm, or 0.
    fn set_alarm(&mut self, delay_secs: u32) -> Result<u32, ClockError>;

    /// Arm an alarm that first fires after `initial_micros` and then every
    /// `repeat_micros` (0 means one-shot). `initial_micros == 0` disarms it.
    ///
    /// Returns the microseconds that were left on the previous alarm, or 0.
    fn set_interval_alarm(
        &mut self,
        initial_micros: u64,
        repeat_micros: u64,
    ) -> Result<u64, ClockError>;

    /// Suspend the calling thread until any signal has been delivered and handled.
    fn block_until_signal(&mut self) -> Result<(), ClockError>;

    /// Take the deliveries counted by `latch`, blocking until there is at least one.
    ///
    /// The latch's signal is held back between checking the count and starting
    /// to wait, so a delivery landing in between can't leave the wait hanging.
    fn wait_for_latch(&mut self, latch: &dyn Latch) -> Result<usize, ClockError>;

    /// Block for up to `duration`, returning early if a signal is delivered.
    fn sleep_for(&mut self, duration: Duration) -> Result<SleepReport, ClockError>;

    /// Monotonic clock reading, only meaningful relative to another reading.
    fn monotonic(&self) -> Duration;
}

impl<C: ClockAdapter + ?Sized> ClockAdapter for Box<C> {
    fn set_alarm(&mut self, delay_secs: u32) -> Result<u32, ClockError> {
        (**self).set_alarm(delay_secs)
    }

    fn set_interval_alarm(
        &mut self,
        initial_micros: u64,
        repeat_micros: u64,
    ) -> Result<u64, ClockError> {
        (**self).set_interval_alarm(initial_micros, repeat_micros)
    }

    fn block_until_signal(&mut self) -> Result<(), ClockError> {
        (**self).block_until_signal()
    }

    fn wait_for_latch(&mut self, latch: &dyn Latch) -> Result<usize, ClockError> {
        (**self).wait_for_latch(latch)
    }

    fn sleep_for(&mut self, duration: Duration) -> Result<SleepReport, ClockError> {
        (**self).sleep_for(duration)
    }

    fn monotonic(&self) -> Duration {
        (**self).monotonic()
    }
}
