use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::{SigSet, SigmaskHow};
use nix::unistd;
use tracing::trace;

use crate::{ClockAdapter, ClockError, Latch, SleepReport};

const MICROS_PER_SEC: u64 = 1_000_000;

/// [`ClockAdapter`] backed by the real kernel timers of this process
///
/// `alarm(2)` and `setitimer(ITIMER_REAL)` share the same per-process slot, so
/// scheduling through either replaces what the other armed. Nothing is stored
/// here apart from the origin of the monotonic readings.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockAdapter for SystemClock {
    fn set_alarm(&mut self, delay_secs: u32) -> Result<u32, ClockError> {
        // nix refuses 0 in alarm::set, cancelling is its own call
        let previous = if delay_secs == 0 {
            unistd::alarm::cancel()
        } else {
            unistd::alarm::set(delay_secs)
        };
        trace!(target: "metronome", delay_secs, ?previous, "alarm");
        Ok(previous.unwrap_or(0))
    }

    fn set_interval_alarm(
        &mut self,
        initial_micros: u64,
        repeat_micros: u64,
    ) -> Result<u64, ClockError> {
        // SAFETY: itimerval is plain old data; zero is a valid "disarmed" value
        let mut new: libc::itimerval = unsafe { std::mem::zeroed() };
        new.it_value = micros_to_timeval(initial_micros);
        new.it_interval = micros_to_timeval(repeat_micros);
        let mut old: libc::itimerval = unsafe { std::mem::zeroed() };

        // SAFETY: both pointers refer to live, properly aligned itimervals
        let rc = unsafe { libc::setitimer(libc::ITIMER_REAL, &new, &mut old) };
        if rc == -1 {
            return Err(ClockError::last("setitimer"));
        }

        let previous = timeval_to_micros(&old.it_value);
        trace!(target: "metronome", initial_micros, repeat_micros, previous, "setitimer");
        Ok(previous)
    }

    fn block_until_signal(&mut self) -> Result<(), ClockError> {
        trace!(target: "metronome", "pause");
        unistd::pause();
        Ok(())
    }

    fn wait_for_latch(&mut self, latch: &dyn Latch) -> Result<usize, ClockError> {
        let signal = latch.signal();
        let mut held = SigSet::empty();
        held.add(signal);
        let previous = held
            .thread_swap_mask(SigmaskHow::SIG_BLOCK)
            .map_err(|errno| ClockError::Os {
                call: "pthread_sigmask",
                errno,
            })?;

        // sigsuspend swaps in this mask and waits in one step
        let mut waiting = previous;
        waiting.remove(signal);
        let result = loop {
            let count = latch.take();
            if count > 0 {
                break Ok(count);
            }
            trace!(target: "metronome", ?signal, "sigsuspend");
            if let Err(errno) = waiting.suspend() {
                break Err(ClockError::Os {
                    call: "sigsuspend",
                    errno,
                });
            }
        };

        previous.thread_set_mask().map_err(|errno| ClockError::Os {
            call: "pthread_sigmask",
            errno,
        })?;
        result
    }

    fn sleep_for(&mut self, duration: Duration) -> Result<SleepReport, ClockError> {
        // SAFETY: timespec is plain old data
        let mut request: libc::timespec = unsafe { std::mem::zeroed() };
        request.tv_sec = duration.as_secs() as libc::time_t;
        request.tv_nsec = duration.subsec_nanos() as _;
        let mut remaining: libc::timespec = unsafe { std::mem::zeroed() };

        // SAFETY: request and remaining are live timespecs owned by this frame
        let rc = unsafe { libc::nanosleep(&request, &mut remaining) };
        if rc == 0 {
            return Ok(SleepReport::completed());
        }

        match Errno::last() {
            Errno::EINTR => {
                let residual = Duration::new(
                    remaining.tv_sec.max(0) as u64,
                    remaining.tv_nsec.max(0) as u32,
                )
                .min(duration);
                trace!(target: "metronome", ?duration, ?residual, "nanosleep interrupted");
                Ok(SleepReport::interrupted(residual, Errno::EINTR))
            }
            errno => Err(ClockError::Os {
                call: "nanosleep",
                errno,
            }),
        }
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

fn micros_to_timeval(micros: u64) -> libc::timeval {
    // SAFETY: timeval is plain old data
    let mut tv: libc::timeval = unsafe { std::mem::zeroed() };
    tv.tv_sec = (micros / MICROS_PER_SEC) as libc::time_t;
    tv.tv_usec = (micros % MICROS_PER_SEC) as libc::suseconds_t;
    tv
}

fn timeval_to_micros(tv: &libc::timeval) -> u64 {
    let secs = tv.tv_sec.max(0) as u64;
    let micros = tv.tv_usec.max(0) as u64;
    secs.saturating_mul(MICROS_PER_SEC).saturating_add(micros)
}
