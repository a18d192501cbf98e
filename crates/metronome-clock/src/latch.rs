//! Counting signal traps
//!
//! A blocking `pause`/`nanosleep` only returns early if the signal that woke it
//! has a handler; with the default disposition SIGALRM simply ends the process.
//! [`SignalLatch`] installs a handler that does nothing but bump a per-signal
//! counter, which is the only kind of work that is async-signal-safe.

use std::sync::atomic::{AtomicUsize, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use tracing::{debug, warn};

use crate::ClockError;

/// Source of counted signal deliveries
pub trait Latch {
    /// Deliveries recorded since the last `take`, resetting the count to zero.
    fn take(&self) -> usize;

    /// Deliveries recorded since the last `take`, without resetting.
    fn pending(&self) -> usize;

    /// The signal whose deliveries are counted
    fn signal(&self) -> Signal;
}

const SIGNAL_SLOTS: usize = 65;

static DELIVERIES: [AtomicUsize; SIGNAL_SLOTS] = [const { AtomicUsize::new(0) }; SIGNAL_SLOTS];

extern "C" fn record_delivery(signo: libc::c_int) {
    if let Some(slot) = DELIVERIES.get(signo as usize) {
        slot.fetch_add(1, Ordering::SeqCst);
    }
}

fn slot(signal: Signal) -> &'static AtomicUsize {
    // Every signal nix can name is below NSIG, which fits in the table
    &DELIVERIES[signal as usize % SIGNAL_SLOTS]
}

/// Handler for one signal that counts deliveries until dropped
///
/// The handler is installed without `SA_RESTART`, so a sleep or pause in progress
/// returns `EINTR` when the signal lands. Dropping the latch puts the previous
/// disposition back. Only one latch per signal should be alive at a time; a second
/// one shares (and resets) the same counter.
#[derive(Debug)]
pub struct SignalLatch {
    signal: Signal,
    previous: SigAction,
}

impl SignalLatch {
    pub fn install(signal: Signal) -> Result<Self, ClockError> {
        let action = SigAction::new(
            SigHandler::Handler(record_delivery),
            SaFlags::empty(),
            SigSet::empty(),
        );

        slot(signal).store(0, Ordering::SeqCst);

        // SAFETY: record_delivery only touches an atomic, which is async-signal-safe
        let previous = unsafe { sigaction(signal, &action) }.map_err(|errno| ClockError::Os {
            call: "sigaction",
            errno,
        })?;

        let mut mask = SigSet::empty();
        mask.add(signal);
        mask.thread_unblock().map_err(|errno| ClockError::Os {
            call: "pthread_sigmask",
            errno,
        })?;

        debug!(target: "metronome", ?signal, "installed signal latch");
        Ok(Self { signal, previous })
    }
}

impl Latch for SignalLatch {
    fn take(&self) -> usize {
        slot(self.signal).swap(0, Ordering::SeqCst)
    }

    fn pending(&self) -> usize {
        slot(self.signal).load(Ordering::SeqCst)
    }

    fn signal(&self) -> Signal {
        self.signal
    }
}

impl Drop for SignalLatch {
    fn drop(&mut self) {
        // SAFETY: restoring the disposition that was in place before install
        if let Err(errno) = unsafe { sigaction(self.signal, &self.previous) } {
            warn!(target: "metronome", signal = ?self.signal, %errno, "failed to restore signal disposition");
        } else {
            debug!(target: "metronome", signal = ?self.signal, "restored signal disposition");
        }
    }
}
