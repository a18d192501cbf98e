//! OS interval-timer and signal-wait primitives for metronome
//!
//! This crate is the only place that talks to the kernel. Everything above it
//! goes through the [`ClockAdapter`] trait so the timed-wait engine can be driven
//! by a simulated clock in tests. That clock, `FakeClock`, is only built with the
//! `test-util` feature; it panics where a real clock would block forever.

#[cfg(not(unix))]
compile_error!("metronome-clock requires a unix target (alarm, setitimer, pause, nanosleep)");

pub mod adapter;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod fake;
pub mod latch;
pub mod system;

pub use adapter::{ClockAdapter, SleepReport, alarm_seconds};
pub use error::ClockError;
#[cfg(any(test, feature = "test-util"))]
pub use fake::{ClockCall, FakeClock};
pub use latch::{Latch, SignalLatch};
pub use system::SystemClock;

// Re-exported so callers can name signals without depending on nix directly
pub use nix::errno::Errno;
pub use nix::sys::signal::Signal;
