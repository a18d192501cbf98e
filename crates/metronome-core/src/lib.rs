//! Interruptible timed waits and alarm scheduling on top of [`metronome_clock`]
//!
//! - [`TimedWait`]: sleep with residual-time reporting, one-shot and interval
//!   alarms with replace-and-return-previous semantics, wait for any signal
//! - [`Operation`]: run a callback at a fixed period driven by the interval alarm
//! - [`Machine`]: named states, the timed ones paced by an [`Operation`]
//! - [`DiagnosticEmitter`]: one line per argument on the error stream

pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod machine;
pub mod operation;
mod validate;

pub use diagnostic::{
    DEFAULT_MAX_DEPTH, DiagnosticArg, DiagnosticEmitter, EmitError, warn, warn_with_depth,
};
pub use engine::{SleepOutcome, TimedWait};
pub use error::TimingError;
pub use machine::{Machine, MachineError, MachineReport, START_STATE, State, Transition};
pub use operation::{Operation, OperationReport, RealTimeError, Tick};

pub use metronome_clock as clock;
