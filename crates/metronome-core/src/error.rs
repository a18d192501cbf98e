use std::time::Duration;

use metronome_clock::{ClockError, Errno};

use crate::operation::RealTimeError;

/// Errors raised by the timed-wait engine
///
/// None of these are logged where they are detected; the caller decides whether
/// to retry the residual, report, or give up.
#[derive(Debug, thiserror::Error)]
pub enum TimingError {
    /// Rejected before any OS call was made
    #[error("invalid {what} {value}: {reason}")]
    InvalidArgument {
        what: &'static str,
        value: String,
        reason: &'static str,
    },

    /// A signal woke the sleep early; `residual` is the unslept time
    #[error("sleep interrupted with {residual:?} remaining ({os_error})")]
    SleepInterrupted { residual: Duration, os_error: Errno },

    /// A recurring step took longer than its period under strict timing
    #[error(transparent)]
    Overrun(#[from] RealTimeError),

    #[error(transparent)]
    Os(#[from] ClockError),
}

impl TimingError {
    pub(crate) fn invalid(what: &'static str, value: impl ToString, reason: &'static str) -> Self {
        TimingError::InvalidArgument {
            what,
            value: value.to_string(),
            reason,
        }
    }

    /// Unslept time, for an interrupted sleep
    pub fn residual(&self) -> Option<Duration> {
        match self {
            TimingError::SleepInterrupted { residual, .. } => Some(*residual),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, TimingError::SleepInterrupted { .. })
    }
}
