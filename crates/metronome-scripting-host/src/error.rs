use std::fmt;

use metronome_core::TimingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostErrorKind {
    /// Wrong number of arguments
    ArgumentError,
    /// Argument of a type that can't be coerced
    TypeError,
    /// Negative or out-of-range duration
    InvalidArgument,
    /// Sleep woken early; `residual` and `errno` are set
    SleepInterrupted,
    /// Recurring step overran its period
    RealTimeError,
    SystemCallError,
    NoMethodError,
}

impl fmt::Display for HostErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostErrorKind::ArgumentError => "ArgumentError",
            HostErrorKind::TypeError => "TypeError",
            HostErrorKind::InvalidArgument => "InvalidArgument",
            HostErrorKind::SleepInterrupted => "SleepInterrupted",
            HostErrorKind::RealTimeError => "RealTimeError",
            HostErrorKind::SystemCallError => "SystemCallError",
            HostErrorKind::NoMethodError => "NoMethodError",
        };
        f.write_str(name)
    }
}

/// Error raised into the scripting environment
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct HostError {
    pub kind: HostErrorKind,
    pub message: String,
    /// Unslept seconds of an interrupted sleep
    pub residual: Option<f64>,
    pub errno: Option<i32>,
}

impl HostError {
    pub fn new(kind: HostErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            residual: None,
            errno: None,
        }
    }
}

impl From<TimingError> for HostError {
    fn from(err: TimingError) -> Self {
        let message = err.to_string();
        match err {
            TimingError::InvalidArgument { .. } => {
                HostError::new(HostErrorKind::InvalidArgument, message)
            }
            TimingError::SleepInterrupted { residual, os_error } => HostError {
                kind: HostErrorKind::SleepInterrupted,
                message,
                residual: Some(residual.as_secs_f64()),
                errno: Some(os_error as i32),
            },
            TimingError::Overrun(_) => HostError::new(HostErrorKind::RealTimeError, message),
            TimingError::Os(clock_err) => HostError {
                errno: Some(clock_err.errno() as i32),
                ..HostError::new(HostErrorKind::SystemCallError, message)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metronome_clock::Errno;
    use std::time::Duration;

    #[test]
    fn test_interrupted_sleep_carries_residual() {
        let err = HostError::from(TimingError::SleepInterrupted {
            residual: Duration::from_millis(2500),
            os_error: Errno::EINTR,
        });
        assert_eq!(err.kind, HostErrorKind::SleepInterrupted);
        assert_eq!(err.residual, Some(2.5));
        assert_eq!(err.errno, Some(Errno::EINTR as i32));
        assert!(err.to_string().starts_with("SleepInterrupted: "));
    }
}
