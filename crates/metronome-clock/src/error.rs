use nix::errno::Errno;

/// Failure reported by the kernel for a timer or signal call
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    #[error("{call} failed: {errno}")]
    Os { call: &'static str, errno: Errno },
}

impl ClockError {
    pub(crate) fn last(call: &'static str) -> Self {
        ClockError::Os {
            call,
            errno: Errno::last(),
        }
    }

    /// The raw errno value
    pub fn errno(&self) -> Errno {
        match self {
            ClockError::Os { errno, .. } => *errno,
        }
    }
}
