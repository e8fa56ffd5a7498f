use std::fmt;

/// Coordinator states (pure domain)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    /// No clients connected, producer halted
    Idle,
    /// At least one client connected, producer running
    Streaming,
    /// Transient teardown: all clients being disconnected, producer stopping
    Draining,
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Streaming => write!(f, "STREAMING"),
            Self::Draining => write!(f, "DRAINING"),
        }
    }
}

impl CoordinatorState {
    /// Convert state to numeric value for metrics
    pub fn as_metric(&self) -> i64 {
        match self {
            Self::Idle => 0,
            Self::Streaming => 1,
            Self::Draining => 2,
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self::Idle
    }
}
