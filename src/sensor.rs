use std::fmt;
use std::time::Duration;

use crate::Result;

/// Output level for the trigger line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

/// Transition on the echo line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Rising => write!(f, "rising"),
            Edge::Falling => write!(f, "falling"),
        }
    }
}

/// The trigger/echo line pair of one ultrasonic sensor.
///
/// Implementations own both lines exclusively and release them on drop.
pub trait SensorLines: Send {
    /// Drive the trigger line to `level`.
    fn set_trigger(&mut self, level: Level) -> Result<()>;

    /// Block until the next `edge` on the echo line, for at most `timeout`.
    ///
    /// Returns the edge timestamp, or `None` if the timeout elapsed first.
    /// Edges of the other kind seen while waiting are skipped. Timestamps
    /// only need to be comparable with each other.
    fn wait_for_edge(&mut self, edge: Edge, timeout: Duration) -> Result<Option<Duration>>;

    /// Drop any echo edges queued since the last wait.
    fn discard_pending(&mut self) -> Result<()>;
}
