pub mod alert;
pub mod event;
pub mod memory;
pub mod signal;

pub use alert::AlertRecord;
pub use event::Event;
pub use memory::AgentMemory;
pub use signal::InboundSignal;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AgentId = Uuid;
pub type EventId = Uuid;

/// Projection of the two memory flags, used for logs and the status API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertState {
    Calm,            // Nothing suspicious, no alerts
    Watching,        // Forecast looks severe, no alerts yet
    Alerted,         // Upstream reports alerts
    AlertedWatching, // Both
}

impl AlertState {
    pub fn from_flags(watch_alerts: bool, have_alerts: bool) -> Self {
        match (watch_alerts, have_alerts) {
            (false, false) => AlertState::Calm,
            (true, false) => AlertState::Watching,
            (false, true) => AlertState::Alerted,
            (true, true) => AlertState::AlertedWatching,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AlertState::Calm => "Calm",
            AlertState::Watching => "Watching",
            AlertState::Alerted => "Alerted",
            AlertState::AlertedWatching => "AlertedWatching",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_flags() {
        assert_eq!(AlertState::from_flags(false, false), AlertState::Calm);
        assert_eq!(AlertState::from_flags(true, false), AlertState::Watching);
        assert_eq!(AlertState::from_flags(false, true), AlertState::Alerted);
        assert_eq!(
            AlertState::from_flags(true, true),
            AlertState::AlertedWatching
        );
    }
}
