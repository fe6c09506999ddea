use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::AlertState;
use crate::agent::{select_interval, AgentConfig};

/// Durable per-agent state carried between polling cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMemory {
    pub location: Option<String>,
    pub watch_alerts: bool,
    pub have_alerts: bool,
    pub current_interval: Duration,
}

impl AgentMemory {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            location: config.location.clone(),
            watch_alerts: false,
            have_alerts: false,
            current_interval: config.default_interval,
        }
    }

    /// Aligns stored memory with the current configuration. The configured
    /// location fills in only when no signal has supplied one, and the interval
    /// is re-derived so a changed schedule takes effect immediately.
    pub fn reconcile(&mut self, config: &AgentConfig) {
        if !self.has_location() {
            self.location = config.location.clone();
        }
        self.current_interval = select_interval(self.watch_alerts, self.have_alerts, config);
    }

    pub fn state(&self) -> AlertState {
        AlertState::from_flags(self.watch_alerts, self.have_alerts)
    }

    pub fn has_location(&self) -> bool {
        self.location
            .as_deref()
            .map(|l| !l.trim().is_empty())
            .unwrap_or(false)
    }
}
