use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AlertAgent;

/// Errors logged this close before the last event still count as recent.
pub const ERROR_GRACE_SECS: i64 = 120;

/// Host-side facts about an agent's recent output, used to judge `working`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub last_event_at: Option<DateTime<Utc>>,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl AgentActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, at: DateTime<Utc>) {
        self.last_event_at = Some(at);
    }

    pub fn record_error(&mut self, message: impl Into<String>, at: DateTime<Utc>) {
        self.last_error_at = Some(at);
        self.last_error = Some(message.into());
    }

    pub fn event_created_within(&self, period: std::time::Duration, now: DateTime<Utc>) -> bool {
        let period = match Duration::from_std(period) {
            Ok(period) => period,
            Err(_) => return self.last_event_at.is_some(),
        };
        self.last_event_at
            .map(|at| at > now - period)
            .unwrap_or(false)
    }

    pub fn recent_error_logs(&self) -> bool {
        match (self.last_event_at, self.last_error_at) {
            (Some(event_at), Some(error_at)) => error_at > event_at - Duration::seconds(ERROR_GRACE_SECS),
            _ => false,
        }
    }

    pub fn working(&self, period: std::time::Duration, now: DateTime<Utc>) -> bool {
        AlertAgent::working(self.event_created_within(period, now), self.recent_error_logs())
    }
}
