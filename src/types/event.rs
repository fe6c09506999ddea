use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AgentId, AlertRecord, EventId};

/// A persisted emission, fanned out to downstream consumers by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub agent_id: AgentId,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn from_alerts(agent_id: AgentId, alerts: &[AlertRecord]) -> anyhow::Result<Self> {
        Ok(Self {
            id: EventId::new_v4(),
            agent_id,
            payload: serde_json::to_value(alerts)?,
            created_at: Utc::now(),
        })
    }

    pub fn alerts(&self) -> anyhow::Result<Vec<AlertRecord>> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}
