use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::traits::{ActivityLog, EventSink, MemoryStore};
use crate::lifecycle::AgentActivity;
use crate::types::{AgentId, AgentMemory, AlertRecord, Event};

#[derive(Clone)]
pub struct InMemoryStore {
    memories: Arc<RwLock<HashMap<AgentId, AgentMemory>>>,
    events: Arc<RwLock<Vec<Event>>>,
    activity: Arc<RwLock<HashMap<AgentId, AgentActivity>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            memories: Arc::new(RwLock::new(HashMap::new())),
            events: Arc::new(RwLock::new(Vec::new())),
            activity: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get_memory(&self, agent_id: AgentId) -> Result<Option<AgentMemory>> {
        let memories = self.memories.read().unwrap();
        Ok(memories.get(&agent_id).cloned())
    }

    async fn put_memory(&self, agent_id: AgentId, memory: &AgentMemory) -> Result<()> {
        let mut memories = self.memories.write().unwrap();
        memories.insert(agent_id, memory.clone());
        Ok(())
    }
}

#[async_trait]
impl EventSink for InMemoryStore {
    async fn emit(&self, agent_id: AgentId, payload: &[AlertRecord]) -> Result<Event> {
        let event = Event::from_alerts(agent_id, payload)?;

        self.events.write().unwrap().push(event.clone());
        self.activity
            .write()
            .unwrap()
            .entry(agent_id)
            .or_default()
            .record_event(event.created_at);

        Ok(event)
    }
}

#[async_trait]
impl ActivityLog for InMemoryStore {
    async fn record_error(
        &self,
        agent_id: AgentId,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut activity = self.activity.write().unwrap();
        activity.entry(agent_id).or_default().record_error(message, at);
        Ok(())
    }

    async fn activity(&self, agent_id: AgentId) -> Result<AgentActivity> {
        let activity = self.activity.read().unwrap();
        Ok(activity.get(&agent_id).cloned().unwrap_or_default())
    }

    async fn events(&self, agent_id: AgentId, limit: usize) -> Result<Vec<Event>> {
        let events = self.events.read().unwrap();
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.agent_id == agent_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
