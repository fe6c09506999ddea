use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::lifecycle::AgentActivity;
use crate::types::{AgentId, AgentMemory, AlertRecord, Event};

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get_memory(&self, agent_id: AgentId) -> Result<Option<AgentMemory>>;
    async fn put_memory(&self, agent_id: AgentId, memory: &AgentMemory) -> Result<()>;
}

#[async_trait]
pub trait EventSink: Send + Sync {
    /// Persists one event carrying `payload`. Also counts as the agent's
    /// latest event for health purposes.
    async fn emit(&self, agent_id: AgentId, payload: &[AlertRecord]) -> Result<Event>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record_error(&self, agent_id: AgentId, message: &str, at: DateTime<Utc>)
        -> Result<()>;
    async fn activity(&self, agent_id: AgentId) -> Result<AgentActivity>;
    /// Most recent first.
    async fn events(&self, agent_id: AgentId, limit: usize) -> Result<Vec<Event>>;
}

pub trait Storage: MemoryStore + EventSink + ActivityLog {}

impl<T: MemoryStore + EventSink + ActivityLog> Storage for T {}
