use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::runner::AgentRunner;
use crate::agent::AgentConfig;
use crate::types::{AgentId, InboundSignal};

const SIGNAL_BUFFER: usize = 64;

struct AgentEntry {
    config: AgentConfig,
    signals: mpsc::Sender<InboundSignal>,
}

/// Routes inbound signals to the runner that owns each agent.
#[derive(Default)]
pub struct Dispatcher {
    agents: HashMap<AgentId, AgentEntry>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        agent_id: AgentId,
        config: AgentConfig,
    ) -> mpsc::Receiver<InboundSignal> {
        let (tx, rx) = mpsc::channel(SIGNAL_BUFFER);
        self.agents.insert(
            agent_id,
            AgentEntry {
                config,
                signals: tx,
            },
        );
        rx
    }

    pub fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<_> = self.agents.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn config(&self, agent_id: &AgentId) -> Option<&AgentConfig> {
        self.agents.get(agent_id).map(|e| &e.config)
    }

    /// Queues `signal` for the agent. Returns `Ok(false)` for unknown agents.
    pub async fn dispatch(&self, agent_id: &AgentId, signal: InboundSignal) -> Result<bool> {
        let Some(entry) = self.agents.get(agent_id) else {
            return Ok(false);
        };

        entry
            .signals
            .send(signal)
            .await
            .map_err(|_| anyhow!("Agent {} is no longer running", agent_id))?;
        Ok(true)
    }
}

/// Spawns one task per runner so distinct agents poll in parallel. Every
/// runner stops when `shutdown` is cancelled, even while the dispatcher
/// still holds its signal sender.
pub fn spawn_agents(
    runners: Vec<(AgentRunner, mpsc::Receiver<InboundSignal>)>,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<Result<()>>> {
    runners
        .into_iter()
        .map(|(runner, signals)| {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { runner.run(signals, shutdown).await })
        })
        .collect()
}

/// Waits for every spawned agent, logging the ones that failed.
pub async fn join_agents(handles: Vec<JoinHandle<Result<()>>>) {
    for result in futures::future::join_all(handles).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::error!("Agent stopped with error: {}", e),
            Err(e) => log::error!("Agent task panicked: {}", e),
        }
    }
}
