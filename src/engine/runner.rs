use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentError, AlertAgent};
use crate::storage::{ActivityLog, EventSink, MemoryStore, Storage};
use crate::types::{AgentId, AgentMemory, Event, InboundSignal};

/// What one `receive` or `check` cycle left behind.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub memory: AgentMemory,
    pub event: Option<Event>,
    pub error: Option<AgentError>,
}

/// Drives one agent: loads its memory, invokes the core, persists the result
/// and hands emitted alerts to the event sink. One runner per agent keeps
/// calls against the same memory serialized.
pub struct AgentRunner {
    agent_id: AgentId,
    agent: AlertAgent,
    storage: Arc<dyn Storage>,
}

impl AgentRunner {
    pub fn new(agent_id: AgentId, agent: AlertAgent, storage: Arc<dyn Storage>) -> Self {
        Self {
            agent_id,
            agent,
            storage,
        }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub async fn load_memory(&self) -> Result<AgentMemory> {
        let config = self.agent.config();
        let mut memory = self
            .storage
            .get_memory(self.agent_id)
            .await?
            .unwrap_or_else(|| AgentMemory::new(config));
        memory.reconcile(config);
        Ok(memory)
    }

    // Skipped cycles leave stored memory as it was.
    async fn persist(&self, memory: &AgentMemory, error: Option<&AgentError>) -> Result<()> {
        if error.map_or(true, AgentError::keeps_partial_memory) {
            self.storage.put_memory(self.agent_id, memory).await?;
        }
        Ok(())
    }

    pub async fn receive(&self, signal: &InboundSignal) -> Result<CycleReport> {
        let mut memory = self.load_memory().await?;

        let error = self.agent.on_receive(signal, &mut memory).err();
        if let Some(e) = &error {
            log::log!(e.log_level(), "Agent {} receive: {}", self.agent_id, e);
        }

        self.persist(&memory, error.as_ref()).await?;

        Ok(CycleReport {
            memory,
            event: None,
            error,
        })
    }

    pub async fn check(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut memory = self.load_memory().await?;

        let (event, error) = match self.agent.on_check(&mut memory, now).await {
            Ok(outcome) if outcome.emitted => {
                let event = self.storage.emit(self.agent_id, &outcome.payload).await?;
                log::info!(
                    "Agent {} emitted event {} with {} alert(s)",
                    self.agent_id,
                    event.id,
                    outcome.payload.len()
                );
                (Some(event), None)
            }
            Ok(_) => {
                log::debug!("Agent {} found no active alerts", self.agent_id);
                (None, None)
            }
            Err(e) => {
                log::log!(e.log_level(), "Agent {} check: {}", self.agent_id, e);
                if matches!(e, AgentError::UpstreamFailure(_)) {
                    self.storage
                        .record_error(self.agent_id, &e.to_string(), now)
                        .await?;
                }
                (None, Some(e))
            }
        };

        self.persist(&memory, error.as_ref()).await?;

        Ok(CycleReport {
            memory,
            event,
            error,
        })
    }

    /// Polls on the interval the agent keeps in memory, applying inbound
    /// signals as they arrive. Returns once the signal channel closes or
    /// `shutdown` is cancelled.
    pub async fn run(
        &self,
        mut signals: mpsc::Receiver<InboundSignal>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let memory = self.load_memory().await?;
        let mut interval = memory.current_interval;
        let mut last_check = Instant::now();
        let mut next_check = last_check;

        log::info!(
            "Agent {} started, state {}",
            self.agent_id,
            memory.state().as_str()
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_check) => {
                    last_check = Instant::now();
                    match self.check(Utc::now()).await {
                        Ok(report) => interval = report.memory.current_interval,
                        Err(e) => log::error!("Agent {} check failed: {}", self.agent_id, e),
                    }
                    next_check = last_check + interval;
                }
                signal = signals.recv() => {
                    let Some(signal) = signal else { break };
                    match self.receive(&signal).await {
                        Ok(report) => {
                            if report.memory.current_interval != interval {
                                interval = report.memory.current_interval;
                                next_check = last_check + interval;
                                log::info!(
                                    "Agent {} now {}, next check in {}s",
                                    self.agent_id,
                                    report.memory.state().as_str(),
                                    next_check.saturating_duration_since(Instant::now()).as_secs()
                                );
                            }
                        }
                        Err(e) => log::error!("Agent {} receive failed: {}", self.agent_id, e),
                    }
                }
                _ = shutdown.cancelled() => break,
            }
        }

        log::info!("Agent {} stopped", self.agent_id);
        Ok(())
    }
}
