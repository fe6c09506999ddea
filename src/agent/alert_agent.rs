use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::classifier::{classify, matching_term};
use super::interval::select_interval;
use super::{AgentConfig, AgentError};
use crate::providers::AlertSource;
use crate::types::{AgentMemory, AlertRecord, InboundSignal};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one successful poll.
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub emitted: bool,
    pub payload: Vec<AlertRecord>,
    pub checked_at: DateTime<Utc>,
}

/// The alert escalation core.
///
/// Holds no per-agent state of its own: everything that survives a cycle
/// lives in the [`AgentMemory`] passed to each call, so the caller must not
/// run `on_receive` and `on_check` concurrently against the same memory.
pub struct AlertAgent {
    config: AgentConfig,
    source: Arc<dyn AlertSource>,
    fetch_timeout: Duration,
}

impl AlertAgent {
    pub fn new(config: AgentConfig, source: Arc<dyn AlertSource>) -> Self {
        Self {
            config,
            source,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Applies a forecast signal to `memory`.
    ///
    /// On `MissingLocation` the watch state and interval have already been
    /// updated; callers should persist the memory anyway.
    pub fn on_receive(
        &self,
        signal: &InboundSignal,
        memory: &mut AgentMemory,
    ) -> Result<(), AgentError> {
        if signal.is_empty() {
            return Err(AgentError::InvalidSignal);
        }

        if let Some(location) = signal.location() {
            memory.location = Some(location.to_string());
        }

        memory.watch_alerts = classify(signal.conditions());
        memory.current_interval =
            select_interval(memory.watch_alerts, memory.have_alerts, &self.config);

        if let Some(term) = matching_term(signal.conditions()) {
            log::debug!("Forecast mentions {}, watching for alerts", term);
        }

        if !memory.has_location() {
            return Err(AgentError::MissingLocation);
        }

        Ok(())
    }

    /// Polls the upstream source once. Memory is left untouched unless the
    /// fetch succeeds.
    pub async fn on_check(
        &self,
        memory: &mut AgentMemory,
        now: DateTime<Utc>,
    ) -> Result<CheckOutcome, AgentError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if self.config.key_setup() => key,
            _ => return Err(AgentError::NotReady("api_key is not configured".to_string())),
        };
        let location = match memory.location.as_deref() {
            Some(location) if memory.has_location() => location,
            _ => return Err(AgentError::NotReady("location is not known".to_string())),
        };

        let fetched =
            tokio::time::timeout(self.fetch_timeout, self.source.fetch_alerts(api_key, location))
                .await;

        let alerts = match fetched {
            Ok(Ok(alerts)) => alerts,
            Ok(Err(e)) => return Err(AgentError::UpstreamFailure(e.to_string())),
            Err(_) => {
                return Err(AgentError::UpstreamFailure(format!(
                    "timed out after {}s",
                    self.fetch_timeout.as_secs_f64()
                )))
            }
        };

        memory.have_alerts = !alerts.is_empty();
        memory.current_interval =
            select_interval(memory.watch_alerts, memory.have_alerts, &self.config);

        Ok(CheckOutcome {
            emitted: memory.have_alerts,
            payload: alerts,
            checked_at: now,
        })
    }

    /// Whether the agent looks healthy. Both facts come from the host.
    pub fn working(recent_event_within_period: bool, recent_errors: bool) -> bool {
        recent_event_within_period && !recent_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::StaticAlertSource;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_config() -> AgentConfig {
        AgentConfig {
            api_key: Some("abc123".to_string()),
            default_interval: Duration::from_secs(1800),
            alerted_interval: Duration::from_secs(600),
            ..Default::default()
        }
    }

    fn alert(kind: &str) -> AlertRecord {
        AlertRecord::new(kind, "Test Alert", "message", Utc::now())
    }

    fn agent_with(alerts: Vec<AlertRecord>) -> AlertAgent {
        AlertAgent::new(test_config(), Arc::new(StaticAlertSource::new(alerts)))
    }

    fn ready_memory() -> AgentMemory {
        let mut memory = AgentMemory::new(&test_config());
        memory.location = Some("94103".to_string());
        memory
    }

    struct FailingSource;

    #[async_trait]
    impl AlertSource for FailingSource {
        async fn fetch_alerts(&self, _api_key: &str, _location: &str) -> Result<Vec<AlertRecord>> {
            anyhow::bail!("connection refused")
        }
    }

    struct SlowSource;

    #[async_trait]
    impl AlertSource for SlowSource {
        async fn fetch_alerts(&self, _api_key: &str, _location: &str) -> Result<Vec<AlertRecord>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AlertSource for CountingSource {
        async fn fetch_alerts(&self, _api_key: &str, _location: &str) -> Result<Vec<AlertRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[test]
    fn test_receive_severe_forecast() {
        let agent = agent_with(vec![]);
        let mut memory = AgentMemory::new(&test_config());

        let signal = InboundSignal::new(
            Some("94103".to_string()),
            Some("Severe Thunderstorm warning".to_string()),
        );
        agent.on_receive(&signal, &mut memory).unwrap();

        assert!(memory.watch_alerts);
        assert_eq!(memory.location.as_deref(), Some("94103"));
        assert_eq!(memory.current_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_receive_empty_signal_is_invalid() {
        let agent = agent_with(vec![]);
        let mut memory = ready_memory();
        memory.watch_alerts = true;
        let before = memory.clone();

        let result = agent.on_receive(&InboundSignal::default(), &mut memory);

        assert_eq!(result, Err(AgentError::InvalidSignal));
        assert_eq!(memory, before);
    }

    #[test]
    fn test_receive_without_location_keeps_partial_update() {
        let agent = agent_with(vec![]);
        let mut memory = AgentMemory::new(&test_config());

        let signal = InboundSignal::new(None, Some("Hail".to_string()));
        let result = agent.on_receive(&signal, &mut memory);

        assert_eq!(result, Err(AgentError::MissingLocation));
        assert!(memory.watch_alerts);
        assert_eq!(memory.current_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_receive_keeps_existing_location() {
        let agent = agent_with(vec![]);
        let mut memory = ready_memory();

        let signal = InboundSignal::new(None, Some("Clear".to_string()));
        agent.on_receive(&signal, &mut memory).unwrap();

        assert_eq!(memory.location.as_deref(), Some("94103"));
        assert!(!memory.watch_alerts);
    }

    #[test]
    fn test_receive_last_location_wins() {
        let agent = agent_with(vec![]);
        let mut memory = ready_memory();

        let signal = InboundSignal::new(Some("10001".to_string()), None);
        agent.on_receive(&signal, &mut memory).unwrap();

        assert_eq!(memory.location.as_deref(), Some("10001"));
    }

    #[test]
    fn test_watch_state_is_overwritten_each_signal() {
        let agent = agent_with(vec![]);
        let mut memory = ready_memory();

        let stormy = InboundSignal::new(None, Some("Thunderstorm".to_string()));
        agent.on_receive(&stormy, &mut memory).unwrap();
        assert!(memory.watch_alerts);

        let clear = InboundSignal::new(None, Some("Sunny".to_string()));
        agent.on_receive(&clear, &mut memory).unwrap();
        assert!(!memory.watch_alerts);
        assert_eq!(memory.current_interval, Duration::from_secs(1800));
    }

    #[test]
    fn test_receive_uses_existing_have_alerts() {
        let agent = agent_with(vec![]);
        let mut memory = ready_memory();
        memory.have_alerts = true;

        let clear = InboundSignal::new(None, Some("Sunny".to_string()));
        agent.on_receive(&clear, &mut memory).unwrap();

        assert!(memory.have_alerts);
        assert_eq!(memory.current_interval, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_check_not_ready_without_key() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let config = AgentConfig {
            api_key: None,
            ..test_config()
        };
        let agent = AlertAgent::new(config, source.clone());
        let mut memory = ready_memory();

        let result = agent.on_check(&mut memory, Utc::now()).await;

        assert!(matches!(result, Err(AgentError::NotReady(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_not_ready_without_location() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let agent = AlertAgent::new(test_config(), source.clone());
        let mut memory = AgentMemory::new(&test_config());
        memory.location = Some(String::new());

        let result = agent.on_check(&mut memory, Utc::now()).await;

        assert!(matches!(result, Err(AgentError::NotReady(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_check_empty_alerts() {
        let agent = agent_with(vec![]);
        let mut memory = ready_memory();
        memory.have_alerts = true;
        memory.current_interval = Duration::from_secs(600);

        let outcome = agent.on_check(&mut memory, Utc::now()).await.unwrap();

        assert!(!outcome.emitted);
        assert!(outcome.payload.is_empty());
        assert!(!memory.have_alerts);
        assert_eq!(memory.current_interval, Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn test_check_with_alerts() {
        let agent = agent_with(vec![alert("HEA"), alert("TOR")]);
        let mut memory = ready_memory();
        let now = Utc::now();

        let outcome = agent.on_check(&mut memory, now).await.unwrap();

        assert!(outcome.emitted);
        assert_eq!(outcome.payload.len(), 2);
        assert_eq!(outcome.checked_at, now);
        assert!(memory.have_alerts);
        assert_eq!(memory.current_interval, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_check_twice_emits_twice() {
        let agent = agent_with(vec![alert("HEA")]);
        let mut memory = ready_memory();

        let first = agent.on_check(&mut memory, Utc::now()).await.unwrap();
        assert!(first.emitted);
        assert!(memory.have_alerts);

        let second = agent.on_check(&mut memory, Utc::now()).await.unwrap();
        assert!(second.emitted);
        assert!(memory.have_alerts);
    }

    #[tokio::test]
    async fn test_check_upstream_failure_leaves_memory() {
        let agent = AlertAgent::new(test_config(), Arc::new(FailingSource));
        let mut memory = ready_memory();
        memory.have_alerts = true;
        let before = memory.clone();

        let result = agent.on_check(&mut memory, Utc::now()).await;

        match result {
            Err(AgentError::UpstreamFailure(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("expected upstream failure, got {:?}", other),
        }
        assert_eq!(memory, before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_timeout_is_upstream_failure() {
        let agent = AlertAgent::new(test_config(), Arc::new(SlowSource))
            .with_fetch_timeout(Duration::from_secs(5));
        let mut memory = ready_memory();
        let before = memory.clone();

        let result = agent.on_check(&mut memory, Utc::now()).await;

        assert!(matches!(result, Err(AgentError::UpstreamFailure(_))));
        assert_eq!(memory, before);
    }

    #[test]
    fn test_working() {
        assert!(AlertAgent::working(true, false));
        assert!(!AlertAgent::working(true, true));
        assert!(!AlertAgent::working(false, false));
        assert!(!AlertAgent::working(false, true));
    }
}
