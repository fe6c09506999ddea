//! Failures raised by the alert agent core.
//!
//! None of these are fatal: every variant means "skip this cycle and try
//! again on the next scheduled tick".

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("Signal carried neither a location nor conditions")]
    InvalidSignal,

    #[error("No location known yet; alerts cannot be queried")]
    MissingLocation,

    #[error("Agent not ready: {0}")]
    NotReady(String),

    #[error("Upstream alert source failed: {0}")]
    UpstreamFailure(String),
}

impl AgentError {
    /// Whether the runner should keep the memory produced alongside this error.
    /// Upstream failures leave memory exactly as it was before the call.
    pub fn keeps_partial_memory(&self) -> bool {
        matches!(self, AgentError::InvalidSignal | AgentError::MissingLocation)
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            AgentError::InvalidSignal | AgentError::UpstreamFailure(_) => log::Level::Warn,
            AgentError::MissingLocation | AgentError::NotReady(_) => log::Level::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AgentError::NotReady("api_key is not configured".to_string()).to_string(),
            "Agent not ready: api_key is not configured"
        );
        assert_eq!(
            AgentError::UpstreamFailure("timed out".to_string()).to_string(),
            "Upstream alert source failed: timed out"
        );
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(AgentError::InvalidSignal.log_level(), log::Level::Warn);
        assert_eq!(AgentError::MissingLocation.log_level(), log::Level::Info);
        assert_eq!(
            AgentError::NotReady(String::new()).log_level(),
            log::Level::Info
        );
    }

    #[test]
    fn test_keeps_partial_memory() {
        assert!(AgentError::InvalidSignal.keeps_partial_memory());
        assert!(AgentError::MissingLocation.keeps_partial_memory());
        assert!(!AgentError::NotReady(String::new()).keeps_partial_memory());
        assert!(!AgentError::UpstreamFailure(String::new()).keeps_partial_memory());
    }
}
