pub mod agent;
pub mod api;
pub mod config;
pub mod engine;
pub mod lifecycle;
pub mod providers;
pub mod storage;
pub mod types;

pub use agent::{AgentConfig, AgentError, AgentOptions, AlertAgent, CheckOutcome};
pub use config::Config;
pub use types::*;
