pub mod alert_agent;
pub mod classifier;
pub mod error;
pub mod interval;
pub mod options;

pub use alert_agent::{AlertAgent, CheckOutcome};
pub use classifier::classify;
pub use error::AgentError;
pub use interval::{parse_schedule, select_interval};
pub use options::{
    AgentConfig, AgentOptions, CredentialResolver, EnvCredentials, StaticCredentials,
};
