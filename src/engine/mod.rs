pub mod dispatcher;
pub mod runner;

pub use dispatcher::{join_agents, spawn_agents, Dispatcher};
pub use runner::{AgentRunner, CycleReport};
