use anyhow::{bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use stormwatch::agent::{AgentOptions, AlertAgent, EnvCredentials};
use stormwatch::api::{self, AppState};
use stormwatch::engine::{join_agents, spawn_agents, AgentRunner, CycleReport, Dispatcher};
use stormwatch::providers::wunderground::parse_alerts_response;
use stormwatch::providers::{AlertSource, StaticAlertSource, WundergroundProvider};
use stormwatch::storage::{InMemoryStore, PostgresStorage, Storage};
use stormwatch::types::{AgentId, InboundSignal};
use stormwatch::Config;

const SHORT_MESSAGE_LEN: usize = 140;

#[derive(Parser)]
#[command(name = "stormwatch")]
#[command(about = "Adaptive polling agent for severe weather alerts", long_about = None)]
#[command(version)]
struct Cli {
    /// Serve alerts from a saved Wunderground response instead of the live API
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run agents continuously and serve the HTTP API
    Run {
        #[arg(required = true, help = "Agent options files (.toml or .yaml)")]
        options: Vec<PathBuf>,
        #[arg(long, help = "API port (defaults to STORMWATCH_PORT or 3000)")]
        port: Option<u16>,
    },
    /// Poll the alert source once
    Check {
        #[arg(help = "Agent options file")]
        options: PathBuf,
    },
    /// Apply one forecast signal
    Receive {
        #[arg(help = "Agent options file")]
        options: PathBuf,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        conditions: Option<String>,
    },
    /// Report problems with options files
    Validate {
        #[arg(required = true)]
        options: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Run { options, port } => {
            run_agents(&config, cli.fixture.as_deref(), &options, port).await?
        }
        Commands::Check { options } => {
            let runner = build_runner(&config, cli.fixture.as_deref(), &options).await?;
            print_report(&runner.check(Utc::now()).await?)?;
        }
        Commands::Receive {
            options,
            location,
            conditions,
        } => {
            let runner = build_runner(&config, cli.fixture.as_deref(), &options).await?;
            let signal = InboundSignal::new(location, conditions);
            print_report(&runner.receive(&signal).await?)?;
        }
        Commands::Validate { options } => validate(&options)?,
    }

    Ok(())
}

async fn open_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    match &config.database_url {
        Some(url) => {
            let storage = PostgresStorage::new(url).await?;
            storage.run_migrations().await?;
            Ok(Arc::new(storage))
        }
        None => {
            log::warn!("DATABASE_URL not set; agent memory will not survive a restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

fn open_source(config: &Config, fixture: Option<&Path>) -> Result<Arc<dyn AlertSource>> {
    match fixture {
        Some(path) => {
            let body = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            Ok(Arc::new(StaticAlertSource::new(parse_alerts_response(body)?)))
        }
        None => Ok(Arc::new(WundergroundProvider::new(
            config.wunderground_base_url.clone(),
            config.fetch_timeout(),
        )?)),
    }
}

fn load_agent(
    config: &Config,
    source: Arc<dyn AlertSource>,
    path: &Path,
) -> Result<(AgentId, AlertAgent)> {
    let options = AgentOptions::from_file(path)?;
    let agent_id = options.id.unwrap_or_else(|| {
        let id = AgentId::new_v4();
        log::warn!("{} has no id; using {}", path.display(), id);
        id
    });

    let agent_config = options.resolve(&EnvCredentials)?;
    if !agent_config.key_setup() {
        log::warn!("Agent {} has no API key and will not poll", agent_id);
    }

    let agent = AlertAgent::new(agent_config, source).with_fetch_timeout(config.fetch_timeout());
    Ok((agent_id, agent))
}

async fn build_runner(config: &Config, fixture: Option<&Path>, path: &Path) -> Result<AgentRunner> {
    let storage = open_storage(config).await?;
    let source = open_source(config, fixture)?;
    let (agent_id, agent) = load_agent(config, source, path)?;
    Ok(AgentRunner::new(agent_id, agent, storage))
}

async fn run_agents(
    config: &Config,
    fixture: Option<&Path>,
    paths: &[PathBuf],
    port: Option<u16>,
) -> Result<()> {
    let storage = open_storage(config).await?;
    let source = open_source(config, fixture)?;

    let mut dispatcher = Dispatcher::new();
    let mut runners = Vec::with_capacity(paths.len());
    for path in paths {
        let (agent_id, agent) = load_agent(config, source.clone(), path)?;
        let signals = dispatcher.register(agent_id, agent.config().clone());
        runners.push((AgentRunner::new(agent_id, agent, storage.clone()), signals));
        log::info!("Loaded agent {} from {}", agent_id, path.display());
    }

    let shutdown = CancellationToken::new();
    let handles = spawn_agents(runners, shutdown.clone());
    let state = AppState {
        storage,
        dispatcher: Arc::new(dispatcher),
    };
    let port = port.unwrap_or(config.port);

    tokio::select! {
        result = api::serve(state, port) => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Shutting down"),
    }

    // Open connections may still hold the dispatcher, so stop runners explicitly.
    shutdown.cancel();
    join_agents(handles).await;
    Ok(())
}

fn validate(paths: &[PathBuf]) -> Result<()> {
    let mut failed = false;

    for path in paths {
        let options = AgentOptions::from_file(path)?;
        let errors = options.validate(&EnvCredentials);
        if errors.is_empty() {
            println!("{}: ok", path.display());
        } else {
            failed = true;
            for error in errors {
                println!("{}: {}", path.display(), error);
            }
        }
    }

    if failed {
        bail!("Invalid agent options");
    }
    Ok(())
}

fn print_report(report: &CycleReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&report.memory)?);
    println!("State: {}", report.memory.state().as_str());
    if let Some(event) = &report.event {
        println!("Emitted event {}:", event.id);
        for alert in event.alerts()? {
            println!(
                "  {} (expires {}): {}",
                alert.description,
                alert.expires_at.format("%m/%d %H:%M"),
                alert.short_message(SHORT_MESSAGE_LEN)
            );
        }
    }
    if let Some(error) = &report.error {
        println!("Skipped: {}", error);
    }
    Ok(())
}
