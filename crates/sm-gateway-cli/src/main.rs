//! SM Gateway CLI
//!
//! The `smgw` command drives the gateway core against a state store and the
//! local SM engine.
//!
//! ## Commands
//!
//! - `node-command`: dispatch an administrative action on a node
//! - `swact-check`: run the swact pre-check only
//! - `lock-check`: run the lock pre-check only
//! - `node-status`: report a node's state and hosted services
//! - `seed`: load a JSON state snapshot into a SurrealDB store

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sm_gateway_core::{
    CommandDispatcher, CommandResponse, CommandResult, GatewayConfig, NodeAction, NodeCommand,
    RequestContext,
};
use sm_state::{StateSnapshot, StateStore, SurrealStateStore};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "smgw")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Service Management gateway", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Gateway config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SurrealDB endpoint holding the SM tables (mem://, surrealkv://, ws://)
    #[arg(long, global = true, env = "SM_GATEWAY_DB_URL", default_value = "mem://")]
    db: String,

    /// Seed an in-memory store from this JSON snapshot instead of using --db
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    /// Hostname of this node (overrides config)
    #[arg(long, global = true)]
    local_hostname: Option<String>,

    /// Engine socket path (overrides config)
    #[arg(long, global = true)]
    engine_socket: Option<PathBuf>,

    /// Token forwarded to peer gateways
    #[arg(long, global = true)]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch an administrative action on a node
    NodeCommand {
        /// Target node
        hostname: String,

        /// lock, lock-pre-check, lock-force, unlock, swact, swact-pre-check, swact-force, event
        #[arg(short, long)]
        action: String,

        #[arg(long, default_value = "mtce")]
        origin: String,

        /// Requested administrative state
        #[arg(long)]
        admin: String,

        /// Requested operational state
        #[arg(long)]
        oper: String,

        /// Requested availability status
        #[arg(long, default_value = "available")]
        avail: String,
    },

    /// Check whether service can move away from a node
    SwactCheck {
        hostname: String,

        #[arg(long, default_value = "mtce")]
        origin: String,
    },

    /// Check whether a node can be locked without losing a critical service
    LockCheck {
        hostname: String,

        #[arg(long, default_value = "mtce")]
        origin: String,
    },

    /// Report a node's state and whether it hosts active services
    NodeStatus { hostname: String },

    /// Load a JSON state snapshot into the --db store
    Seed {
        /// Snapshot file
        file: PathBuf,
    },
}

/// What `node-command` and the check commands print.
#[derive(Debug, Serialize)]
struct CommandOutput {
    status: u16,
    #[serde(flatten)]
    result: CommandResult,
}

impl From<CommandResponse> for CommandOutput {
    fn from(response: CommandResponse) -> Self {
        Self {
            status: response.status.as_u16(),
            result: response.result,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    sm_gateway_core::telemetry::init_tracing(cli.json, level);

    let response = match &cli.command {
        Commands::NodeCommand {
            hostname,
            action,
            origin,
            admin,
            oper,
            avail,
        } => {
            let (dispatcher, ctx) = gateway(&cli).await?;
            let command = NodeCommand::new(origin, action, admin, oper, avail);
            cmd_node_command(&dispatcher, hostname, &command, &ctx).await?
        }
        Commands::SwactCheck { hostname, origin } => {
            let (dispatcher, ctx) = gateway(&cli).await?;
            cmd_pre_check(&dispatcher, hostname, NodeAction::SwactPreCheck, origin, &ctx).await?
        }
        Commands::LockCheck { hostname, origin } => {
            let (dispatcher, ctx) = gateway(&cli).await?;
            cmd_pre_check(&dispatcher, hostname, NodeAction::LockPreCheck, origin, &ctx).await?
        }
        Commands::NodeStatus { hostname } => {
            let (dispatcher, _) = gateway(&cli).await?;
            let status = dispatcher.node_status(hostname).await;
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(ExitCode::SUCCESS);
        }
        Commands::Seed { file } => {
            cmd_seed(&cli.db, file).await?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let success = response.status.is_success();
    println!(
        "{}",
        serde_json::to_string_pretty(&CommandOutput::from(response))?
    );
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Dispatcher and request context for the commands that talk to the engine.
async fn gateway(cli: &Cli) -> Result<(CommandDispatcher, RequestContext)> {
    let config = resolve_config(cli)?;
    let store = open_store(&cli.db, cli.snapshot.as_deref()).await?;
    let dispatcher =
        CommandDispatcher::from_config(&config, store).context("Failed to initialise gateway")?;
    let ctx = cli
        .auth_token
        .clone()
        .map(RequestContext::with_auth_token)
        .unwrap_or_default();
    Ok((dispatcher, ctx))
}

/// Config file and `SM_GATEWAY_*` env, then flags.
fn resolve_config(cli: &Cli) -> Result<GatewayConfig> {
    let mut config = GatewayConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    if let Some(hostname) = &cli.local_hostname {
        config.local_hostname = hostname.clone();
    }
    if config.local_hostname.is_empty() {
        if let Ok(hostname) = std::env::var("HOSTNAME") {
            config.local_hostname = hostname;
        }
    }
    if let Some(path) = &cli.engine_socket {
        config.engine_socket_path = path.clone();
    }
    if let Some(token) = &cli.auth_token {
        config.auth_token = Some(token.clone());
    }

    config.validate().context("Invalid gateway config")?;
    Ok(config)
}

async fn open_store(db: &str, snapshot: Option<&Path>) -> Result<Arc<dyn StateStore>> {
    let store = match snapshot {
        Some(path) => {
            let store = SurrealStateStore::in_memory()
                .await
                .context("Failed to open in-memory store")?;
            let snapshot = read_snapshot(path)?;
            store
                .load_snapshot(&snapshot)
                .await
                .context("Failed to load snapshot")?;
            store
        }
        None => SurrealStateStore::connect(db)
            .await
            .with_context(|| format!("Failed to connect to state store at {db}"))?,
    };
    Ok(Arc::new(store))
}

fn read_snapshot(path: &Path) -> Result<StateSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    StateSnapshot::from_json(&raw).with_context(|| format!("Invalid snapshot {}", path.display()))
}

async fn cmd_node_command(
    dispatcher: &CommandDispatcher,
    hostname: &str,
    command: &NodeCommand,
    ctx: &RequestContext,
) -> Result<CommandResponse> {
    info!(hostname = %hostname, action = %command.action, "dispatching node command");
    dispatcher
        .dispatch(hostname, command, ctx)
        .await
        .context("Command rejected")
}

async fn cmd_pre_check(
    dispatcher: &CommandDispatcher,
    hostname: &str,
    action: NodeAction,
    origin: &str,
    ctx: &RequestContext,
) -> Result<CommandResponse> {
    let command = NodeCommand::new(origin, action.as_str(), "", "", "");
    cmd_node_command(dispatcher, hostname, &command, ctx).await
}

async fn cmd_seed(db: &str, file: &Path) -> Result<()> {
    let snapshot = read_snapshot(file)?;
    let store = SurrealStateStore::connect(db)
        .await
        .with_context(|| format!("Failed to connect to state store at {db}"))?;
    store
        .load_snapshot(&snapshot)
        .await
        .context("Failed to load snapshot")?;

    println!(
        "Seeded {} nodes, {} assignments, {} services into {db}",
        snapshot.nodes.len(),
        snapshot.assignments.len(),
        snapshot.services.len()
    );
    Ok(())
}
