mod config;

use clap::{Parser, Subcommand};
use conductor_agent::build_capability;
use conductor_core::AgentCapability;
use conductor_gateway::{AuthConfig, GatewayServer};
use conductor_mcp::{McpServer, ToolGateway, MANAGEMENT_TOOL_NAMES};
use conductor_orchestrator::{AgentDescriptor, AgentRegistry, Dispatcher, TaskBook};
use config::ConductorConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "conductor",
    about = "Conductor — multi-agent task orchestration over MCP"
)]
struct Cli {
    #[arg(short, long, default_value = "conductor.toml")]
    config: PathBuf,

    /// Log at debug level regardless of `server.log_level`.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Inspect configured agents
    Agents {
        #[command(subcommand)]
        action: ListAction,
    },
    /// Inspect the tools the server would expose
    Tools {
        #[command(subcommand)]
        action: ListAction,
    },
}

#[derive(Subcommand)]
enum ListAction {
    /// List entries
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ConductorConfig::load(&cli.config)?;

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.server.log_level.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .json()
        .init();

    match cli.command {
        Commands::Serve { host, port } => serve(config, host, port).await?,
        Commands::Agents {
            action: ListAction::List,
        } => {
            let registry = build_registry(&config);
            println!("Registered agents ({}):", registry.len());
            for desc in registry.list() {
                println!(
                    "  {} [{}] — {} (tags: {}; concurrency: {})",
                    desc.name,
                    desc.role,
                    desc.description,
                    desc.tags.join(", "),
                    desc.max_concurrency
                );
            }
        }
        Commands::Tools {
            action: ListAction::List,
        } => {
            let gateway = ToolGateway::new(Arc::new(build_registry(&config)));
            let tools = gateway.list_tools();
            println!("Exposed tools ({}):", tools.len());
            for tool in tools {
                println!("  {} — {}", tool.name, tool.description);
            }
        }
    }

    Ok(())
}

async fn serve(
    config: ConductorConfig,
    host: Option<String>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let registry = Arc::new(build_registry(&config));
    if registry.is_empty() {
        warn!("No agents registered; only management tools will be served");
    }

    let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
    let workers = dispatcher.start();
    info!(agents = registry.len(), workers, "Dispatcher started");

    let gateway = Arc::new(
        ToolGateway::new(registry)
            .with_shutdown(dispatcher.shutdown_listener())
            .with_call_mode(config.server.call_mode)
            .with_identity(&config.server.name, &config.server.description),
    );
    let auth = AuthConfig::new(config.security.api_keys.clone());
    if auth.is_enabled() {
        info!(keys = auth.api_keys.len(), "API key auth enabled on /mcp");
    }
    let app = GatewayServer::build_with_auth(McpServer::new(gateway), auth);

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{host}:{port}");
    info!(
        server = %config.server.name,
        call_mode = ?config.server.call_mode,
        "Starting Conductor on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}"))?;
    // Blocked sync calls only return once the dispatcher has stopped.
    let stop = {
        let dispatcher = dispatcher.clone();
        async move {
            shutdown_signal().await;
            dispatcher.shutdown().await;
        }
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(stop)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Registers every configured agent whose backend can be built. Agents that
/// fail (bad backend, invalid descriptor, duplicate name) are logged and
/// skipped so the rest of the server still starts.
fn build_registry(config: &ConductorConfig) -> AgentRegistry {
    let book = match config.queue.task_history_limit {
        Some(limit) => TaskBook::with_history_limit(limit),
        None => TaskBook::new(),
    };
    let registry =
        AgentRegistry::with_task_book(Arc::new(book)).with_reserved_names(MANAGEMENT_TOOL_NAMES);

    let mut agents: Vec<(AgentDescriptor, Arc<dyn AgentCapability>)> = Vec::new();
    for agent in &config.agents {
        match build_capability(&agent.backend) {
            Ok(capability) => agents.push((agent.descriptor(&config.queue), capability)),
            Err(e) => error!(agent = %agent.name, error = %e, "Skipping agent: backend unavailable"),
        }
    }

    for outcome in registry.register_batch(agents) {
        if let Err(e) = outcome.result {
            warn!(agent = %outcome.name, error = %e, "Agent registration failed");
        }
    }
    registry
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
