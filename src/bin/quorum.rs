#![forbid(unsafe_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quorum_harness::events::EventBus;
use quorum_harness::gateway::ProviderGateway;
use quorum_harness::metrics::MetricsRegistry;
use quorum_harness::server::{serve, AppState};
use quorum_harness::store::TraceStore;
use quorum_harness::swarm::{ActiveSwarms, SwarmConfig, SwarmEngine};

#[derive(Parser)]
#[command(name = "quorum", version, about = "Bayesian swarm mission orchestration server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server (default)
    Serve {
        /// Port to listen on
        #[arg(long, default_value_t = 3000)]
        port: u16,
        /// Directory for persisted traces
        #[arg(long)]
        trace_dir: Option<PathBuf>,
    },
}

fn resolve_trace_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var("QUORUM_TRACE_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data/traces"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (port, trace_dir) = match cli.command {
        Some(Commands::Serve { port, trace_dir }) => (port, trace_dir),
        None => (
            std::env::var("QUORUM_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            None,
        ),
    };
    let trace_dir = resolve_trace_dir(trace_dir);

    let metrics = Arc::new(MetricsRegistry::new());
    let gateway = Arc::new(ProviderGateway::from_env(metrics.clone())?);
    let store = Arc::new(TraceStore::open(&trace_dir));
    let bus = Arc::new(EventBus::new());
    let swarms = Arc::new(ActiveSwarms::new());

    let engine = Arc::new(SwarmEngine::new(
        gateway,
        store.clone(),
        bus.clone(),
        metrics.clone(),
        swarms.clone(),
        SwarmConfig::from_env(),
    ));

    let state = Arc::new(AppState::new(engine, store, bus, metrics, swarms));
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    serve(state, addr).await?;

    Ok(())
}
