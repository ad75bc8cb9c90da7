use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ovsnet::commands::{build_plugin, run_pod_action, PodAction};
use ovsnet::config::PluginConfig;
use ovsnet::local::LocalState;

/// A command line tool to drive the OVS network plugin on this node
#[derive(Parser)]
#[command(name = "ovsnet-ctl", author, version, about)]
struct Cli {
    /// Path to the plugin configuration
    #[arg(long, default_value = "/etc/ovsnet/ovsnet.json")]
    config: PathBuf,

    /// Path to the local state file, overriding the configuration
    #[arg(long)]
    state: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct PodArgs {
    /// Pod namespace
    #[arg(long)]
    namespace: String,

    /// Pod name
    #[arg(long)]
    name: String,

    /// Infrastructure container ID
    #[arg(long)]
    container_id: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plugin name
    Name,

    /// Start the master side (subnet and VNID allocation)
    StartMaster,

    /// Start the node side, resyncing local pods if the subnet changed
    StartNode {
        /// Treat the node subnet as changed since the last start
        #[arg(long)]
        changed: bool,
    },

    /// Set up a pod's network
    Setup(PodArgs),

    /// Tear down a pod's network
    Teardown(PodArgs),

    /// Re-apply a pod's VNID
    Update(PodArgs),

    /// Show a pod's network status
    Status(PodArgs),
}

async fn run(cli: Cli) -> Result<()> {
    let config = PluginConfig::load(&cli.config)?;
    let state_path = cli.state.unwrap_or_else(|| config.state_file.clone());
    let state = LocalState::load(&state_path)?;

    let changed = matches!(cli.command, Commands::StartNode { changed: true });
    let plugin = build_plugin(&config, state, changed);

    let (action, pod) = match cli.command {
        Commands::Name => {
            println!("{}", plugin.name());
            return Ok(());
        }
        Commands::StartMaster => {
            plugin
                .start_master(config.cluster_network, config.host_subnet_length)
                .await
                .context("Failed to start master")?;
            println!("{} master started", plugin.name());
            return Ok(());
        }
        Commands::StartNode { .. } => {
            plugin
                .start_node(config.mtu)
                .await
                .context("Failed to start node")?;
            println!("{} node started (mtu {})", plugin.name(), config.mtu);
            return Ok(());
        }
        Commands::Setup(pod) => (PodAction::Setup, pod),
        Commands::Teardown(pod) => (PodAction::Teardown, pod),
        Commands::Update(pod) => (PodAction::Update, pod),
        Commands::Status(pod) => (PodAction::Status, pod),
    };

    run_pod_action(
        &plugin,
        &config,
        action,
        &pod.namespace,
        &pod.name,
        &pod.container_id,
    )
    .await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging based on verbosity
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")?;

    if let Err(err) = run(cli).await {
        error!("ovsnet-ctl error: {:#}", err);
        std::process::exit(1);
    }

    Ok(())
}
