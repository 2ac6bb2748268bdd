use anyhow::Result;
use clap::{Parser, Subcommand};
use mnbudget_node::{cli, logging, NodeConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mnbudget")]
#[command(about = "Masternode budget governance - inspection tooling", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Network preset (mainnet, testnet, regtest)
    #[arg(short, long, default_value = "mainnet")]
    network: String,

    /// Verbosity level (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    ShowConfig,

    /// Show the next superblock after a height
    NextSuperblock {
        /// Current block height
        #[arg(long)]
        height: u64,
    },

    /// Proposals funded at the next superblock
    Projection {
        /// Node state file (JSON)
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Proposal details with derived status
    Info {
        /// Node state file (JSON)
        #[arg(short, long)]
        state: PathBuf,

        /// Single proposal by name
        #[arg(long, conflicts_with = "all")]
        name: Option<String>,

        /// Include invalid proposals
        #[arg(long)]
        all: bool,
    },

    /// Votes recorded on a proposal
    Votes {
        /// Node state file (JSON)
        #[arg(short, long)]
        state: PathBuf,

        /// Proposal name
        #[arg(long)]
        name: String,
    },

    /// Prune expired and invalid proposals
    Check {
        /// Node state file (JSON)
        #[arg(short, long)]
        state: PathBuf,

        /// Save the pruned budget back to the state file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = NodeConfig::load(cli.config.as_deref(), &cli.network)?;

    if let Err(e) = logging::init_logging(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        // Fall back to basic logging
        let level = logging::effective_level(&config.logging, cli.verbose);
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                logging::default_directives(level),
            ))
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let output = match cli.command {
        Commands::ShowConfig => {
            print!("{}", cli::handle_show_config(&config)?);
            return Ok(());
        }
        Commands::NextSuperblock { height } => cli::handle_next_superblock(&config, height),
        Commands::Projection { state } => cli::handle_projection(&config, &state).await?,
        Commands::Info { state, name, all } => {
            cli::handle_info(&config, &state, name, all).await?
        }
        Commands::Votes { state, name } => cli::handle_votes(&config, &state, &name).await?,
        Commands::Check { state, write } => cli::handle_check(&config, &state, write).await?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
