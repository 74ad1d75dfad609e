use anyhow::Result;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use tripboard::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for tripboard::AppCommand {
    fn from(cmd: Commands) -> tripboard::AppCommand {
        match cmd {
            Commands::Serve { listen } => tripboard::AppCommand::Serve { listen },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, overriding the configuration
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Serve { listen: None });
    let result = match command {
        Commands::Setup => match cli.config_path.as_deref() {
            Some(path) => tripboard::cli::setup::setup_at_path(path),
            None => tripboard::cli::setup::setup(),
        },
        cmd => tripboard::run_command(cmd.into(), cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
