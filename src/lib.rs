pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use anyhow::Result;
use std::net::SocketAddr;
use tracing::{debug, info};

pub enum AppCommand {
    Serve { listen: Option<SocketAddr> },
}

/// Loads the configuration. An explicit path must exist; either way the
/// environment overrides secrets.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => {
            let mut config = AppConfig::load_from_path(path)?;
            dotenvy::dotenv().ok();
            config.apply_env(|name| std::env::var(name).ok());
            Ok(config)
        }
        None => AppConfig::load(),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Tripboard starting...");

    let mut config = load_config(config_path)?;

    match command {
        AppCommand::Serve { listen } => {
            if let Some(addr) = listen {
                config.server.listen_addr = addr;
            }
            debug!(listen_addr = %config.server.listen_addr, "Loaded config");
            cli::serve::serve(&config).await
        }
    }
}
