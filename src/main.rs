mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::warn;

use wlanauth_core::config::AppConfig;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config).unwrap_or_else(|_| {
        warn!(path = %cli.config, "config file not found, using defaults");
        include_str!("../config/default.toml").to_string()
    });
    let mut config: AppConfig = toml::from_str(&config_str)?;
    apply_env_overrides(&mut config);
    config.validate()?;

    match cli.command {
        Commands::Probe => commands::probe::run(config).await?,
        Commands::Login => commands::login::run(config).await?,
        Commands::Watch => commands::watch::run(config).await?,
    }

    Ok(())
}

fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(v) = std::env::var("WLANAUTH_USERNAME") {
        config.credentials.username = v;
    }
    if let Ok(v) = std::env::var("WLANAUTH_PASSWORD") {
        config.credentials.password = v;
    }
    if let Ok(v) = std::env::var("WLANAUTH_VERIFY_TLS") {
        config.portal.verify_tls = v != "0" && v.to_lowercase() != "false";
    }
    if let Ok(v) = std::env::var("WLANAUTH_PROXY") {
        config.probe.proxy = v;
    }
}
