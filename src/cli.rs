use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wlanauth", about = "Captive-portal login daemon for campus wireless LAN")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check once whether the network is online, behind the portal, or unknown
    Probe,
    /// Run the portal login sequence once
    Login,
    /// Keep checking and log in whenever the portal blocks traffic
    Watch,
}
