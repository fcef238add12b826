use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Streams dubbed audio for online videos as HLS
#[derive(Debug, Parser)]
#[command(name = "dubcast", about = "Dubbed audio tracks for online videos, served as HLS")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "dubcast.toml", env = "DUBCAST_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "DUBCAST_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Default log filter when `RUST_LOG` is unset
    #[arg(long, default_value = "info", env = "DUBCAST_LOG")]
    pub log: String,
}
