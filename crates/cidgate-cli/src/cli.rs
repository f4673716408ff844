use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cidgate",
    about = "Authenticated HTTP gatekeeper for a content-addressed directory",
    version
)]
pub struct Cli {
    /// Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Validate the configuration and print the resolved settings
    CheckConfig(CheckConfigArgs),
}

#[derive(Args, Default)]
pub struct ServeArgs {
    /// Config file; defaults to $CONFIG, then ./config.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Listen address; defaults to $ADDRESS:$PORT, then 0.0.0.0:8080
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
