use std::path::PathBuf;

use anyhow::Context;
use cidgate_server::config::config_path_from_env;
use cidgate_server::{GatekeeperConfig, GatekeeperServer, ServerConfig};
use colored::Colorize;
use tracing::info;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        None => cmd_serve(ServeArgs::default()).await,
        Some(Command::Serve(args)) => cmd_serve(args).await,
        Some(Command::CheckConfig(args)) => cmd_check_config(args),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<(PathBuf, GatekeeperConfig)> {
    let path = path.unwrap_or_else(config_path_from_env);
    let config = GatekeeperConfig::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;
    Ok((path, config))
}

fn server_config(bind: Option<std::net::SocketAddr>) -> anyhow::Result<ServerConfig> {
    let mut config = ServerConfig::from_env().context("reading PORT/ADDRESS")?;
    if let Some(bind) = bind {
        config.bind_addr = bind;
    }
    Ok(config)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let (path, gatekeeper) = load_config(args.config)?;
    let config = server_config(args.bind)?;
    info!(
        config = %path.display(),
        root = %gatekeeper.ipfs_mfs_root,
        kubo = %gatekeeper.kubo_client.url,
        "starting cidgate"
    );
    GatekeeperServer::from_config(config, &gatekeeper)?
        .serve()
        .await?;
    Ok(())
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<()> {
    let (path, gatekeeper) = load_config(args.config)?;
    let config = server_config(None)?;

    println!("{} Configuration OK: {}", "✓".green().bold(), path.display().to_string().bold());
    println!("  Root: {}", gatekeeper.ipfs_mfs_root.yellow());
    println!("  Kubo: {}", gatekeeper.kubo_client.url.cyan());
    for name in gatekeeper.kubo_client.headers.keys() {
        println!("    header {}", name);
    }
    let users: Vec<&str> = gatekeeper.basic_auth_users.keys().map(String::as_str).collect();
    println!("  Users: {}", users.join(", "));
    println!("  Listen: {}", config.bind_addr.to_string().bold());
    Ok(())
}
