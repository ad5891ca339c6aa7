/*
 * SPDX-FileCopyrightText: 2020 Stalwart Labs Ltd <hello@stalw.art>
 *
 * SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-SEL
 */

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use lb_mimic::{LoadBalancerServer, LoadBalancerService, SimulatorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lb-mimic", version, about = "Cloud load balancer API simulator")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the configuration file
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let config = match &args.config {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SimulatorConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .context("invalid log level")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let listen = args.listen.unwrap_or_else(|| config.listen_addr());
    let service = LoadBalancerService::new(config)?;
    let server = LoadBalancerServer::bind(listen.as_str(), service)
        .await
        .with_context(|| format!("failed to bind {}", listen))?;

    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", err);
            }
        })
        .await?;

    Ok(())
}
