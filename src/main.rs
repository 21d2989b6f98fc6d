// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lookout::config::Config;
use lookout::icinga::{wait_for_icinga, IcingaApi, IcingaClient, IcingaConfig};
use lookout::kubernetes::register_crds;
use lookout::operator::{shutdown_signal, Operator};

#[derive(Parser)]
#[command(name = "lookout", version, about = "Provisions Icinga2 monitoring from Kubernetes alert resources")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the operator until SIGINT or SIGTERM
    Run,
    /// Print the effective Icinga connection settings
    Configure {
        #[arg(long, env = "ICINGA_CONFIG_FILE")]
        config: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    match Cli::parse().command {
        Command::Run => run().await,
        Command::Configure { config } => configure(config),
    }
}

async fn run() -> Result<()> {
    info!("Starting Lookout operator");

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: workers={}, incident_ttl={}",
        config.workers,
        humantime::format_duration(config.incident_ttl)
    );

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    register_crds(&client).await.context("Failed to register CRDs")?;

    let icinga_config = IcingaConfig::load(&config.icinga_config_file)?;
    let icinga: Arc<dyn IcingaApi> = Arc::new(IcingaClient::new(&icinga_config)?);

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            shutdown_signal().await;
            token.cancel();
        }
    });

    info!("Waiting for Icinga at {}...", icinga_config.endpoint);
    wait_for_icinga(icinga.as_ref(), &token).await?;

    Operator::new(client, config, icinga).run(token).await
}

fn configure(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| Config::default().icinga_config_file);
    let icinga_config = IcingaConfig::load(&path)
        .with_context(|| format!("Failed to load Icinga configuration from {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&icinga_config.redacted())?);
    Ok(())
}
