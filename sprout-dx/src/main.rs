//! sprout-dx: plant diagnosis service
//!
//! Classifies uploaded plant photos with one or more model backends, tiers
//! the result by confidence, and enriches it with treatment advice, care
//! guides and growth predictions.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use sprout_common::config::{write_toml_config, ConfigFileResolver};
use sprout_common::logging::init_tracing;
use sprout_dx::backends::ClassifierRegistry;
use sprout_dx::config::DxConfig;
use sprout_dx::generators::build_generators;
use sprout_dx::pipeline::DiagnosisPipeline;
use sprout_dx::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "sprout-dx")]
#[command(about = "Plant diagnosis service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long, env = "SPROUT_CONFIG")]
    config: Option<PathBuf>,

    /// Override server.port
    #[arg(short, long, env = "SPROUT_DX_PORT")]
    port: Option<u16>,

    /// Override server.host
    #[arg(long, env = "SPROUT_DX_HOST")]
    host: Option<String>,

    /// Write the default configuration to this path and exit
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_default_config {
        write_toml_config(&DxConfig::default(), path)
            .with_context(|| format!("Failed to write default config to {}", path.display()))?;
        println!("Default configuration written to {}", path.display());
        return Ok(());
    }

    let config_path = ConfigFileResolver::new("sprout-dx").resolve(args.config.as_deref());
    let mut config = DxConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    init_tracing(&config.logging, "sprout_dx").context("Failed to initialize logging")?;

    match &config_path {
        Some(path) if !path.exists() => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!(
        "Starting sprout-dx v{} on {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.server.host,
        config.server.port
    );

    let registry = Arc::new(
        ClassifierRegistry::from_config(&config.backends, config.pool.backend_timeout())
            .context("Failed to build classifier registry")?,
    );
    let loaded = registry.initialize_all().await;
    if loaded == 0 {
        warn!("No classifier backend could be loaded; requests will fail until one is reachable");
    } else {
        info!("{}/{} classifier backends loaded", loaded, registry.len());
    }

    let generators = build_generators(&config).context("Failed to build generators")?;
    let pipeline = Arc::new(DiagnosisPipeline::new(&config, registry, generators));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let app = build_router(AppState::new(pipeline, Arc::new(config)));

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
