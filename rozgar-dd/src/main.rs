//! District Data (rozgar-dd) - Main entry point
//!
//! HTTP microservice serving district employment-program statistics with
//! live/synthetic provenance and GPS-based district lookup.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rozgar_common::config::{default_config_path, load_toml_or_default, LoggingConfig};
use rozgar_common::time::SystemClock;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rozgar_dd::catalog::RegionCatalog;
use rozgar_dd::config::{ServiceConfig, MODULE_NAME};
use rozgar_dd::services::{
    DataGovClient, DistrictDataService, LiveDataFlags, ResolutionCache, SourceCascade,
};
use rozgar_dd::{build_router, AppState};

/// Command-line arguments for rozgar-dd
#[derive(Parser, Debug)]
#[command(name = "rozgar-dd")]
#[command(about = "District data resolution service for Rozgar")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides config file and ROZGAR_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to TOML config file
    #[arg(short, long, env = "ROZGAR_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(MODULE_NAME));
    let (mut config, origin): (ServiceConfig, _) = load_toml_or_default(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    config.apply_env_overrides();
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(&config.logging)?;

    info!(
        "Starting Rozgar District Data (rozgar-dd) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if origin.is_defaults() {
        warn!(
            "Config file {} not found, using compiled defaults",
            origin.path().display()
        );
    } else {
        info!("Loaded configuration from {}", origin.path().display());
    }

    let catalog = match &config.catalog_path {
        Some(path) => RegionCatalog::from_json_file(path)
            .with_context(|| format!("Failed to load region catalog {}", path.display()))?,
        None => RegionCatalog::builtin(),
    };
    info!("Region catalog: {} regions", catalog.len());

    let cache = ResolutionCache::new(
        Duration::from_secs(config.cache.ttl_secs),
        Arc::new(SystemClock),
    );
    if let Some(path) = &config.cache.snapshot_path {
        if let Err(e) = cache.load_snapshot(path).await {
            warn!("Ignoring unreadable cache snapshot {}: {}", path.display(), e);
        }
    }

    let upstream = &config.upstream;
    let flags = LiveDataFlags {
        real_data_enabled: upstream.use_real_data,
        api_key_configured: upstream.is_api_key_configured(),
    };
    let mut service = DistrictDataService::new(catalog, cache)
        .with_default_period(upstream.periods.first().cloned())
        .with_flags(flags);

    if flags.live_lookups() {
        let client = Arc::new(
            DataGovClient::new(upstream.client_settings())
                .context("Failed to initialize upstream client")?,
        );
        if let Some(first) = upstream.candidates.iter().min_by_key(|c| c.priority) {
            let report = client.probe(first).await;
            if report.success {
                info!(
                    "Upstream probe ok: {} returned {} record(s)",
                    first.name, report.record_count
                );
            } else {
                warn!(
                    "Upstream probe failed for {}: {}",
                    first.name,
                    report.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        let cascade =
            SourceCascade::new(client, upstream.candidates.clone(), upstream.cascade_policy());
        service = service.with_cascade(cascade, upstream.resolution_timeout());
        info!(
            "Live data enabled: {} candidate source(s), periods {:?}",
            upstream.candidates.len(),
            upstream.periods
        );
    } else if upstream.use_real_data {
        warn!("Real data requested but no valid API key configured; serving synthetic data");
    } else {
        info!("Live data disabled; serving synthetic data");
    }

    let service = Arc::new(service);
    let app = build_router(AppState::new(service.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(path) = &config.cache.snapshot_path {
        if let Err(e) = service.cache().save_snapshot(path).await {
            warn!("Failed to save cache snapshot {}: {}", path.display(), e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// RUST_LOG wins; otherwise the configured level applies to this service
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &logging.level;
        EnvFilter::try_new(format!(
            "rozgar_dd={level},rozgar_common={level},tower_http={level}"
        ))
        .unwrap_or_else(|_| EnvFilter::new("info"))
    });

    let file_layer = match &logging.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
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
