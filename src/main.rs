mod app;
mod data;
mod error;
mod processing;
mod service;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use state::app_state::{AppState, VERSION};
use state::config::Config;

#[derive(Debug, Parser)]
#[command(name = "signalstore")]
#[command(about = "HTTP service for storing and querying fixed-rate signal series")]
struct Args {
    /// TOML config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// JSON snapshot file. Without it signals live in memory only.
    #[arg(long)]
    store: Option<PathBuf>,
    #[arg(long)]
    max_samples: Option<usize>,
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path).map_err(|e| anyhow!(e))?,
            None => Config::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(store) = self.store {
            config.store_path = Some(store);
        }
        if let Some(max) = self.max_samples {
            config.max_signal_samples = max;
        }
        if let Some(ms) = self.timeout_ms {
            config.request_timeout_ms = ms;
        }
        config.validate().map_err(|e| anyhow!(e))?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let state = AppState::from_config(&config).map_err(|e| anyhow!(e))?;
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;

    tracing::info!(
        "signalstore {VERSION} listening on {} (max {} samples per signal, store: {})",
        config.bind,
        config.max_signal_samples,
        config
            .store_path
            .as_ref()
            .map_or_else(|| "memory".to_string(), |p| p.display().to_string())
    );

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("signalstore stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_defaults() {
        let args = Args::parse_from([
            "signalstore",
            "--bind",
            "0.0.0.0:9100",
            "--max-samples",
            "64",
        ]);
        let config = args.into_config().unwrap();
        assert_eq!(config.bind.port(), 9100);
        assert_eq!(config.max_signal_samples, 64);
        assert_eq!(config.store_path, None);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = Args::parse_from(["signalstore", "--timeout-ms", "0"]);
        assert!(args.into_config().is_err());
    }
}
