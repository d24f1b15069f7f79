pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod scheduler;

use crate::core::config::{self, AppConfig};
use crate::core::{BalanceStore, RateSource};
use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Startup overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config_path: Option<String>,
    pub period_minutes: Option<u64>,
    /// `CODE=AMOUNT` pairs replacing configured initial balances.
    pub amounts: Vec<String>,
}

/// Loads the configuration, applies command line overrides and validates it.
pub fn load_config(options: &RunOptions) -> Result<AppConfig> {
    let mut config = match options.config_path.as_deref() {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    if let Some(period) = options.period_minutes {
        config.scheduler.period_minutes = period;
    }
    for arg in &options.amounts {
        let (code, amount) = config::parse_amount(arg)?;
        config.balances.insert(code, amount);
    }

    config.validate()?;
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn run(config: AppConfig) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    serve(config, listener, shutdown_signal()).await
}

/// Runs the service on `listener` until `shutdown` resolves.
///
/// The background loops are stopped and awaited after the server has
/// drained, and only then is the rate source released.
pub async fn serve<F>(config: AppConfig, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = Arc::new(BalanceStore::new());
    store.init_balances(config.initial_balances()).await;

    let source: Arc<dyn RateSource> = Arc::new(providers::CbrRateSource::new(
        &config.providers.cbr.base_url,
        config.fetch_timeout(),
    )?);

    let settings = scheduler::SchedulerSettings {
        tracked: config.tracked_currencies(),
        reference: config.reference_currency.clone(),
        period: config.refresh_period(),
        print_interval: config.print_interval(),
    };
    let background = scheduler::RefreshScheduler::start(Arc::clone(&store), source, settings);

    let app = api::create_router(api::AppState::new(store, config.tracked_currencies()));
    info!("Server listening on {}", listener.local_addr()?);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    background.shutdown().await;
    served.context("Server error")?;
    info!("App finished");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
