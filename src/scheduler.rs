//! Background loops: periodic rate refresh and periodic snapshot logging.
//!
//! Both loops share one cancellation token. Cancelling interrupts an
//! in-flight sleep or fetch, and [`RefreshScheduler::shutdown`] waits for both
//! tasks to finish before returning.

use crate::core::{BalanceStore, CurrencyCode, RateSource, RateSourceError};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub tracked: BTreeSet<CurrencyCode>,
    pub reference: CurrencyCode,
    pub period: Duration,
    pub print_interval: Duration,
}

/// Fetches rates for every tracked currency except the reference one and,
/// on success, replaces the store's rate table. The reference currency is
/// always added with a rate of exactly 1.
pub async fn refresh_rates(
    store: &BalanceStore,
    source: &dyn RateSource,
    tracked: &BTreeSet<CurrencyCode>,
    reference: &CurrencyCode,
) -> Result<(), RateSourceError> {
    let requested: BTreeSet<CurrencyCode> = tracked
        .iter()
        .filter(|code| *code != reference)
        .cloned()
        .collect();

    let mut rates = source.fetch_rates(&requested).await?;
    rates.insert(reference.clone(), Decimal::ONE);
    info!("Fetched rates: {:?}", rates);
    store.set_rates(rates).await;
    Ok(())
}

async fn fetch_loop(
    store: Arc<BalanceStore>,
    source: Arc<dyn RateSource>,
    settings: SchedulerSettings,
    token: CancellationToken,
) {
    debug!(period = ?settings.period, "Rate refresh loop started");
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = refresh_rates(&store, source.as_ref(), &settings.tracked, &settings.reference) => {
                if let Err(e) = result {
                    warn!(error = %e, "Rate refresh failed, keeping previous rates");
                }
            }
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(settings.period) => {}
        }
    }
    debug!("Rate refresh loop stopped");
}

async fn print_loop(store: Arc<BalanceStore>, interval: Duration, token: CancellationToken) {
    debug!(?interval, "Snapshot loop started");
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                info!("{}", store.render_text().await);
            }
        }
    }
    debug!("Snapshot loop stopped");
}

pub struct RefreshScheduler {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl RefreshScheduler {
    /// Spawns the refresh and snapshot loops on the current runtime.
    pub fn start(
        store: Arc<BalanceStore>,
        source: Arc<dyn RateSource>,
        settings: SchedulerSettings,
    ) -> Self {
        let token = CancellationToken::new();
        let print_interval = settings.print_interval;

        let fetch_task = tokio::spawn(fetch_loop(
            Arc::clone(&store),
            source,
            settings,
            token.child_token(),
        ));
        let print_task = tokio::spawn(print_loop(store, print_interval, token.child_token()));

        RefreshScheduler {
            token,
            tasks: vec![fetch_task, print_task],
        }
    }

    /// Cancels both loops and waits until they have exited.
    pub async fn shutdown(self) {
        self.token.cancel();
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                error!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Background tasks stopped");
    }
}
