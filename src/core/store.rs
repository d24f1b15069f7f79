//! Authoritative in-memory balances and the latest exchange rates.
use crate::core::currency::{CurrencyCode, RateTable};
use crate::core::error::StoreError;
use crate::core::summary::{self, Summary};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct StoreState {
    balances: BTreeMap<CurrencyCode, Decimal>,
    rates: RateTable,
    changed: bool,
}

impl StoreState {
    fn summary(&self) -> Summary {
        summary::summarize(&self.balances, &self.rates)
    }

    fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Logs the current state once per change and clears the dirty flag.
    fn log_changed(&mut self) {
        if self.changed {
            info!("Currency changed:\n{}", self.summary().render_text());
            self.changed = false;
        }
    }
}

/// Owns balances, rates and the change flag behind a single lock, so every
/// batch is applied and observed as a whole.
#[derive(Debug, Default)]
pub struct BalanceStore {
    state: RwLock<StoreState>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all balances. Not reported as a change.
    pub async fn init_balances(&self, initial: BTreeMap<CurrencyCode, Decimal>) {
        let mut state = self.state.write().await;
        state.balances = initial;
        debug!("Initialized {} balances", state.balances.len());
    }

    pub async fn get_balance(&self, code: &CurrencyCode) -> Result<Decimal, StoreError> {
        let state = self.state.read().await;
        state
            .balances
            .get(code)
            .copied()
            .ok_or_else(|| StoreError::UnsupportedCurrency(code.clone()))
    }

    /// Assigns absolute amounts. Non-negativity is enforced by callers.
    pub async fn set_balances(&self, updates: BTreeMap<CurrencyCode, Decimal>) {
        let mut state = self.state.write().await;
        for (code, amount) in updates {
            state.balances.insert(code, amount);
        }
        state.mark_changed();
        state.log_changed();
    }

    /// Adds deltas to balances. Either every delta in the batch is applied or
    /// none is; codes are checked in sorted order and the first one that
    /// would go negative is reported.
    pub async fn modify_balances(
        &self,
        deltas: BTreeMap<CurrencyCode, Decimal>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let mut updated = Vec::with_capacity(deltas.len());
        for (code, delta) in deltas {
            let current = state.balances.get(&code).copied().unwrap_or_default();
            let Some(new_balance) = current.checked_add(delta) else {
                debug!(%code, %current, %delta, "Rejecting modification out of range");
                return Err(StoreError::AmountOutOfRange { code });
            };
            if new_balance < Decimal::ZERO {
                debug!(%code, %current, %delta, "Rejecting modification below zero");
                return Err(StoreError::NegativeBalance { code });
            }
            updated.push((code, new_balance));
        }
        state.balances.extend(updated);
        state.mark_changed();
        state.log_changed();
        Ok(())
    }

    /// Replaces the whole rate table.
    pub async fn set_rates(&self, rates: RateTable) {
        let mut state = self.state.write().await;
        state.rates = rates;
        state.mark_changed();
        state.log_changed();
    }

    #[cfg(test)]
    pub(crate) async fn rates(&self) -> RateTable {
        self.state.read().await.rates.clone()
    }

    pub async fn summary(&self) -> Summary {
        self.state.read().await.summary()
    }

    pub async fn render_text(&self) -> String {
        self.summary().await.render_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::new(c)
    }

    async fn sample_store() -> BalanceStore {
        let store = BalanceStore::new();
        store
            .init_balances(BTreeMap::from([
                (code("usd"), dec!(100)),
                (code("eur"), dec!(50)),
                (code("rub"), dec!(1000)),
            ]))
            .await;
        store
    }

    fn sample_rates() -> RateTable {
        BTreeMap::from([
            (code("USD"), dec!(90)),
            (code("EUR"), dec!(100)),
            (code("RUB"), dec!(1)),
        ])
    }

    #[tokio::test]
    async fn test_init_and_get_balance() {
        let store = sample_store().await;
        assert_eq!(store.get_balance(&code("USD")).await, Ok(dec!(100)));
        assert_eq!(store.get_balance(&code("eur")).await, Ok(dec!(50)));
        assert_eq!(
            store.get_balance(&code("AZN")).await,
            Err(StoreError::UnsupportedCurrency(code("AZN")))
        );
    }

    #[tokio::test]
    async fn test_init_does_not_mark_changed() {
        let store = sample_store().await;
        assert!(!store.state.read().await.changed);
    }

    #[tokio::test]
    async fn test_set_balances_overrides_unconditionally() {
        let store = sample_store().await;
        store
            .set_balances(BTreeMap::from([(code("USD"), dec!(200))]))
            .await;
        assert_eq!(store.get_balance(&code("USD")).await, Ok(dec!(200)));

        store
            .set_balances(BTreeMap::from([(code("USD"), dec!(0))]))
            .await;
        assert_eq!(store.get_balance(&code("USD")).await, Ok(dec!(0)));
        // Change flag is logged and cleared within the same call.
        assert!(!store.state.read().await.changed);
    }

    #[tokio::test]
    async fn test_modify_balances_applies_batch() {
        let store = sample_store().await;
        store
            .modify_balances(BTreeMap::from([
                (code("USD"), dec!(-100)),
                (code("EUR"), dec!(25.5)),
            ]))
            .await
            .unwrap();
        assert_eq!(store.get_balance(&code("USD")).await, Ok(dec!(0)));
        assert_eq!(store.get_balance(&code("EUR")).await, Ok(dec!(75.5)));
        assert_eq!(store.get_balance(&code("RUB")).await, Ok(dec!(1000)));
    }

    #[tokio::test]
    async fn test_modify_balances_rejects_negative() {
        let store = sample_store().await;
        let result = store
            .modify_balances(BTreeMap::from([(code("USD"), dec!(-150))]))
            .await;
        assert_eq!(
            result,
            Err(StoreError::NegativeBalance { code: code("USD") })
        );
        assert_eq!(store.get_balance(&code("USD")).await, Ok(dec!(100)));
    }

    #[tokio::test]
    async fn test_modify_balances_is_all_or_nothing() {
        let store = sample_store().await;
        let before = store.summary().await.amounts;
        let result = store
            .modify_balances(BTreeMap::from([
                (code("EUR"), dec!(10)),
                (code("RUB"), dec!(5)),
                (code("USD"), dec!(-100.01)),
            ]))
            .await;
        assert_eq!(
            result,
            Err(StoreError::NegativeBalance { code: code("USD") })
        );
        assert_eq!(store.summary().await.amounts, before);
    }

    #[tokio::test]
    async fn test_modify_reports_first_offender_in_code_order() {
        let store = sample_store().await;
        let result = store
            .modify_balances(BTreeMap::from([
                (code("USD"), dec!(-1000)),
                (code("EUR"), dec!(-1000)),
            ]))
            .await;
        assert_eq!(
            result,
            Err(StoreError::NegativeBalance { code: code("EUR") })
        );
    }

    #[tokio::test]
    async fn test_modify_overflow_is_rejected() {
        let store = sample_store().await;
        let result = store
            .modify_balances(BTreeMap::from([
                (code("EUR"), dec!(1)),
                (code("USD"), Decimal::MAX),
            ]))
            .await;
        assert_eq!(
            result,
            Err(StoreError::AmountOutOfRange { code: code("USD") })
        );
        assert_eq!(store.get_balance(&code("USD")).await, Ok(dec!(100)));
        assert_eq!(store.get_balance(&code("EUR")).await, Ok(dec!(50)));
    }

    #[tokio::test]
    async fn test_modify_untracked_code_starts_from_zero() {
        let store = sample_store().await;
        store
            .modify_balances(BTreeMap::from([(code("AZN"), dec!(3))]))
            .await
            .unwrap();
        assert_eq!(store.get_balance(&code("AZN")).await, Ok(dec!(3)));
        assert!(
            store
                .modify_balances(BTreeMap::from([(code("GBP"), dec!(-1))]))
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_summary_before_rates() {
        let store = sample_store().await;
        let summary = store.summary().await;
        assert_eq!(summary.amounts.len(), 3);
        assert!(summary.rates.is_empty());
        assert!(summary.total.is_empty());
    }

    #[tokio::test]
    async fn test_summary_total_in_reference() {
        let store = sample_store().await;
        store.set_rates(sample_rates()).await;
        let summary = store.summary().await;
        assert_eq!(summary.total[&code("RUB")], dec!(15000.0000));
        assert_eq!(store.summary().await, summary);
    }

    #[tokio::test]
    async fn test_set_rates_replaces_wholesale() {
        let store = sample_store().await;
        store.set_rates(sample_rates()).await;
        store
            .set_rates(BTreeMap::from([(code("USD"), dec!(80)), (code("RUB"), dec!(1))]))
            .await;
        let rates = store.rates().await;
        assert_eq!(rates.len(), 2);
        assert!(!rates.contains_key(&code("EUR")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refresh_never_mixes_tables() {
        let store = Arc::new(sample_store().await);
        let table_a = sample_rates();
        let table_b: RateTable = BTreeMap::from([
            (code("USD"), dec!(80)),
            (code("EUR"), dec!(120)),
            (code("RUB"), dec!(1)),
        ]);
        let balances = store.summary().await.amounts;
        let expected_a = summary::summarize(&balances, &table_a);
        let expected_b = summary::summarize(&balances, &table_b);
        store.set_rates(table_a.clone()).await;

        let writer = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for i in 0..200 {
                    let table = if i % 2 == 0 { &table_b } else { &table_a };
                    store.set_rates(table.clone()).await;
                    tokio::task::yield_now().await;
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let (a, b) = (expected_a.clone(), expected_b.clone());
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let summary = store.summary().await;
                        assert!(summary == a || summary == b);
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_render_text_matches_summary() {
        let store = sample_store().await;
        store.set_rates(sample_rates()).await;
        let text = store.render_text().await;
        assert!(text.starts_with("eur: 50\nrub: 1000\nusd: 100\n"));
        assert!(text.ends_with("sum: 150.0000 eur / 15000.0000 rub / 166.6667 usd"));
    }
}
