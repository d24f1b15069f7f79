use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::currency::{CurrencyCode, RateSource, RateTable};
use crate::core::error::RateSourceError;

const DAILY_ENDPOINT: &str = "/daily_json.js";

/// Daily exchange rates published by the Central Bank of Russia, quoted in
/// roubles.
pub struct CbrRateSource {
    base_url: String,
    client: reqwest::Client,
}

impl CbrRateSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RateSourceError> {
        let client = reqwest::Client::builder()
            .user_agent("curbal/1.0")
            .timeout(timeout)
            .build()?;
        Ok(CbrRateSource {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CbrDailyResponse {
    #[serde(rename = "Valute")]
    valute: HashMap<String, CbrValute>,
}

#[derive(Debug, Deserialize)]
struct CbrValute {
    #[serde(rename = "Nominal")]
    nominal: u32,
    #[serde(rename = "Value")]
    value: Decimal,
}

impl CbrDailyResponse {
    fn rates_for(&self, codes: &BTreeSet<CurrencyCode>) -> Result<RateTable, RateSourceError> {
        let mut rates = RateTable::new();
        for code in codes {
            let quote = self
                .valute
                .get(code.as_str())
                .ok_or_else(|| RateSourceError::MissingCurrency(code.clone()))?;
            if quote.nominal == 0 || quote.value <= Decimal::ZERO {
                return Err(RateSourceError::InvalidRate(code.clone()));
            }
            rates.insert(code.clone(), quote.value / Decimal::from(quote.nominal));
        }
        Ok(rates)
    }
}

#[async_trait]
impl RateSource for CbrRateSource {
    #[instrument(name = "CbrRateFetch", skip(self, codes), fields(count = codes.len()))]
    async fn fetch_rates(
        &self,
        codes: &BTreeSet<CurrencyCode>,
    ) -> Result<RateTable, RateSourceError> {
        let url = format!("{}{}", self.base_url, DAILY_ENDPOINT);
        debug!("Requesting currency rates from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RateSourceError::Status(response.status()));
        }

        let text = response.text().await?;
        let data: CbrDailyResponse = serde_json::from_str(&text)?;
        data.rates_for(codes)
    }
}
