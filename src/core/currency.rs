//! Currency codes and the exchange rate source abstraction

use crate::core::error::RateSourceError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Currency code → rate relative to the reference currency.
pub type RateTable = BTreeMap<CurrencyCode, Decimal>;

/// A short currency identifier, always stored in uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    const MAX_LEN: usize = 8;

    pub fn new(code: &str) -> Self {
        CurrencyCode(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the code is non-empty, short, and purely ASCII alphanumeric.
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= Self::MAX_LEN
            && self.0.chars().all(|c| c.is_ascii_alphanumeric())
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(code: &str) -> Self {
        CurrencyCode::new(code)
    }
}

impl From<String> for CurrencyCode {
    fn from(code: String) -> Self {
        CurrencyCode::new(&code)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Delivers current exchange rates for a set of currencies.
///
/// Rates are expressed in units of the reference currency. The reference
/// currency itself is never requested; callers synthesize its rate as 1.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(
        &self,
        codes: &BTreeSet<CurrencyCode>,
    ) -> Result<RateTable, RateSourceError>;
}
