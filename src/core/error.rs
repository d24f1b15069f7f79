//! Error types shared by the store, the rate sources and configuration.

use crate::core::currency::CurrencyCode;
use thiserror::Error;

/// Errors raised synchronously by balance operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Currency not supported: {0}")]
    UnsupportedCurrency(CurrencyCode),

    #[error("The amount of currency cannot be less than zero: {code}")]
    NegativeBalance { code: CurrencyCode },

    #[error("The amount of currency is out of range: {code}")]
    AmountOutOfRange { code: CurrencyCode },
}

/// Failures while fetching rates. These never reach request callers.
#[derive(Debug, Error)]
pub enum RateSourceError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(reqwest::StatusCode),

    #[error("Failed to parse rate response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No rate data found for currency: {0}")]
    MissingCurrency(CurrencyCode),

    #[error("Invalid rate for currency: {0}")]
    InvalidRate(CurrencyCode),
}

/// Startup configuration problems; fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: no currencies configured")]
    NoCurrencies,

    #[error("Invalid configuration: malformed currency code '{0}'")]
    MalformedCurrency(String),

    #[error("Invalid configuration: duplicate currency {0}")]
    DuplicateCurrency(CurrencyCode),

    #[error("Invalid configuration: reference currency {0} is not tracked")]
    UntrackedReference(CurrencyCode),

    #[error("Invalid configuration: {0} must be greater than zero")]
    NonPositive(&'static str),

    #[error("Invalid configuration: {0} is too large")]
    OutOfRange(&'static str),

    #[error("Invalid configuration: initial balance for untracked currency {0}")]
    UntrackedBalance(CurrencyCode),

    #[error("Invalid configuration: initial balance for {0} is negative")]
    NegativeBalance(CurrencyCode),

    #[error("Invalid configuration: malformed initial amount '{0}'")]
    MalformedAmount(String),
}
