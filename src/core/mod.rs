//! Core business logic: balances, rates and their summary

pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod store;
pub mod summary;

// Re-export main types for cleaner imports
pub use currency::{CurrencyCode, RateSource, RateTable};
pub use error::{ConfigError, RateSourceError, StoreError};
pub use store::BalanceStore;
pub use summary::Summary;
