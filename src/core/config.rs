use crate::core::currency::CurrencyCode;
use crate::core::error::ConfigError;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub period_minutes: u64,
    #[serde(default = "default_print_interval")]
    pub print_interval_minutes: u64,
}

fn default_print_interval() -> u64 {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            period_minutes: 1,
            print_interval_minutes: default_print_interval(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CbrProviderConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for CbrProviderConfig {
    fn default() -> Self {
        CbrProviderConfig {
            base_url: "https://www.cbr-xml-daily.ru".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub cbr: CbrProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct LoggingConfig {
    /// Log events are appended here in addition to the console.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub currencies: Vec<CurrencyCode>,
    pub reference_currency: CurrencyCode,
    #[serde(default)]
    pub balances: BTreeMap<CurrencyCode, Decimal>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            currencies: ["USD", "EUR", "RUB", "AZN"]
                .into_iter()
                .map(CurrencyCode::new)
                .collect(),
            reference_currency: CurrencyCode::new("RUB"),
            balances: BTreeMap::new(),
            scheduler: SchedulerConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Longest accepted interval: one year.
const MAX_MINUTES: u64 = 365 * 24 * 60;

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.saturating_mul(60))
}

fn check_minutes(value: u64, name: &'static str) -> Result<(), ConfigError> {
    match value {
        0 => Err(ConfigError::NonPositive(name)),
        v if v > MAX_MINUTES => Err(ConfigError::OutOfRange(name)),
        _ => Ok(()),
    }
}

/// Parses a `CODE=AMOUNT` pair as given on the command line.
pub fn parse_amount(arg: &str) -> Result<(CurrencyCode, Decimal), ConfigError> {
    let (code, amount) = arg
        .split_once('=')
        .ok_or_else(|| ConfigError::MalformedAmount(arg.to_string()))?;
    let amount = Decimal::from_str(amount.trim())
        .map_err(|_| ConfigError::MalformedAmount(arg.to_string()))?;
    Ok((CurrencyCode::new(code), amount))
}

impl AppConfig {
    /// Loads the config from the default location, or the built-in defaults
    /// when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "curbal", "curbal")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn tracked_currencies(&self) -> BTreeSet<CurrencyCode> {
        self.currencies.iter().cloned().collect()
    }

    /// One balance per tracked currency; unset ones start at zero.
    pub fn initial_balances(&self) -> BTreeMap<CurrencyCode, Decimal> {
        self.currencies
            .iter()
            .map(|code| {
                let amount = self.balances.get(code).copied().unwrap_or_default();
                (code.clone(), amount)
            })
            .collect()
    }

    pub fn refresh_period(&self) -> Duration {
        minutes(self.scheduler.period_minutes)
    }

    pub fn print_interval(&self) -> Duration {
        minutes(self.scheduler.print_interval_minutes)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.cbr.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currencies.is_empty() {
            return Err(ConfigError::NoCurrencies);
        }
        let mut seen = BTreeSet::new();
        for code in &self.currencies {
            if !code.is_well_formed() {
                return Err(ConfigError::MalformedCurrency(code.to_string()));
            }
            if !seen.insert(code) {
                return Err(ConfigError::DuplicateCurrency(code.clone()));
            }
        }
        if !seen.contains(&self.reference_currency) {
            return Err(ConfigError::UntrackedReference(
                self.reference_currency.clone(),
            ));
        }
        check_minutes(self.scheduler.period_minutes, "period")?;
        check_minutes(self.scheduler.print_interval_minutes, "print interval")?;
        if self.providers.cbr.timeout_secs == 0 {
            return Err(ConfigError::NonPositive("fetch timeout"));
        }
        for (code, amount) in &self.balances {
            if !seen.contains(code) {
                return Err(ConfigError::UntrackedBalance(code.clone()));
            }
            if *amount < Decimal::ZERO {
                return Err(ConfigError::NegativeBalance(code.clone()));
            }
        }
        Ok(())
    }
}
