use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    registry::LookupSpan, util::SubscriberInitExt,
};

/// Opens `path` for appending, creating it and its parent directories.
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

fn file_layer<S>(path: &Path) -> Result<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = open_log_file(path)?;
    Ok(fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(Arc::new(file)))
}

/// Installs the global subscriber: console output always, plus `log_file`
/// when one is given.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let (level_filter, level) = if debug {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::INFO, "info")
    };
    let app_filter = Targets::new()
        .with_target("curbal", level_filter)
        .with_target("tower_http", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_output = log_file.map(file_layer).transpose()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(file_output)
        .with(app_filter)
        .with(env_filter)
        .init();
    Ok(())
}
