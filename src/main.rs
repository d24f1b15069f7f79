use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use curbal::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the balance service
    Serve {
        /// Exchange rate refresh period in minutes
        #[arg(short, long)]
        period: Option<u64>,

        /// Initial balance, e.g. `--amount usd=100`; may be repeated
        #[arg(short, long = "amount", value_name = "CODE=AMOUNT")]
        amounts: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Setup) => {
            init_logging(cli.debug, None)?;
            curbal::cli::setup::setup().map(|_| ())
        }
        Some(Commands::Serve { period, amounts }) => {
            let loaded = curbal::load_config(&curbal::RunOptions {
                config_path: cli.config_path,
                period_minutes: period,
                amounts,
            });
            let log_file = loaded.as_ref().ok().and_then(|c| c.logging.file.clone());
            init_logging(cli.debug, log_file.as_deref())?;
            match loaded {
                Ok(config) => curbal::run(config).await,
                Err(e) => Err(e),
            }
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
