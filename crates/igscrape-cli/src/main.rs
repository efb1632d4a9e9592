mod profile;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "igscrape-cli")]
#[command(about = "Fetch and normalize public social profiles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one or more profiles and print one JSON line per username
    Profile {
        /// Usernames to fetch (a leading `@` is ignored)
        #[arg(required = true)]
        usernames: Vec<String>,
        /// Maximum profiles fetched at once (defaults to `IGSCRAPE_MAX_CONCURRENT_FETCHES`)
        #[arg(long)]
        concurrency: Option<usize>,
        /// Retries on rate limiting or network errors (defaults to `IGSCRAPE_MAX_RETRIES`)
        #[arg(long)]
        retries: Option<u32>,
        /// Base backoff in seconds between retries (defaults to `IGSCRAPE_RETRY_BACKOFF_BASE_SECS`)
        #[arg(long)]
        backoff_secs: Option<u64>,
    },
    /// Extract a profile from a saved HTML page without touching the network
    Extract {
        /// Path to the saved profile page
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let config = igscrape_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Profile {
            usernames,
            concurrency,
            retries,
            backoff_secs,
        } => {
            let options = profile::FetchOptions {
                concurrency: concurrency.unwrap_or(config.max_concurrent_fetches),
                retries: retries.unwrap_or(config.max_retries),
                backoff_secs: backoff_secs.unwrap_or(config.retry_backoff_base_secs),
            };
            profile::run_profiles(&config, &usernames, options).await
        }
        Commands::Extract { file } => profile::run_extract(&file),
    }
}

#[cfg(test)]
mod tests;
