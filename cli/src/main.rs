//! census CLI - fetch country populations from countriesnow.space.
//!
//! ```text
//! census [--config PATH] [--country NAME]... [--missing-data POLICY] [MODE]
//! ```
//!
//! | Mode | Strategy |
//! |------|----------|
//! | `manual` | one at a time, stop at first error |
//! | `parallel` | all at once, report every outcome |
//! | `sequential` | one at a time, `Not Available` on failure |
//! | `stream` (default) | all at once, print in input order |
//!
//! Results go to stdout. Logs go to stderr, filtered by `RUST_LOG`.

mod report;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use census_config::CensusConfig;
use census_fetcher::{Country, MissingDataPolicy, PopulationFetcher};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "census", version)]
#[command(about = "Fetch country populations using different request strategies")]
struct Cli {
    /// Config file (overrides CENSUS_CONFIG and ~/.census/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Country to look up; repeat for several. Replaces the configured list
    #[arg(long = "country", value_name = "NAME", global = true)]
    countries: Vec<String>,
    /// What to do when the API has no data for a country: sentinel or error
    #[arg(long, value_name = "POLICY", value_parser = parse_policy, global = true)]
    missing_data: Option<MissingDataPolicy>,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    /// Fetch the manual list one by one, stopping at the first error
    Manual,
    /// Fetch all countries at once and wait for every outcome
    Parallel,
    /// Fetch one country at a time, substituting "Not Available" on failure
    Sequential,
    /// Start all fetches at once and print results in input order
    #[default]
    Stream,
}

fn parse_policy(value: &str) -> Result<MissingDataPolicy, String> {
    MissingDataPolicy::parse(value)
        .ok_or_else(|| format!("unknown policy `{value}` (expected `sentinel` or `error`)"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(explicit: Option<&Path>) -> Result<CensusConfig> {
    let config = match explicit {
        Some(path) => Some(CensusConfig::load_from(path)?),
        None => CensusConfig::load()?,
    };
    Ok(config.unwrap_or_default())
}

fn select_countries(
    mode: Mode,
    overrides: &[String],
    config: &CensusConfig,
) -> Result<Vec<Country>> {
    if !overrides.is_empty() {
        return census_types::parse_countries(overrides.iter().map(String::as_str))
            .context("invalid --country");
    }
    Ok(match mode {
        Mode::Manual => config.manual_countries(),
        Mode::Parallel | Mode::Sequential | Mode::Stream => config.countries(),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let mut fetch = config.fetch();
    if let Some(policy) = cli.missing_data {
        fetch.missing_data = policy;
    }
    let fetcher = PopulationFetcher::new(&fetch).context("invalid fetch configuration")?;

    let mode = cli.mode.unwrap_or_default();
    let countries = select_countries(mode, &cli.countries, &config)?;
    tracing::debug!(
        ?mode,
        count = countries.len(),
        endpoint = fetcher.endpoint(),
        missing_data = fetcher.missing_data().as_str(),
        "starting"
    );

    let mut out = io::stdout().lock();
    let written = match mode {
        Mode::Manual => report::manual(&fetcher, &countries, &mut out).await,
        Mode::Parallel => report::parallel(&fetcher, &countries, &mut out).await,
        Mode::Sequential => report::sequential(&fetcher, &countries, &mut out).await,
        Mode::Stream => report::stream(&fetcher, &countries, &mut out).await,
    };
    written.context("failed to write output")?;
    out.flush()?;
    Ok(())
}
