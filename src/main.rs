//! Command line interface for the staker checker. Loads the addresses to
//! inspect, obtains the day's event set from cache or from the indexer, and
//! prints one threshold verdict per address.

mod cache;
mod checker;
mod client;
mod config;
mod event;
mod paginate;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use log::{info, warn};

use cache::EventCache;
use checker::AddressResult;
use client::GraphQlClient;
use config::Settings;
use paginate::FetchOptions;

/// Event type checked when `--event-type` is not given.
const MINT_EVENT_TYPE: &str =
    "0x2cc52445acc4c5e5817a0ac475976fbef966fedb6e30e7db792e10619c76181f::minting_manager::MintEvent";
/// Cumulative amount an address must strictly exceed.
const STAKING_THRESHOLD: u128 = 100_000_000;

/// Command line interface entry point.
#[derive(Parser)]
#[command(
    name = "stakecheck",
    author,
    version,
    about = "Check whether Aptos addresses clear a staking threshold from cumulative mint events"
)]
#[command(group(ArgGroup::new("target").required(true).args(["address", "addresses_file"])))]
struct Cli {
    /// Path to the `.env` configuration file.
    #[arg(long, default_value = ".env")]
    env: String,
    /// Single account address to check.
    #[arg(long)]
    address: Option<String>,
    /// JSON file holding a list of account addresses to check.
    #[arg(long)]
    addresses_file: Option<PathBuf>,
    /// Event type signature to query for.
    #[arg(long, default_value = MINT_EVENT_TYPE)]
    event_type: String,
    /// Cumulative amount threshold, met only when strictly exceeded.
    #[arg(long, default_value_t = STAKING_THRESHOLD)]
    threshold: u128,
    /// Records per page; the indexer caps this at 100.
    #[arg(long, default_value_t = 100)]
    limit: u32,
    /// Delay between page requests, in seconds.
    #[arg(long, default_value_t = 0.1)]
    delay: f64,
    /// Directory holding the per-day event cache.
    #[arg(long, default_value = "data/cache")]
    cache_dir: PathBuf,
    /// Ignore cached events and fetch fresh data; the cache is still updated.
    #[arg(long)]
    no_cache: bool,
}

/// Resolve the list of addresses to check before any network activity.
///
/// Anything other than a JSON list of strings is a fatal configuration
/// error.
fn load_addresses(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let addresses = if let Some(path) = &cli.addresses_file {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading addresses file {}", path.display()))?;
        let parsed: serde_json::Value = serde_json::from_str(&data)
            .with_context(|| format!("decoding addresses file {}", path.display()))?;
        let entries = parsed
            .as_array()
            .with_context(|| format!("addresses file {} is not a JSON list", path.display()))?;
        entries
            .iter()
            .map(|entry| {
                entry.as_str().map(str::to_owned).with_context(|| {
                    format!("addresses file {} contains a non-string entry", path.display())
                })
            })
            .collect::<anyhow::Result<Vec<String>>>()?
    } else {
        cli.address.iter().cloned().collect()
    };
    if addresses.is_empty() {
        bail!("no addresses to check");
    }
    Ok(addresses)
}

/// Execute one checker run and return the per-address verdicts.
async fn run(cli: Cli) -> anyhow::Result<Vec<AddressResult>> {
    if !cli.delay.is_finite() || cli.delay < 0.0 {
        bail!("--delay must be a non-negative number of seconds");
    }
    let addresses = load_addresses(&cli)?;
    info!("checking {} address(es) against event type '{}'", addresses.len(), cli.event_type);

    let settings = Settings::from_env(&cli.env);
    let cache = EventCache::new(&cli.cache_dir);

    let mut events = None;
    if !cli.no_cache {
        events = cache.load(&cli.event_type);
        if let Some(cached) = &events {
            info!(
                "loaded {} events from cache {}",
                cached.len(),
                cache.file_path(&cli.event_type).display()
            );
        }
    }
    let events = match events {
        Some(events) => events,
        None => {
            let client = GraphQlClient::new(&settings)?;
            let opts = FetchOptions {
                event_type: cli.event_type.clone(),
                limit: cli.limit,
                delay: Duration::from_secs_f64(cli.delay),
            };
            let fetched = paginate::fetch_all_events(&client, &opts).await;
            // The fetched set stays usable in memory even when persisting fails.
            if let Err(e) = cache.store(&cli.event_type, &fetched) {
                warn!("could not save events to cache: {e:#}");
            }
            fetched
        }
    };

    let results: Vec<AddressResult> = addresses
        .iter()
        .map(|address| checker::check_address(&events, address, cli.threshold))
        .collect();
    print_summary(&results, events.len());
    Ok(results)
}

/// Print the human-readable run summary.
fn print_summary(results: &[AddressResult], total_events: usize) {
    let met = results.iter().filter(|r| r.meets_criteria).count();
    println!("{}", "=".repeat(60));
    println!("Events of target type: {total_events}");
    println!("Addresses processed: {}", results.len());
    println!("Addresses meeting criteria: {met}");
    println!("{}", "-".repeat(60));
    for result in results {
        let status = if result.meets_criteria {
            "MEETS CRITERIA"
        } else {
            "DOES NOT MEET"
        };
        match &result.error {
            Some(error) => println!("- {}: {status} (error: {error})", result.address),
            None => println!(
                "- {}: {status} (amount: {}, events: {})",
                result.address, result.cumulative_amount, result.events_found
            ),
        }
    }
    println!("{}", "=".repeat(60));
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    run(cli).await?;
    Ok(())
}
