//! osmolock
//!
//! Command-line view of an account's lockup positions, read from a chain's
//! REST (LCD) endpoint.
//!
//! Usage:
//!   osmolock locks     --address <addr>
//!   osmolock locked    --address <addr> --denom <denom> --duration <dur>
//!   osmolock unlocking --address <addr> --denom <denom> --duration <dur>
//!   osmolock summary   --address <addr>[,<addr>...] [--denom <denom>]
//!
//! Global: [--lcd <url>] [--chain-id <id>] [--timeout <secs>]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing::{info, warn};

use osmolock_core::constants::{
    BONDING_DURATIONS_SECS, DEFAULT_CHAIN_ID, DEFAULT_LCD_URL, DEFAULT_TIMEOUT_SECS,
};
use osmolock_core::currency::{CoinPretty, Currency};
use osmolock_core::lock::LockStatus;
use osmolock_lcd::LcdClient;
use osmolock_query::{
    AccountLockQuery, AccountLockRegistry, ChainRegistry, ChainResolver, MemoryResponseCache,
};

mod config;
use config::{format_duration, parse_duration_arg, CliConfig};

// ── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "osmolock",
    version,
    about = "Inspect locked and unlocking lockup positions for an account"
)]
struct Args {
    /// Chain REST (LCD) endpoint.
    #[arg(long, global = true, env = "OSMOLOCK_LCD", default_value = DEFAULT_LCD_URL)]
    lcd: String,

    /// Chain id the endpoint serves.
    #[arg(long, global = true, env = "OSMOLOCK_CHAIN_ID", default_value = DEFAULT_CHAIN_ID)]
    chain_id: String,

    /// HTTP timeout in seconds.
    #[arg(long, global = true, env = "OSMOLOCK_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every lock held by an account.
    Locks {
        #[arg(long)]
        address: String,
    },

    /// Total still locked (not unlocking) for one lock duration.
    Locked {
        #[arg(long)]
        address: String,
        /// Minimal denomination, e.g. `uosmo` or `gamm/pool/1`.
        #[arg(long)]
        denom: String,
        /// Lock duration: `<n>s`, `<n>h` or `<n>d`.
        #[arg(long, value_parser = parse_duration_arg)]
        duration: Duration,
    },

    /// Unlocking amounts for one lock duration, grouped by release time.
    Unlocking {
        #[arg(long)]
        address: String,
        #[arg(long)]
        denom: String,
        #[arg(long, value_parser = parse_duration_arg)]
        duration: Duration,
    },

    /// Locked and unlocking totals for the standard bonding durations.
    Summary {
        /// One or more addresses (comma-separated); fetched concurrently.
        #[arg(long, value_delimiter = ',', required = true)]
        address: Vec<String>,
        #[arg(long, default_value = "uosmo")]
        denom: String,
    },
}

// ── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,osmolock=info")),
        )
        .init();

    let args = Args::parse();
    let cfg = CliConfig::new(args.chain_id, args.lcd, args.timeout);

    let chain = Arc::new(ChainRegistry::new());
    for currency in &cfg.native_currencies {
        chain.add_currency(&cfg.chain_id, currency.clone());
    }
    let lcd = LcdClient::new(&cfg.lcd).context("building LCD client")?;
    info!(chain_id = %cfg.chain_id, lcd = %lcd.base_url(), "osmolock starting");

    let registry = AccountLockRegistry::new(
        cfg.chain_id.clone(),
        chain.clone(),
        Arc::new(lcd),
        Arc::new(MemoryResponseCache::new()),
    );

    match args.command {
        Command::Locks { address } => {
            let query = fetched(&registry, &address).await?;
            cmd_locks(&query, &chain, registry.chain_id())
        }

        Command::Locked { address, denom, duration } => {
            let query = fetched(&registry, &address).await?;
            let currency = resolve_currency(&chain, registry.chain_id(), &denom);
            let locked = query.get_locked_coin_with_duration(&currency, duration);
            println!("Account:   {}", address);
            println!("Duration:  {}", format_duration(duration));
            println!("Locked:    {}", locked.amount);
            println!("Lock IDs:  {}", join_ids(&locked.lock_ids));
            Ok(())
        }

        Command::Unlocking { address, denom, duration } => {
            let query = fetched(&registry, &address).await?;
            let currency = resolve_currency(&chain, registry.chain_id(), &denom);
            let groups = query.get_unlocking_coin_with_duration(&currency, duration);
            println!("Account:   {}", address);
            println!("Duration:  {}", format_duration(duration));
            if groups.is_empty() {
                println!("Nothing unlocking.");
            }
            for group in groups.iter() {
                println!(
                    "  {}  {}  (locks {})",
                    group.end_time.to_rfc3339(),
                    group.amount,
                    join_ids(&group.lock_ids)
                );
            }
            Ok(())
        }

        Command::Summary { address, denom } => {
            cmd_summary(&registry, &chain, &address, &denom).await
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

async fn fetched(
    registry: &AccountLockRegistry,
    address: &str,
) -> anyhow::Result<Arc<AccountLockQuery>> {
    if address.is_empty() {
        bail!("--address must not be empty");
    }
    let query = registry.get(address);
    query
        .fetch()
        .await
        .with_context(|| format!("fetching locks for {address}"))?;
    Ok(query)
}

fn cmd_locks(
    query: &AccountLockQuery,
    chain: &ChainRegistry,
    chain_id: &str,
) -> anyhow::Result<()> {
    let snapshot = query
        .snapshot()
        .context("no lock data received for this account")?;
    println!("Account:  {}", query.address());
    println!("Locks:    {}", snapshot.locks.len());
    for lock in &snapshot.locks {
        let status = match lock.status {
            LockStatus::Locked => "locked".to_string(),
            LockStatus::Unlocking { end_time } => format!("unlocking until {}", end_time.to_rfc3339()),
        };
        let coins: Vec<String> = lock
            .coins
            .iter()
            .map(|(denom, amount)| {
                let currency = resolve_currency(chain, chain_id, denom);
                CoinPretty::new(currency, amount.clone()).to_string()
            })
            .collect();
        println!(
            "  #{:<8} {:>6}  {:<36} {}",
            lock.id,
            format_duration(Duration::from_secs(lock.duration_secs)),
            status,
            coins.join(", ")
        );
    }
    Ok(())
}

async fn cmd_summary(
    registry: &AccountLockRegistry,
    chain: &ChainRegistry,
    addresses: &[String],
    denom: &str,
) -> anyhow::Result<()> {
    let queries: Vec<Arc<AccountLockQuery>> = addresses.iter().map(|a| registry.get(a)).collect();
    let results = join_all(queries.iter().map(|q| q.fetch())).await;

    let currency = resolve_currency(chain, registry.chain_id(), denom);
    for (query, result) in queries.iter().zip(results) {
        println!("Account:  {}", query.address());
        if let Err(e) = result {
            warn!(address = %query.address(), error = %e, "summary fetch failed");
            println!("  error: {e}");
            continue;
        }
        for secs in BONDING_DURATIONS_SECS {
            let duration = Duration::from_secs(secs);
            let locked = query.get_locked_coin_with_duration(&currency, duration);
            let unlocking = query.get_unlocking_coin_with_duration(&currency, duration);
            let unlocking_total = unlocking
                .iter()
                .fold(CoinPretty::zero(currency.clone()), |acc, g| {
                    acc.add_raw(g.amount.raw_amount())
                });
            println!(
                "  {:>4}  locked {:<24} unlocking {} ({} cohort{})",
                format_duration(duration),
                locked.amount.to_string(),
                unlocking_total,
                unlocking.len(),
                if unlocking.len() == 1 { "" } else { "s" }
            );
        }
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn resolve_currency(chain: &ChainRegistry, chain_id: &str, denom: &str) -> Currency {
    chain
        .find_currency(chain_id, denom)
        .unwrap_or_else(|| Currency::unknown(denom))
}

fn join_ids(ids: &[String]) -> String {
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}
