use std::{env, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use app::{config::load_config, search_devices, ActivityFeed, DeviceEntry, EventType};
use prometheus::Registry;
use scout_core::{
    CollectionMetrics, CollectionState, ExplorerLinks, LogRow, PresentContext, RegistryReader,
    ResourceKind, TokenTransferRow, TransactionRow,
};
use scout_engine::{
    AddressClient, BlockscoutClient, CollectionStore, HttpPool, LoadOutcome, RegistryClient,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: scout [config.json] <address> [--pages N] [--filter QUERY] [--search TERM] [--events all|transaction|data]";

struct Args {
    config_path: PathBuf,
    address: String,
    pages: usize,
    filter: Option<String>,
    search: Option<String>,
    events: Option<EventType>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut pages = 0usize;
    let mut filter = None;
    let mut search = None;
    let mut events = None;
    let mut it = env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--pages" => {
                let n = it.next().ok_or_else(|| anyhow!("--pages needs a value"))?;
                pages = n.parse().with_context(|| format!("invalid --pages {}", n))?;
            }
            "--filter" => filter = it.next(),
            "--search" => search = it.next(),
            "--events" => {
                let raw = it.next().ok_or_else(|| anyhow!("--events needs a value"))?;
                events = match raw.trim() {
                    "all" => None,
                    other => Some(
                        EventType::parse(other)
                            .ok_or_else(|| anyhow!("unknown event type {}", other))?,
                    ),
                };
            }
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            _ => positional.push(arg),
        }
    }
    let (config_path, address) = match positional.len() {
        1 => (PathBuf::from("config.json"), positional.remove(0)),
        2 => {
            let address = positional.remove(1);
            (PathBuf::from(positional.remove(0)), address)
        }
        _ => return Err(anyhow!(USAGE)),
    };
    Ok(Args {
        config_path,
        address,
        pages,
        filter,
        search,
        events,
    })
}

/// First page plus up to `extra_pages` follow-ups; stops early on failure or
/// when the explorer reports no further page.
async fn load_collection(
    store: &CollectionStore<BlockscoutClient>,
    extra_pages: usize,
) -> CollectionState {
    if let LoadOutcome::Failed(_) = store.load_initial().await {
        return store.snapshot();
    }
    for _ in 0..extra_pages {
        if !store.can_load_more() {
            break;
        }
        if let LoadOutcome::Failed(_) = store.load_more().await {
            break;
        }
    }
    store.snapshot()
}

fn print_section(kind: ResourceKind, state: &CollectionState) {
    println!();
    println!(
        "== {} ({} items{}) ==",
        kind,
        state.items.len(),
        if state.has_more() { ", more available" } else { "" }
    );
    if state.last_error.is_some() {
        println!("{}", kind.failure_message());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    let cfg = load_config(&args.config_path).await?;
    info!(target: "app", api=%cfg.http.base_url, address=%args.address, pages=%args.pages, "scout starting");

    let registry = Registry::new();
    let pool = Arc::new(HttpPool::new(&cfg.http, &registry)?);
    let client = BlockscoutClient::new(pool.clone());
    let metrics = CollectionMetrics::new(&registry)?;

    let stores: Vec<CollectionStore<BlockscoutClient>> = ResourceKind::ALL
        .iter()
        .map(|&kind| {
            let store = CollectionStore::new(client.clone(), kind, args.address.as_str())
                .with_metrics(metrics.clone());
            match (kind, args.filter.as_deref()) {
                (ResourceKind::Transactions, Some(f)) => store.with_filter(f),
                _ => store,
            }
        })
        .collect();

    let (txs, transfers, logs) = tokio::join!(
        load_collection(&stores[0], args.pages),
        load_collection(&stores[1], args.pages),
        load_collection(&stores[2], args.pages),
    );

    let links = ExplorerLinks::new(&cfg.explorer_web_url);
    let ctx = PresentContext::new(&cfg.native_symbol, Some(links.clone()));

    match AddressClient::new(pool.clone(), cfg.native_symbol.clone())
        .fetch(&args.address)
        .await
    {
        Ok(summary) => {
            println!("Address  {}", summary.address);
            if let Some(name) = summary.name.as_deref() {
                println!("Name     {}", name);
            }
            println!(
                "Contract {} (verified: {})",
                summary.is_contract, summary.is_verified
            );
            println!("Balance  {}", summary.balance_display);
            if let Some(h) = summary.creation_tx_hash.as_deref() {
                println!("Created  {}", links.tx(h));
            }
            if let Some(v) = summary.compiler_version.as_deref() {
                println!("Compiler {}", v);
            }
        }
        Err(err) => warn!(target: "app", error=?err, "address summary unavailable"),
    }

    print_section(ResourceKind::Transactions, &txs);
    for item in &txs.items {
        let row = TransactionRow::from_item(item, &ctx);
        println!(
            "{}  {:>9}  {:<14}  {} -> {}  {:<12}  {}  gas {}",
            row.hash_short, row.block, row.age, row.from, row.to, row.method, row.value, row.gas_used
        );
    }

    print_section(ResourceKind::TokenTransfers, &transfers);
    for item in &transfers.items {
        let row = TokenTransferRow::from_item(item, &ctx);
        println!(
            "{}  {:>9}  {:<14}  {} -> {}  {:<8}  {}",
            row.hash_short, row.block, row.age, row.from, row.to, row.token, row.amount
        );
    }

    print_section(ResourceKind::Logs, &logs);
    for item in &logs.items {
        let row = LogRow::from_item(item, &ctx);
        println!(
            "{}  {:>9}  {:<14}  {:<24}  [{}]  {}",
            row.tx_hash,
            row.block,
            row.age,
            row.method,
            row.topics.join(", "),
            row.data
        );
    }

    let feed =
        ActivityFeed::from_collections(&txs.items, &logs.items, None, &cfg.native_symbol);
    let counts = feed.counts();
    println!();
    println!(
        "== activity ({} transaction, {} data events) ==",
        counts.get(&EventType::Transaction).copied().unwrap_or(0),
        counts.get(&EventType::Data).copied().unwrap_or(0)
    );
    for event in feed.filter(args.events).iter().take(10) {
        println!("{}  {}", event.timestamp, event.description);
    }

    match RegistryClient::new(pool.clone(), &cfg.rpc) {
        Ok(reg) => {
            match reg.total().await {
                Ok(total) => println!("\nRegistry {} holds {} devices", reg.contract(), total),
                Err(err) => warn!(target: "app", error=?err, "registry total unavailable"),
            }
            match reg.devices_of(&args.address).await {
                Ok(records) => {
                    let entries = DeviceEntry::for_owner(&args.address, records);
                    let term = args.search.as_deref().unwrap_or("");
                    let now = chrono::Utc::now();
                    for entry in search_devices(&entries, term) {
                        println!(
                            "  #{} {}  owner {}  last seen {}",
                            entry.index,
                            entry.record.name,
                            entry.owner_short(),
                            entry.last_seen(now)
                        );
                    }
                }
                Err(err) => warn!(target: "app", error=?err, "registry devices unavailable"),
            }
        }
        Err(err) => warn!(target: "app", error=?err, "registry client disabled"),
    }

    info!(target: "app", transactions=%txs.items.len(), transfers=%transfers.items.len(), logs=%logs.items.len(), "scout finished");
    Ok(())
}
