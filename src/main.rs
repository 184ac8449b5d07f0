//! # ReguWatch CLI
//!
//! Runs sync cycles against the configured regulators and prints views of
//! the stored updates.
//!
//! ```sh
//! RUST_LOG=reguwatch=debug reguwatch sync
//! reguwatch list --keyword auto
//! ```

use clap::Parser;
use itertools::Itertools;
use reguwatch::config::Settings;
use reguwatch::fetch::HttpFetcher;
use reguwatch::models::{Record, RecordType, Source};
use reguwatch::query::{Query, is_auto_insurance};
use reguwatch::scrapers::adapters_for;
use reguwatch::store::JsonStore;
use reguwatch::sync;
use reguwatch::utils::truncate_for_log;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(store) = args.store {
        settings.store_path = store;
    }
    let store = JsonStore::new(settings.store_path.clone());

    match args.command {
        Command::Sync { sources } => {
            let sources = if sources.is_empty() {
                settings.enabled_sources.clone()
            } else {
                sources
            };
            info!(?sources, store = %store.path().display(), "Starting sync cycle");

            let fetcher = HttpFetcher::new(settings.user_agent.clone());
            let adapters = adapters_for(&sources, &fetcher, &settings);
            let report = match sync::run(&adapters, &store).await {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, "Sync cycle failed");
                    return Err(e.into());
                }
            };
            println!("{}", report.message());
        }
        Command::List {
            keyword,
            sources,
            types,
            auto_only,
            sort,
            json,
        } => {
            let query = Query {
                keyword,
                sources: if sources.is_empty() { Source::ALL.to_vec() } else { sources },
                types: if types.is_empty() {
                    vec![RecordType::WebScraping, RecordType::RssFeed]
                } else {
                    types
                },
                auto_only,
                sort,
            };
            let records = store.load().await;
            let view = query.run(&records);
            debug!(stored = records.len(), shown = view.len(), "Query complete");

            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("Showing {} results", view.len());
                for line in source_legend(&view) {
                    println!("  {line}");
                }
                for record in &view {
                    let badge = if is_auto_insurance(record) { " [AUTO INSURANCE]" } else { "" };
                    println!();
                    println!("[{}] {} | {} | {}{}", record.kind, record.source, record.date, record.title, badge);
                    println!("    {}", record.link);
                    println!("    {}", truncate_for_log(&record.summary, 160));
                }
            }
        }
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    Ok(())
}

/// One line per regulator present in `records`, in first-seen order.
fn source_legend(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.source)
        .unique()
        .map(|source| format!("{source}: {} <{}>", source.display_name(), source.homepage()))
        .collect()
}
