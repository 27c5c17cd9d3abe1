use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use search_client::SearchClient;
use termwatch_archive::{store_from_config, JsonlArchiver, ObjectCursorStore, ObjectStore};
use termwatch_common::Config;
use termwatch_scout::fetcher::SearchFetcher;
use termwatch_scout::scheduler::RunScheduler;

#[derive(Parser)]
#[command(name = "termwatch", about = "Incremental search collector for tracked terms")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one collection cycle (default).
    Run,
    /// Run a cycle now and then on a fixed interval, never overlapping.
    Watch {
        /// Minutes between cycles. Defaults to RUN_INTERVAL_MINUTES.
        #[arg(long)]
        every_minutes: Option<u64>,
    },
    /// Print the order terms would be searched in, without searching.
    Plan,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("termwatch=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load config
    let config = Config::from_env()?;
    config.log_redacted();

    let objects = store_from_config(&config)?;
    let store = Arc::new(ObjectCursorStore::new(objects.clone(), config.terms_key.clone()));

    match cli.command.unwrap_or(Command::Run) {
        Command::Plan => {
            let terms = store.load().await?;
            for (i, term) in terms.iter().enumerate() {
                println!(
                    "{:>3}  {:<40} since_id={:<22} last_search={}",
                    i + 1,
                    term.term,
                    term.since_id.as_ref().map(|c| c.as_str()).unwrap_or("-"),
                    term.timestamp_last_search.as_deref().unwrap_or("never"),
                );
            }
        }
        Command::Run => {
            let scheduler = build_scheduler(&config, store, objects);
            scheduler.run().await?;
        }
        Command::Watch { every_minutes } => {
            let minutes = every_minutes.unwrap_or(config.run_interval_minutes).max(1);
            let scheduler = build_scheduler(&config, store, objects);
            info!(minutes, "Watching, one cycle per interval");

            let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // A failed cycle is retried by the next tick.
                if let Err(e) = scheduler.run().await {
                    error!(error = %e, kind = e.kind(), "Run failed");
                }
            }
        }
    }

    Ok(())
}

fn build_scheduler(
    config: &Config,
    store: Arc<ObjectCursorStore>,
    objects: Arc<dyn ObjectStore>,
) -> RunScheduler {
    let client = SearchClient::new(config.search_credentials.clone());
    let fetcher = SearchFetcher::new(client, config.search_lang.clone());
    let archiver = JsonlArchiver::new(objects, config.archive_prefix.clone());

    RunScheduler::new(store, Arc::new(fetcher), Arc::new(archiver))
        .with_max_results(config.search_max_results)
}
