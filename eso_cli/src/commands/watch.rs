//! The `watch` subcommand: periodic refresh, one JSON line per published series.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use eso_lib::{EsoConfig, JsonLinesSink, MemorySessionStore, RefreshPipeline, Scheduler};

use crate::output::print_json;

#[derive(Args)]
pub struct WatchArgs {
    /// Append series to this file instead of writing them to stdout
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Run a single cycle, print the entity state, and exit
    #[arg(long)]
    pub once: bool,
}

pub async fn run(args: &WatchArgs, config: &EsoConfig) -> Result<()> {
    let writer: Box<dyn Write + Send> = match &args.jsonl {
        Some(path) => Box::new(super::open_jsonl(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut pipeline = RefreshPipeline::new(
        config,
        MemorySessionStore::new(),
        JsonLinesSink::new(writer),
    );
    let mut scheduler = Scheduler::new(&config.name, config.scan_interval());

    if args.once {
        let result = scheduler.tick(&mut pipeline).await;
        if args.jsonl.is_some() {
            print_json(scheduler.state());
        }
        result?;
        return Ok(());
    }

    tracing::info!(
        "Watching {} every {} minutes",
        config.selector,
        config.scan_interval_minutes
    );
    scheduler
        .run_until(&mut pipeline, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
