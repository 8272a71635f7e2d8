//! The `fetch` subcommand: one refresh cycle, printed or appended to a file.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::Args;
use eso_lib::{
    EsoConfig, JsonLinesSink, MemorySessionStore, MemorySink, RefreshPipeline, StatisticsSink,
};

use crate::output::{
    print_json, print_points_csv, print_points_markdown, print_points_table, print_series_csv,
    print_series_markdown, print_series_table, OutputFormat,
};

#[derive(Args)]
pub struct FetchArgs {
    /// Print every hourly point instead of one summary row per series
    #[arg(long)]
    pub points: bool,

    /// Also append the series as JSON lines to this file
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Report boundary date (YYYY-MM-DD, defaults to today in the portal time zone)
    #[arg(long)]
    pub date: Option<String>,
}

pub async fn run(args: &FetchArgs, config: &EsoConfig, format: &OutputFormat) -> Result<()> {
    let sink: Box<dyn StatisticsSink> = match &args.jsonl {
        Some(path) => Box::new(JsonLinesSink::new(super::open_jsonl(path)?)),
        None => Box::new(MemorySink::new()),
    };
    let mut pipeline = RefreshPipeline::new(config, MemorySessionStore::new(), sink);

    let report = match &args.date {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|e| anyhow!("invalid --date '{}': {}", raw, e))?;
            pipeline.refresh_on(date).await?
        }
        None => pipeline.refresh().await?,
    };

    if let Some(path) = &args.jsonl {
        eprintln!("Appended {} series to {}", report.series.len(), path.display());
    }

    if args.points {
        match format {
            OutputFormat::Table => print_points_table(&report.series, config.time_zone),
            OutputFormat::Json => print_json(&report.series),
            OutputFormat::Csv => print_points_csv(&report.series, config.time_zone)?,
            OutputFormat::Markdown => print_points_markdown(&report.series, config.time_zone),
        }
        return Ok(());
    }

    let summaries = report.summaries();
    match format {
        OutputFormat::Table => print_series_table(&summaries, config.time_zone),
        OutputFormat::Json => print_json(&summaries),
        OutputFormat::Csv => print_series_csv(&summaries, config.time_zone)?,
        OutputFormat::Markdown => print_series_markdown(&summaries, config.time_zone),
    }

    Ok(())
}
