mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use eso_lib::EsoConfig;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "eso")]
#[command(about = "Fetch electricity statistics from the ESO customer portal")]
struct Cli {
    /// Path to a TOML config file (ESO_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: table, json, csv, or markdown
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputArg {
    Table,
    Json,
    Csv,
    Markdown,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Table => OutputFormat::Table,
            OutputArg::Json => OutputFormat::Json,
            OutputArg::Csv => OutputFormat::Csv,
            OutputArg::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the configured credentials are accepted
    Login,
    /// List the metering objects of the account
    Objects,
    /// Run one refresh cycle and print the resulting series
    Fetch(commands::fetch::FetchArgs),
    /// Refresh on the configured interval until interrupted
    Watch(commands::watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("eso=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = OutputFormat::from(cli.output);
    let config = EsoConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "Configuration loaded");

    match &cli.command {
        Commands::Login => commands::login::run(&config).await?,
        Commands::Objects => commands::objects::run(&config, &format).await?,
        Commands::Fetch(args) => commands::fetch::run(args, &config, &format).await?,
        Commands::Watch(args) => commands::watch::run(args, &config).await?,
    }

    Ok(())
}
