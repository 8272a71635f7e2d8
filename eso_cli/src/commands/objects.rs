//! The `objects` subcommand: list meters selectable in the consumption form.

use anyhow::Result;
use eso_lib::{Client, EsoConfig};

use crate::output::{
    print_json, print_objects_csv, print_objects_markdown, print_objects_table, OutputFormat,
};

pub async fn run(config: &EsoConfig, format: &OutputFormat) -> Result<()> {
    let client = Client::with_base_url(&config.base_url);
    let session = client
        .authenticate(&config.username, &config.password)
        .await?;
    let objects = client.list_objects(&session).await?;

    eprintln!("{} objects", objects.len());

    match format {
        OutputFormat::Table => print_objects_table(&objects),
        OutputFormat::Json => print_json(&objects),
        OutputFormat::Csv => print_objects_csv(&objects)?,
        OutputFormat::Markdown => print_objects_markdown(&objects),
    }

    Ok(())
}
