//! CLI subcommand implementations.

use std::fs::{File, OpenOptions};
use std::path::Path;

use anyhow::{Context, Result};

pub mod fetch;
pub mod login;
pub mod objects;
pub mod watch;

/// Opens a JSON-lines file for appending, creating it when missing.
fn open_jsonl(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))
}
