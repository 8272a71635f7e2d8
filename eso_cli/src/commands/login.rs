//! The `login` subcommand: verify credentials against the portal.

use anyhow::Result;
use eso_lib::{Client, EsoConfig};

pub async fn run(config: &EsoConfig) -> Result<()> {
    let client = Client::with_base_url(&config.base_url);
    let session = client
        .authenticate(&config.username, &config.password)
        .await?;

    if session.is_empty() {
        eprintln!(
            "Login accepted for {}, but the portal set no session cookie",
            config.username
        );
    } else {
        eprintln!("Logged in to {} as {}", client.base_url(), config.username);
    }
    Ok(())
}
