mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use common::config::{ClusterConfig, load_config};
use sfs::client;
use tokio::io::AsyncWriteExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClusterConfig::default(),
    };
    let client = client::connect(&config)?;

    match cli.command {
        Commands::Write { path, text } => {
            let response = client.write(&path, text.as_bytes()).await?;
            println!("committed {} at version {}", response.path, response.version);
        }
        Commands::Read { path } => {
            let content = client.read(&path).await?;
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&content).await?;
            stdout.flush().await?;
        }
        Commands::Stat { path } => {
            let record = client.stat(&path).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Ls { prefix } => {
            for path in client.list(&prefix).await? {
                println!("{path}");
            }
        }
        Commands::Rm { path } => {
            let removed = client.delete(&path).await?;
            println!("deleted {} (was version {})", removed.path, removed.version);
        }
        Commands::Put { local, remote } => {
            let data = tokio::fs::read(&local)
                .await
                .with_context(|| format!("failed to read {}", local.display()))?;
            let response = client.write(&remote, &data).await?;
            println!(
                "committed {} at version {} ({} bytes)",
                response.path,
                response.version,
                data.len()
            );
        }
        Commands::Get { remote, local } => {
            let content = client.read(&remote).await?;
            tokio::fs::write(&local, &content)
                .await
                .with_context(|| format!("failed to write {}", local.display()))?;
            println!("fetched {} ({} bytes)", remote, content.len());
        }
    }
    Ok(())
}
