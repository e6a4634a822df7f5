use clap::Parser;
use common::config::{ClusterConfig, load_config};
use mds::server;
use mds::state::MdsState;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "mds", version, about = "shardfs metadata server")]
struct Args {
    /// Cluster config file (YAML)
    #[arg(long, env = "SHARDFS_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ClusterConfig::default(),
    };
    let listen = args.listen.unwrap_or_else(|| config.mds.listen.clone());

    tracing::info!(journal = %config.mds.journal_path.display(), "starting mds");
    let state = Arc::new(MdsState::open(&config.mds.journal_path).await?);
    server::run(&listen, state).await
}
