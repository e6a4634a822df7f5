use clap::Parser;
use common::config::{ClusterConfig, load_config};
use datanode::server;
use datanode::store::BlockStore;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "datanode", version, about = "shardfs block server")]
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
    let listen = args.listen.unwrap_or_else(|| config.datanode.listen.clone());

    tracing::info!(data_dir = %config.datanode.data_dir.display(), "starting datanode");
    let store = BlockStore::open(&config.datanode.data_dir).await?;
    server::run(&listen, Arc::new(store)).await
}
