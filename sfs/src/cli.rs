use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sfs", version, about = "shardfs command line client")]
pub struct Cli {
    /// Path to the cluster config file
    #[arg(long, global = true, env = "SHARDFS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a string as the content of a file
    Write { path: String, text: String },
    /// Print a file's content to stdout
    Read { path: String },
    /// Show a file's metadata record as JSON
    Stat { path: String },
    /// List file paths, optionally under a prefix
    Ls {
        #[arg(default_value = "")]
        prefix: String,
    },
    /// Delete a file and reclaim its blocks
    Rm { path: String },
    /// Upload a local file
    Put { local: PathBuf, remote: String },
    /// Download a file to a local path
    Get { remote: String, local: PathBuf },
}
