//! Cluster configuration.
//!
//! One YAML file describes the whole deployment; every section and field has
//! a default, so a missing file or a partial file both work. Binaries accept
//! the file via `--config` or the `SHARDFS_CONFIG` environment variable.

use crate::layout::{BlockLayout, DEFAULT_BLOCK_SIZE};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub mds: MdsSection,
    pub datanode: DataNodeSection,
    pub layout: LayoutSection,
    pub client: ClientSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MdsSection {
    pub listen: String,
    pub journal_path: PathBuf,
}

impl Default for MdsSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9000".to_string(),
            journal_path: PathBuf::from("./shardfs-data/mds/journal.log"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataNodeSection {
    pub listen: String,
    pub data_dir: PathBuf,
}

impl Default for DataNodeSection {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9101".to_string(),
            data_dir: PathBuf::from("./shardfs-data/datanode"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub block_size: u32,
}

impl Default for LayoutSection {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl LayoutSection {
    pub fn block_layout(&self) -> BlockLayout {
        BlockLayout::new(self.block_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    pub request_timeout_ms: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
        }
    }
}

impl ClientSection {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub fn load_config(path: &Path) -> Result<ClusterConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    let config: ClusterConfig =
        serde_yaml::from_str(&content).context("failed to parse YAML config")?;
    if config.layout.block_size == 0 {
        bail!("layout.block_size must be positive");
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "mds:\n  listen: \"0.0.0.0:7000\"").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.mds.listen, "0.0.0.0:7000");
        assert_eq!(config.datanode.listen, "127.0.0.1:9101");
        assert_eq!(config.layout.block_size, DEFAULT_BLOCK_SIZE);
        assert_eq!(config.client.request_timeout_ms, 5000);
    }

    #[test]
    fn full_file_round_trips() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "mds:\n  listen: \"127.0.0.1:9000\"\n  journal_path: \"/tmp/j.log\"\n\
             datanode:\n  listen: \"127.0.0.1:9101\"\n  data_dir: \"/tmp/dn\"\n\
             layout:\n  block_size: 1024\n\
             client:\n  request_timeout_ms: 250"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.mds.journal_path, PathBuf::from("/tmp/j.log"));
        assert_eq!(config.datanode.data_dir, PathBuf::from("/tmp/dn"));
        assert_eq!(config.layout.block_layout().block_size, 1024);
        assert_eq!(config.client.request_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn zero_block_size_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "layout:\n  block_size: 0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/definitely/not/here.yaml")).is_err());
    }
}
