use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current namespace entry for one path.
///
/// `block_ids` defines byte-range order: concatenating the blocks in sequence
/// yields the file content, and their total length equals `size`. `version`
/// grows strictly with every update of the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub block_ids: Vec<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}
