//! Request and response bodies shared by the servers and the client.

use crate::error::{FsError, FsResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Body of `POST /files/commit` on the MDS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub path: String,
    pub block_ids: Vec<String>,
    pub size: u64,
    /// Per-block byte lengths in `block_ids` order. Optional; when present
    /// the server cross-checks them against `size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_lengths: Option<Vec<u64>>,
}

impl CommitRequest {
    /// Structural validation shared by every metadata backend.
    pub fn validate(&self) -> FsResult<()> {
        if self.path.is_empty() || !self.path.starts_with('/') {
            return Err(FsError::InvalidArgument(format!(
                "path must be absolute: {:?}",
                self.path
            )));
        }
        if self.block_ids.is_empty() {
            return Err(FsError::InvalidArgument(format!(
                "{} must reference at least one block",
                self.path
            )));
        }
        let mut seen = HashSet::new();
        for block_id in &self.block_ids {
            if block_id.is_empty() {
                return Err(FsError::InvalidArgument(format!(
                    "{} references an empty block id",
                    self.path
                )));
            }
            if !seen.insert(block_id) {
                return Err(FsError::InvalidArgument(format!(
                    "{} references block {} more than once",
                    self.path, block_id
                )));
            }
        }
        if let Some(lengths) = &self.block_lengths {
            if lengths.len() != self.block_ids.len() {
                return Err(FsError::InvalidArgument(format!(
                    "{} block lengths supplied for {} blocks",
                    lengths.len(),
                    self.block_ids.len()
                )));
            }
            let total: u64 = lengths.iter().sum();
            if total != self.size {
                return Err(FsError::InvalidArgument(format!(
                    "declared size {} does not match block lengths totalling {}",
                    self.size, total
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub path: String,
    pub version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub paths: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CommitRequest {
        CommitRequest {
            path: "/a/b".to_string(),
            block_ids: vec!["b1".to_string(), "b2".to_string()],
            size: 10,
            block_lengths: Some(vec![8, 2]),
        }
    }

    #[test]
    fn well_formed_request_passes() {
        request().validate().unwrap();
    }

    #[test]
    fn relative_path_is_rejected() {
        let mut req = request();
        req.path = "a/b".to_string();
        assert!(req.validate().is_err());
        req.path = String::new();
        assert!(req.validate().is_err());
    }

    #[test]
    fn empty_block_list_is_rejected() {
        let mut req = request();
        req.block_ids.clear();
        req.block_lengths = None;
        assert!(req.validate().is_err());
    }

    #[test]
    fn duplicate_block_id_is_rejected() {
        let mut req = request();
        req.block_ids = vec!["b1".to_string(), "b1".to_string()];
        req.block_lengths = None;
        assert!(req.validate().is_err());
    }

    #[test]
    fn length_total_must_match_size() {
        let mut req = request();
        req.block_lengths = Some(vec![8, 3]);
        assert!(req.validate().is_err());

        let mut req = request();
        req.block_lengths = Some(vec![10]);
        assert!(req.validate().is_err(), "count mismatch must fail");
    }

    #[test]
    fn omitted_lengths_are_trusted() {
        let mut req = request();
        req.block_lengths = None;
        req.size = 12345;
        req.validate().unwrap();
    }

    #[test]
    fn absent_lengths_stay_off_the_wire() {
        let mut req = request();
        req.block_lengths = None;
        let encoded = serde_json::to_string(&req).unwrap();
        assert!(!encoded.contains("block_lengths"));

        let decoded: CommitRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.block_lengths, None);
        assert_eq!(decoded.block_ids, req.block_ids);
    }
}
