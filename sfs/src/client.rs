//! Write and read pipelines over the two planes.
//!
//! A write never mutates anything in place: content goes to fresh block ids
//! first, then a single metadata commit makes the new version visible. A
//! write that dies between the two phases leaves orphaned blocks behind but
//! never a namespace entry pointing at missing content. Retrying a write
//! after an [`FsError::Ambiguous`] commit is safe: the retry uses fresh
//! block ids, so it either lands as the next version or fails cleanly.

use crate::remote::{RemoteBlockService, RemoteMetaService};
use crate::service::{BlockService, MetaService};
use bytes::Bytes;
use common::config::ClusterConfig;
use common::error::{FsError, FsResult};
use common::layout::BlockLayout;
use common::protocol::{CommitRequest, CommitResponse};
use common::types::FileRecord;
use futures::future::try_join_all;
use uuid::Uuid;

/// Progress of one write through the pipeline. Failure is not a state: the
/// pipeline exits with `Err` from whichever state it was in.
enum WriteState {
    Start,
    BlocksWritten {
        block_ids: Vec<String>,
        block_lengths: Vec<u64>,
    },
    MetadataCommitted {
        version: u64,
    },
}

pub struct FsClient<B, M> {
    layout: BlockLayout,
    blocks: B,
    meta: M,
}

/// Client wired to the HTTP servers.
pub type RemoteClient = FsClient<RemoteBlockService, RemoteMetaService>;

/// Builds a [`RemoteClient`] from the cluster config, connecting to the
/// configured MDS and datanode addresses.
pub fn connect(config: &ClusterConfig) -> anyhow::Result<RemoteClient> {
    let timeout = config.client.request_timeout();
    Ok(FsClient::new(
        config.layout.block_layout(),
        RemoteBlockService::new(&config.datanode.listen, timeout)?,
        RemoteMetaService::new(&config.mds.listen, timeout)?,
    ))
}

impl<B: BlockService, M: MetaService> FsClient<B, M> {
    pub fn new(layout: BlockLayout, blocks: B, meta: M) -> Self {
        Self {
            layout,
            blocks,
            meta,
        }
    }

    /// Writes `data` as the new content of `path` and returns the committed
    /// version. Empty content is stored as one empty block.
    pub async fn write(&self, path: &str, data: &[u8]) -> FsResult<CommitResponse> {
        let data = Bytes::copy_from_slice(data);
        let mut state = WriteState::Start;
        loop {
            state = match state {
                WriteState::Start => {
                    let ranges = self.layout.split_ranges(data.len());
                    let block_ids: Vec<String> =
                        ranges.iter().map(|_| fresh_block_id()).collect();
                    let block_lengths: Vec<u64> =
                        ranges.iter().map(|range| range.len() as u64).collect();
                    let writes = ranges.iter().zip(&block_ids).map(|(range, block_id)| {
                        self.blocks.write_block(block_id, data.slice(range.clone()))
                    });
                    try_join_all(writes).await?;
                    WriteState::BlocksWritten {
                        block_ids,
                        block_lengths,
                    }
                }
                WriteState::BlocksWritten {
                    block_ids,
                    block_lengths,
                } => {
                    let response = self
                        .meta
                        .commit(CommitRequest {
                            path: path.to_string(),
                            block_ids,
                            size: data.len() as u64,
                            block_lengths: Some(block_lengths),
                        })
                        .await?;
                    WriteState::MetadataCommitted {
                        version: response.version,
                    }
                }
                WriteState::MetadataCommitted { version } => {
                    tracing::debug!(path, version, "write committed");
                    return Ok(CommitResponse {
                        path: path.to_string(),
                        version,
                    });
                }
            };
        }
    }

    /// Reads the full content of `path`. Metadata that references blocks the
    /// block plane cannot produce intact is reported as
    /// [`FsError::CorruptedRead`], never as silently short content.
    pub async fn read(&self, path: &str) -> FsResult<Vec<u8>> {
        let record = self.meta.stat(path).await?;
        let mut content = Vec::with_capacity(record.size as usize);
        for block_id in &record.block_ids {
            match self.blocks.read_block(block_id).await? {
                Some(data) => content.extend_from_slice(&data),
                None => {
                    return Err(FsError::CorruptedRead(format!(
                        "{path} references missing block {block_id}"
                    )));
                }
            }
        }
        if content.len() as u64 != record.size {
            return Err(FsError::CorruptedRead(format!(
                "{path} recorded as {} bytes but blocks held {}",
                record.size,
                content.len()
            )));
        }
        Ok(content)
    }

    pub async fn stat(&self, path: &str) -> FsResult<FileRecord> {
        self.meta.stat(path).await
    }

    pub async fn list(&self, prefix: &str) -> FsResult<Vec<String>> {
        self.meta.list(prefix).await
    }

    /// Removes `path` from the namespace, then reclaims its blocks. Block
    /// reclamation is best effort: the namespace removal already happened,
    /// so a failed block delete only leaves unreferenced content behind.
    pub async fn delete(&self, path: &str) -> FsResult<FileRecord> {
        let record = self.meta.delete(path).await?;
        for block_id in &record.block_ids {
            if let Err(err) = self.blocks.delete_block(block_id).await {
                tracing::warn!(path, block_id, "orphaned block not reclaimed: {err}");
            }
        }
        Ok(record)
    }
}

/// Block ids are never reused: every write attempt names fresh ones.
fn fresh_block_id() -> String {
    Uuid::new_v4().simple().to_string()
}
