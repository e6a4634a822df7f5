//! Backend abstractions the client pipeline is written against.
//!
//! The HTTP servers sit behind [`crate::remote`]; [`crate::mem`] provides
//! process-local implementations so the pipeline can be exercised without
//! sockets.

use async_trait::async_trait;
use bytes::Bytes;
use common::error::FsResult;
use common::protocol::{CommitRequest, CommitResponse};
use common::types::FileRecord;

/// Block plane: immutable content addressed by block id.
#[async_trait]
pub trait BlockService: Send + Sync {
    /// Stores `data` under `block_id`. Observable only in full or not at all.
    async fn write_block(&self, block_id: &str, data: Bytes) -> FsResult<()>;

    /// Returns the block's bytes, or `None` if no such block exists.
    async fn read_block(&self, block_id: &str) -> FsResult<Option<Bytes>>;

    /// Removes the block. Deleting an absent block is not an error.
    async fn delete_block(&self, block_id: &str) -> FsResult<()>;
}

/// Metadata plane: the journaled file namespace.
#[async_trait]
pub trait MetaService: Send + Sync {
    /// Publishes a file's block list. The file becomes visible atomically.
    async fn commit(&self, request: CommitRequest) -> FsResult<CommitResponse>;

    /// Looks up one file's record by absolute path.
    async fn stat(&self, path: &str) -> FsResult<FileRecord>;

    /// Paths with the given prefix, in sorted order.
    async fn list(&self, prefix: &str) -> FsResult<Vec<String>>;

    /// Removes a file from the namespace and returns its last record.
    async fn delete(&self, path: &str) -> FsResult<FileRecord>;
}
