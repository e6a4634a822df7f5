//! In-memory service implementations for local development and tests.
//!
//! Semantics match the real servers: commits validate, versions grow with
//! every namespace mutation, `created_at` survives updates. Only durability
//! is missing.

use crate::service::{BlockService, MetaService};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use common::error::{FsError, FsResult};
use common::protocol::{CommitRequest, CommitResponse};
use common::types::FileRecord;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

#[derive(Clone, Default)]
pub struct MemBlockService {
    blocks: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemBlockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn block_count(&self) -> usize {
        self.blocks.read().await.len()
    }

    pub async fn contains(&self, block_id: &str) -> bool {
        self.blocks.read().await.contains_key(block_id)
    }

    /// Drops a block behind the client's back, as a failed disk would.
    pub async fn corrupt_by_removing(&self, block_id: &str) {
        self.blocks.write().await.remove(block_id);
    }
}

#[async_trait]
impl BlockService for MemBlockService {
    async fn write_block(&self, block_id: &str, data: Bytes) -> FsResult<()> {
        self.blocks
            .write()
            .await
            .insert(block_id.to_string(), data);
        Ok(())
    }

    async fn read_block(&self, block_id: &str) -> FsResult<Option<Bytes>> {
        Ok(self.blocks.read().await.get(block_id).cloned())
    }

    async fn delete_block(&self, block_id: &str) -> FsResult<()> {
        self.blocks.write().await.remove(block_id);
        Ok(())
    }
}

#[derive(Default)]
struct MemNamespace {
    records: BTreeMap<String, FileRecord>,
    seq: u64,
}

#[derive(Clone, Default)]
pub struct MemMetaService {
    inner: Arc<Mutex<MemNamespace>>,
}

impl MemMetaService {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetaService for MemMetaService {
    async fn commit(&self, request: CommitRequest) -> FsResult<CommitResponse> {
        request.validate()?;
        let mut ns = self.inner.lock().await;
        ns.seq += 1;
        let version = ns.seq;
        let now = Utc::now();
        let created_at = ns
            .records
            .get(&request.path)
            .map(|existing| existing.created_at)
            .unwrap_or(now);
        let record = FileRecord {
            path: request.path,
            size: request.size,
            block_ids: request.block_ids,
            version,
            created_at,
            modified_at: now,
        };
        let path = record.path.clone();
        ns.records.insert(path.clone(), record);
        Ok(CommitResponse { path, version })
    }

    async fn stat(&self, path: &str) -> FsResult<FileRecord> {
        self.inner
            .lock()
            .await
            .records
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(format!("no such file: {path}")))
    }

    async fn list(&self, prefix: &str) -> FsResult<Vec<String>> {
        let ns = self.inner.lock().await;
        Ok(ns
            .records
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect())
    }

    async fn delete(&self, path: &str) -> FsResult<FileRecord> {
        let mut ns = self.inner.lock().await;
        let record = ns
            .records
            .remove(path)
            .ok_or_else(|| FsError::NotFound(format!("no such file: {path}")))?;
        ns.seq += 1;
        Ok(record)
    }
}
