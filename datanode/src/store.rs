//! Local block persistence with atomic visibility.
//!
//! The path layout under the store root is:
//!
//!   <root>
//!   ├── blocks
//!   │   └── <block_id>.blk
//!   └── uploads
//!       └── <uuid>
//!
//! A block is first written and fsynced under `uploads/`, then renamed into
//! `blocks/` in one step. A block path therefore either does not exist or
//! holds the complete content; a crash mid-write leaves only an invisible
//! temporary, which the next startup sweeps away.

use bytes::Bytes;
use common::error::{FsError, FsResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, create_dir_all, read_dir, remove_file, rename};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const BLOCKS_DIR: &str = "blocks";
const UPLOADS_DIR: &str = "uploads";

pub struct BlockStore {
    root: PathBuf,
}

impl BlockStore {
    /// Opens the store rooted at `root`, creating the layout if needed and
    /// sweeping upload temporaries left behind by a previous crash.
    pub async fn open(root: impl Into<PathBuf>) -> FsResult<Self> {
        let root = root.into();
        create_dir_all(root.join(BLOCKS_DIR)).await?;
        create_dir_all(root.join(UPLOADS_DIR)).await?;
        let store = Self { root };
        store.sweep_uploads().await?;
        Ok(store)
    }

    /// Persists `data` under `block_id`. The content is fully on disk before
    /// it becomes visible; re-writing an existing id replaces it atomically,
    /// so retries with identical bytes are safe.
    pub async fn write(&self, block_id: &str, data: &[u8]) -> FsResult<()> {
        validate_block_id(block_id)?;
        let temp = self.fresh_upload_path();
        if let Err(err) = persist(&temp, data).await {
            let _ = remove_file(&temp).await;
            return Err(err.into());
        }
        if let Err(err) = rename(&temp, self.block_path(block_id)).await {
            let _ = remove_file(&temp).await;
            return Err(err.into());
        }
        Ok(())
    }

    pub async fn read(&self, block_id: &str) -> FsResult<Option<Bytes>> {
        validate_block_id(block_id)?;
        match tokio::fs::read(self.block_path(block_id)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes a block. Absent ids succeed, so double deletes and retries
    /// are harmless.
    pub async fn delete(&self, block_id: &str) -> FsResult<()> {
        validate_block_id(block_id)?;
        match remove_file(self.block_path(block_id)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn contains(&self, block_id: &str) -> FsResult<bool> {
        validate_block_id(block_id)?;
        match tokio::fs::metadata(self.block_path(block_id)).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn block_path(&self, block_id: &str) -> PathBuf {
        self.root.join(BLOCKS_DIR).join(format!("{block_id}.blk"))
    }

    fn fresh_upload_path(&self) -> PathBuf {
        self.root
            .join(UPLOADS_DIR)
            .join(Uuid::new_v4().simple().to_string())
    }

    async fn sweep_uploads(&self) -> FsResult<()> {
        let mut stale = 0u64;
        let mut dir = read_dir(self.root.join(UPLOADS_DIR)).await?;
        while let Some(dentry) = dir.next_entry().await? {
            remove_file(dentry.path()).await?;
            stale += 1;
        }
        if stale > 0 {
            tracing::warn!(stale, root = %self.root.display(), "swept stale upload temporaries");
        }
        Ok(())
    }
}

async fn persist(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(data).await?;
    file.flush().await?;
    file.sync_all().await
}

/// A block id becomes a file name, so reject anything that could point
/// outside `blocks/` before a path is ever formed.
fn validate_block_id(block_id: &str) -> FsResult<()> {
    let ok = !block_id.is_empty()
        && !block_id.starts_with('.')
        && block_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if ok {
        Ok(())
    } else {
        Err(FsError::InvalidArgument(format!(
            "invalid block id: {block_id:?}"
        )))
    }
}
