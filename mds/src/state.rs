//! In-memory namespace, rebuilt from the journal and kept in lockstep with it.

use crate::journal::{EntryOp, Journal, JournalEntry};
use common::error::{FsError, FsResult};
use common::protocol::CommitRequest;
use common::types::FileRecord;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};

/// Shared handle the HTTP handlers operate on.
///
/// Mutations serialize on the journal lock: seq assignment, the durable
/// append and the map update form one critical section, so journal order is
/// a total order over all mutations and replay is deterministic. Lookups
/// only take the namespace read lock and never wait behind disk writes.
#[derive(Debug)]
pub struct MdsState {
    journal: Mutex<Journal>,
    namespace: RwLock<BTreeMap<String, FileRecord>>,
}

impl MdsState {
    /// Replays the journal at `journal_path` and exposes the rebuilt
    /// namespace. The rebuilt state is exactly the state after the last
    /// durably appended mutation.
    pub async fn open(journal_path: impl AsRef<Path>) -> FsResult<Self> {
        let (journal, entries) = Journal::open(journal_path).await?;
        let mut namespace = BTreeMap::new();
        for entry in &entries {
            apply(&mut namespace, entry);
        }
        tracing::info!(
            entries = entries.len(),
            files = namespace.len(),
            next_seq = journal.next_seq(),
            "namespace rebuilt from journal"
        );
        Ok(Self {
            journal: Mutex::new(journal),
            namespace: RwLock::new(namespace),
        })
    }

    /// Creates or replaces the record for `req.path` and returns it. The
    /// record's version is the journal seq that made it visible; nothing is
    /// visible until the entry is durably appended.
    pub async fn commit(&self, req: CommitRequest) -> FsResult<FileRecord> {
        req.validate()?;

        let mut journal = self.journal.lock().await;
        // Mutations all hold the journal lock, so this read cannot race one.
        let op = if self.namespace.read().await.contains_key(&req.path) {
            EntryOp::Update
        } else {
            EntryOp::Create
        };
        let entry = journal.append(op, &req.path, req.block_ids, req.size).await?;

        let mut namespace = self.namespace.write().await;
        let record = upsert(&mut namespace, &entry);
        tracing::debug!(path = %record.path, version = record.version, "namespace committed");
        Ok(record)
    }

    pub async fn stat(&self, path: &str) -> FsResult<FileRecord> {
        self.namespace
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(format!("no such file: {path}")))
    }

    /// Paths currently in the namespace with the given prefix, sorted. An
    /// empty prefix lists everything. The result is a snapshot as of the
    /// call; concurrent mutations may land before the caller looks at it.
    pub async fn list(&self, prefix: &str) -> Vec<String> {
        let namespace = self.namespace.read().await;
        namespace
            .range(prefix.to_string()..)
            .take_while(|(path, _)| path.starts_with(prefix))
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Removes `path` and returns the record that was current, so the caller
    /// can release its blocks.
    pub async fn delete(&self, path: &str) -> FsResult<FileRecord> {
        let mut journal = self.journal.lock().await;
        let Some(current) = self.namespace.read().await.get(path).cloned() else {
            return Err(FsError::NotFound(format!("no such file: {path}")));
        };
        journal.append(EntryOp::Delete, path, Vec::new(), 0).await?;

        self.namespace.write().await.remove(path);
        tracing::debug!(path, version = current.version, "namespace entry deleted");
        Ok(current)
    }
}

fn apply(namespace: &mut BTreeMap<String, FileRecord>, entry: &JournalEntry) {
    match entry.op {
        EntryOp::Create | EntryOp::Update => {
            upsert(namespace, entry);
        }
        EntryOp::Delete => {
            namespace.remove(&entry.path);
        }
    }
}

/// Inserts or replaces the record described by a CREATE/UPDATE entry.
/// `created_at` survives updates of an existing path.
fn upsert(namespace: &mut BTreeMap<String, FileRecord>, entry: &JournalEntry) -> FileRecord {
    let created_at = namespace
        .get(&entry.path)
        .map(|existing| existing.created_at)
        .unwrap_or(entry.timestamp);
    let record = FileRecord {
        path: entry.path.clone(),
        size: entry.size,
        block_ids: entry.block_ids.clone(),
        version: entry.seq,
        created_at,
        modified_at: entry.timestamp,
    };
    namespace.insert(entry.path.clone(), record.clone());
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit_req(path: &str, block_ids: Vec<&str>, size: u64) -> CommitRequest {
        CommitRequest {
            path: path.to_string(),
            block_ids: block_ids.into_iter().map(String::from).collect(),
            size,
            block_lengths: None,
        }
    }

    async fn state_in(dir: &tempfile::TempDir) -> MdsState {
        MdsState::open(dir.path().join("journal.log")).await.unwrap()
    }

    #[tokio::test]
    async fn commit_then_stat_returns_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir).await;

        let committed = state.commit(commit_req("/a", vec!["b1", "b2"], 10)).await.unwrap();
        assert_eq!(committed.version, 1);

        let record = state.stat("/a").await.unwrap();
        assert_eq!(record, committed);
        assert_eq!(record.block_ids, vec!["b1", "b2"]);
        assert_eq!(record.size, 10);
    }

    #[tokio::test]
    async fn versions_follow_journal_seq() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir).await;

        let v1 = state.commit(commit_req("/a", vec!["b1"], 1)).await.unwrap().version;
        let v2 = state.commit(commit_req("/b", vec!["b2"], 1)).await.unwrap().version;
        let v3 = state.commit(commit_req("/a", vec!["b3"], 1)).await.unwrap().version;
        assert_eq!((v1, v2, v3), (1, 2, 3));

        // The update replaced the blocks but kept the original created_at.
        let record = state.stat("/a").await.unwrap();
        assert_eq!(record.block_ids, vec!["b3"]);
        assert!(record.modified_at >= record.created_at);
    }

    #[tokio::test]
    async fn stat_of_absent_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir).await;
        assert!(matches!(
            state.stat("/missing").await.unwrap_err(),
            FsError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn delete_removes_and_reports_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir).await;
        state.commit(commit_req("/a", vec!["b1"], 1)).await.unwrap();

        let removed = state.delete("/a").await.unwrap();
        assert_eq!(removed.block_ids, vec!["b1"]);
        assert!(matches!(
            state.stat("/a").await.unwrap_err(),
            FsError::NotFound(_)
        ));
        assert!(matches!(
            state.delete("/a").await.unwrap_err(),
            FsError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir).await;
        for path in ["/logs/b", "/data/x", "/logs/a", "/data/y"] {
            state.commit(commit_req(path, vec![path.trim_start_matches('/')], 1))
                .await
                .unwrap();
        }

        assert_eq!(state.list("/logs/").await, vec!["/logs/a", "/logs/b"]);
        assert_eq!(
            state.list("").await,
            vec!["/data/x", "/data/y", "/logs/a", "/logs/b"]
        );
        assert!(state.list("/nope").await.is_empty());
    }

    #[tokio::test]
    async fn invalid_commits_do_not_touch_namespace_or_journal() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(&dir).await;

        let err = state.commit(commit_req("relative", vec!["b"], 1)).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument(_)));
        let err = state.commit(commit_req("/a", vec![], 0)).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument(_)));

        let mut bad_lengths = commit_req("/a", vec!["b"], 5);
        bad_lengths.block_lengths = Some(vec![4]);
        let err = state.commit(bad_lengths).await.unwrap_err();
        assert!(matches!(err, FsError::InvalidArgument(_)));

        assert!(state.list("").await.is_empty());
        // Next successful commit still gets seq 1: nothing was appended.
        let v = state.commit(commit_req("/a", vec!["b"], 1)).await.unwrap().version;
        assert_eq!(v, 1);
    }

    #[tokio::test]
    async fn concurrent_commits_get_distinct_versions() {
        let dir = tempfile::tempdir().unwrap();
        let state = std::sync::Arc::new(state_in(&dir).await);

        let mut handles = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                state
                    .commit(commit_req(&format!("/f{i}"), vec![&format!("b{i}")], 1))
                    .await
                    .unwrap()
                    .version
            }));
        }
        let mut versions = Vec::new();
        for handle in handles {
            versions.push(handle.await.unwrap());
        }
        versions.sort_unstable();
        assert_eq!(versions, (1..=16).collect::<Vec<u64>>());
    }
}
