//! Append-only metadata journal.
//!
//! Every namespace mutation becomes one JSON line, flushed to stable storage
//! before the append returns. On startup the whole file is replayed to
//! rebuild the namespace. A torn trailing write (crash between write and
//! fsync) is detected, logged and truncated away so the next append starts
//! clean. Damage anywhere before the tail means the log can no longer prove
//! it is complete and is reported as corruption instead of being skipped.

use chrono::{DateTime, Utc};
use common::error::{FsError, FsResult};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Encoding version stamped into every entry.
pub const ENTRY_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryOp {
    Create,
    Update,
    Delete,
}

/// One durable namespace mutation. `seq` is strictly increasing and gapless
/// from 1; entries are immutable once appended. Deletes carry no blocks and
/// a size of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub v: u32,
    pub seq: u64,
    pub op: EntryOp,
    pub path: String,
    pub block_ids: Vec<String>,
    pub size: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Journal {
    file: File,
    path: PathBuf,
    next_seq: u64,
    committed_len: u64,
}

impl Journal {
    /// Opens (creating if absent) the journal at `path` and replays it.
    /// Returns the journal positioned for appends plus the recovered entries
    /// in `seq` order.
    pub async fn open(path: impl AsRef<Path>) -> FsResult<(Self, Vec<JournalEntry>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };

        let scan = scan_entries(&data)?;
        if scan.valid_len < data.len() as u64 {
            tracing::warn!(
                journal = %path.display(),
                discarded = data.len() as u64 - scan.valid_len,
                "discarding torn bytes at the journal tail"
            );
            let repair = OpenOptions::new().write(true).open(&path).await?;
            repair.set_len(scan.valid_len).await?;
            repair.sync_all().await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let next_seq = scan.entries.last().map(|entry| entry.seq + 1).unwrap_or(1);
        Ok((
            Self {
                file,
                path,
                next_seq,
                committed_len: scan.valid_len,
            },
            scan.entries,
        ))
    }

    /// Durably appends one mutation. The entry is on stable storage when this
    /// returns. On failure the file is rolled back to its last committed
    /// length so a partial line cannot poison a later append.
    pub async fn append(
        &mut self,
        op: EntryOp,
        path: &str,
        block_ids: Vec<String>,
        size: u64,
    ) -> FsResult<JournalEntry> {
        let entry = JournalEntry {
            v: ENTRY_VERSION,
            seq: self.next_seq,
            op,
            path: path.to_string(),
            block_ids,
            size,
            timestamp: Utc::now(),
        };
        let mut line = serde_json::to_vec(&entry)
            .map_err(|err| FsError::IoFailure(format!("encode journal entry: {err}")))?;
        line.push(b'\n');

        if let Err(err) = self.write_durably(&line).await {
            if let Err(rollback) = self.file.set_len(self.committed_len).await {
                tracing::warn!(
                    journal = %self.path.display(),
                    "failed to drop partial journal write: {rollback}"
                );
            }
            return Err(err.into());
        }

        self.committed_len += line.len() as u64;
        self.next_seq += 1;
        Ok(entry)
    }

    /// Sequence number the next appended entry will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    async fn write_durably(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line).await?;
        self.file.flush().await?;
        self.file.sync_all().await
    }
}

struct Scan {
    entries: Vec<JournalEntry>,
    /// Bytes from the start of the file covered by intact entries. Anything
    /// past this offset is a torn tail and safe to drop.
    valid_len: u64,
}

fn scan_entries(data: &[u8]) -> FsResult<Scan> {
    let mut entries: Vec<JournalEntry> = Vec::new();
    let mut valid_len = 0u64;
    let mut pos = 0usize;
    let mut tail_garbage = false;

    while pos < data.len() {
        // The final segment without a newline is a torn tail by definition.
        let Some(offset) = data[pos..].iter().position(|b| *b == b'\n') else {
            break;
        };
        let line = &data[pos..pos + offset];
        let next = pos + offset + 1;

        if line.iter().all(|b| b.is_ascii_whitespace()) {
            if !tail_garbage {
                valid_len = next as u64;
            }
            pos = next;
            continue;
        }

        match serde_json::from_slice::<JournalEntry>(line) {
            Ok(entry) => {
                if tail_garbage {
                    return Err(FsError::Corrupt(format!(
                        "unreadable journal line followed by entry seq {}",
                        entry.seq
                    )));
                }
                if entry.v != ENTRY_VERSION {
                    return Err(FsError::Corrupt(format!(
                        "unsupported journal entry version {} at seq {}",
                        entry.v, entry.seq
                    )));
                }
                let expected = entries.last().map(|prev| prev.seq + 1).unwrap_or(1);
                if entry.seq != expected {
                    return Err(FsError::Corrupt(format!(
                        "journal seq {} where {} was expected",
                        entry.seq, expected
                    )));
                }
                entries.push(entry);
                valid_len = next as u64;
            }
            Err(_) => {
                // Only repairable if nothing valid follows; decided below.
                tail_garbage = true;
            }
        }
        pos = next;
    }

    Ok(Scan { entries, valid_len })
}
