//! Append-only JSON Lines journal backing a pending-trade queue.
//!
//! Each line is one record: `{"op":"push","entry":{...}}` or `{"op":"pop"}`.
//! Replaying the journal in order rebuilds the FIFO, so a queue's backlog
//! survives a restart. Opening compacts the file to the surviving entries,
//! and the file is truncated whenever the queue drains.
//!
//! Uses append mode: a write interrupted mid-line only corrupts that line,
//! which replay skips with a warning.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use dexop_core::PendingTradeEntry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::store::PendingTradeStore;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum JournalRecord {
    Push { entry: PendingTradeEntry },
    Pop,
}

struct JournalState {
    pending: VecDeque<PendingTradeEntry>,
    writer: BufWriter<File>,
}

/// File-backed pending-trade store.
pub struct JournalTradeStore {
    path: PathBuf,
    state: Mutex<JournalState>,
}

impl JournalTradeStore {
    /// Open (or create) the journal for queue `name` under `dir`.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> StoreResult<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(name));

        let pending = if path.exists() {
            Self::replay(&path)?
        } else {
            VecDeque::new()
        };

        let writer = Self::rewrite(&path, &pending)?;
        info!(
            path = %path.display(),
            pending = pending.len(),
            "Opened trade journal"
        );

        Ok(Self {
            path,
            state: Mutex::new(JournalState { pending, writer }),
        })
    }

    /// Journal file name for a queue; `:` is not portable in file names.
    fn file_name(name: &str) -> String {
        let safe: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{safe}.jsonl")
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replay(path: &Path) -> StoreResult<VecDeque<PendingTradeEntry>> {
        let reader = BufReader::new(File::open(path)?);
        let mut pending = VecDeque::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<JournalRecord>(&line) {
                Ok(JournalRecord::Push { entry }) => pending.push_back(entry),
                Ok(JournalRecord::Pop) => {
                    pending.pop_front();
                }
                Err(e) => {
                    warn!(path = %path.display(), line = index + 1, error = %e, "Skipping corrupt journal line");
                }
            }
        }

        Ok(pending)
    }

    /// Replace the file with one push record per entry and reopen in append mode.
    fn rewrite(path: &Path, pending: &VecDeque<PendingTradeEntry>) -> StoreResult<BufWriter<File>> {
        let tmp = path.with_extension("jsonl.tmp");
        {
            let mut out = BufWriter::new(File::create(&tmp)?);
            for entry in pending {
                Self::write_record(&mut out, &JournalRecord::Push { entry: entry.clone() })?;
            }
            out.flush()?;
        }
        std::fs::rename(&tmp, path)?;

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(BufWriter::new(file))
    }

    fn write_record(out: &mut impl Write, record: &JournalRecord) -> StoreResult<()> {
        serde_json::to_writer(&mut *out, record)?;
        out.write_all(b"\n")?;
        Ok(())
    }

    fn append(state: &mut JournalState, record: &JournalRecord) -> StoreResult<()> {
        Self::write_record(&mut state.writer, record)?;
        state.writer.flush()?;
        Ok(())
    }

    fn truncate(&self, state: &mut JournalState) -> StoreResult<()> {
        state.writer.flush()?;
        // Append-mode writes land at the new end.
        state.writer.get_ref().set_len(0)?;
        debug!(path = %self.path.display(), "Truncated trade journal");
        Ok(())
    }
}

impl PendingTradeStore for JournalTradeStore {
    fn publish(&self, entry: &PendingTradeEntry) -> StoreResult<()> {
        let mut state = self.state.lock();
        Self::append(
            &mut state,
            &JournalRecord::Push {
                entry: entry.clone(),
            },
        )?;
        state.pending.push_back(entry.clone());
        Ok(())
    }

    fn pop(&self) -> StoreResult<PendingTradeEntry> {
        let mut state = self.state.lock();
        if state.pending.is_empty() {
            return Err(StoreError::EmptyQueue);
        }

        if state.pending.len() == 1 {
            self.truncate(&mut state)?;
        } else {
            Self::append(&mut state, &JournalRecord::Pop)?;
        }
        state.pending.pop_front().ok_or(StoreError::EmptyQueue)
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.state.lock().pending.len())
    }

    fn purge(&self) -> StoreResult<()> {
        let mut state = self.state.lock();
        self.truncate(&mut state)?;
        state.pending.clear();
        Ok(())
    }
}

impl std::fmt::Debug for JournalTradeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalTradeStore")
            .field("path", &self.path)
            .field("pending", &self.state.lock().pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::entries;
    use tempfile::TempDir;

    const QUEUE: &str = "TX_QUEUES:0xabc";

    #[test]
    fn test_backlog_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let batch = entries(3);
        {
            let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
            for entry in &batch {
                store.publish(entry).unwrap();
            }
            assert_eq!(store.pop().unwrap().trade.hash, batch[0].trade.hash);
        }

        let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.pop().unwrap().trade.hash, batch[1].trade.hash);
        assert_eq!(store.pop().unwrap().trade.hash, batch[2].trade.hash);
        assert!(matches!(store.pop(), Err(StoreError::EmptyQueue)));
    }

    #[test]
    fn test_file_name_is_sanitized() {
        let dir = TempDir::new().unwrap();
        let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
        assert_eq!(
            store.path().file_name().unwrap().to_str().unwrap(),
            "TX_QUEUES_0xabc.jsonl"
        );
    }

    #[test]
    fn test_drained_journal_is_truncated() {
        let dir = TempDir::new().unwrap();
        let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
        for entry in &entries(2) {
            store.publish(entry).unwrap();
        }
        store.pop().unwrap();
        store.pop().unwrap();

        assert_eq!(std::fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_purge_clears_file() {
        let dir = TempDir::new().unwrap();
        let path = {
            let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
            for entry in &entries(2) {
                store.publish(entry).unwrap();
            }
            store.purge().unwrap();
            store.path().to_path_buf()
        };

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_corrupt_line_skipped() {
        let dir = TempDir::new().unwrap();
        let batch = entries(2);
        let path = {
            let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
            store.publish(&batch[0]).unwrap();
            store.path().to_path_buf()
        };

        // Interrupted write followed by a good record.
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"{\"op\":\"push\",\"entr\n").unwrap();
        let line = serde_json::to_string(&JournalRecord::Push {
            entry: batch[1].clone(),
        })
        .unwrap();
        writeln!(file, "{line}").unwrap();
        drop(file);

        let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(store.pop().unwrap().trade.hash, batch[0].trade.hash);
        assert_eq!(store.pop().unwrap().trade.hash, batch[1].trade.hash);
    }

    #[test]
    fn test_open_compacts_pop_records() {
        let dir = TempDir::new().unwrap();
        let batch = entries(3);
        let path = {
            let store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
            for entry in &batch {
                store.publish(entry).unwrap();
            }
            store.pop().unwrap();
            store.path().to_path_buf()
        };

        let _store = JournalTradeStore::open(dir.path(), QUEUE).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("\"op\":\"pop\""));
    }
}
