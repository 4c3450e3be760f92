//! Write-ahead log of committed batches.
//!
//! Newline-delimited JSON, one [`WalRecord`] per line. A batch is
//! appended and synced before it is applied in memory, so after a crash
//! replaying the log reproduces exactly the batches that were visible.
//! A torn final line (crash mid-write) is dropped on open; damage anywhere
//! else is reported as a store failure.
//!
//! An append that fails part-way is cut back to the last durable line
//! before the error is returned. If that cut fails too, the log refuses
//! every later append.

use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use kernex_types::{KernexError, Result};
use serde::{Deserialize, Serialize};

use crate::batch::WriteBatch;

/// One log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalRecord {
    /// Position of the batch in commit order, starting at 1.
    pub seq: u64,
    pub batch: WriteBatch,
}

/// Encode a record as a single JSON line (without the newline).
pub fn record_to_json(record: &WalRecord) -> Result<String> {
    serde_json::to_string(record).map_err(|e| KernexError::Serialization(e.to_string()))
}

/// Decode one JSON line.
pub fn record_from_json(line: &str) -> Result<WalRecord> {
    serde_json::from_str(line).map_err(|e| KernexError::Serialization(e.to_string()))
}

/// Byte sink behind the log.
pub trait LogFile: Write {
    /// Make every written byte durable.
    fn sync(&mut self) -> io::Result<()>;

    /// Cut the file back to `len` bytes and make that durable.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.sync_data()
    }
}

/// Append handle on the log file.
#[derive(Debug)]
pub struct WriteAheadLog<F = File> {
    path: PathBuf,
    file: F,
    /// Length of the durable prefix.
    len: u64,
    last_seq: u64,
    poisoned: bool,
}

impl WriteAheadLog {
    /// Open (or create) the log and return the records already in it.
    ///
    /// # Errors
    /// - `Io` if the file cannot be opened, read, or truncated
    /// - `Store` if a line other than the last fails to decode, or
    ///   sequence numbers are not consecutive
    pub fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<WalRecord>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let (records, good_len) = Self::decode(&raw)?;
        if good_len < raw.len() {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = raw.len() - good_len,
                "Dropping torn tail of write-ahead log"
            );
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(good_len as u64)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let len = file.metadata()?.len();
        let last_seq = records.last().map_or(0, |r| r.seq);
        tracing::info!(
            path = %path.display(),
            batches = records.len(),
            "Write-ahead log opened"
        );
        Ok((
            Self {
                path,
                file,
                len,
                last_seq,
                poisoned: false,
            },
            records,
        ))
    }

    /// Parse every complete line. Returns the records and the byte length
    /// of the intact prefix.
    fn decode(raw: &str) -> Result<(Vec<WalRecord>, usize)> {
        let mut records = Vec::new();
        let mut offset = 0;
        let mut lines = raw.split_inclusive('\n').peekable();
        while let Some(line) = lines.next() {
            let is_last = lines.peek().is_none();
            let complete = line.ends_with('\n');
            let body = line.trim_end();
            if body.is_empty() {
                offset += line.len();
                continue;
            }
            match record_from_json(body) {
                Ok(record) if complete => {
                    let expected = records.last().map_or(1, |r: &WalRecord| r.seq + 1);
                    if record.seq != expected {
                        return Err(KernexError::Store(format!(
                            "write-ahead log out of sequence: expected {expected}, found {}",
                            record.seq
                        )));
                    }
                    records.push(record);
                    offset += line.len();
                }
                Err(e) if !is_last => {
                    return Err(KernexError::Store(format!(
                        "write-ahead log corrupt at byte {offset}: {e}"
                    )));
                }
                // Final line unterminated or undecodable: never acknowledged.
                _ => break,
            }
        }
        Ok((records, offset))
    }

}

impl<F: LogFile> WriteAheadLog<F> {
    /// Durably append a batch. Returns its sequence number.
    ///
    /// # Errors
    /// - `Serialization` or `Io`; the file is cut back to its previous
    ///   length and the batch must not be applied
    /// - `Store` once a failed append could not be cut back
    pub fn append(&mut self, batch: &WriteBatch) -> Result<u64> {
        if self.poisoned {
            return Err(KernexError::Store(format!(
                "write-ahead log {} holds an unrecoverable partial append",
                self.path.display()
            )));
        }
        let record = WalRecord {
            seq: self.last_seq + 1,
            batch: batch.clone(),
        };
        let mut line = record_to_json(&record)?;
        line.push('\n');
        if let Err(e) = self.write_durably(line.as_bytes()) {
            self.roll_back(record.seq, &e);
            return Err(e.into());
        }
        self.len += line.len() as u64;
        self.last_seq = record.seq;
        Ok(record.seq)
    }

    fn write_durably(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.flush()?;
        self.file.sync()
    }

    fn roll_back(&mut self, seq: u64, cause: &io::Error) {
        match self.file.truncate(self.len) {
            Ok(()) => {
                tracing::warn!(seq, error = %cause, "Write-ahead log append failed; rolled back");
            }
            Err(e) => {
                self.poisoned = true;
                tracing::error!(
                    seq,
                    error = %cause,
                    rollback_error = %e,
                    "Write-ahead log append failed and could not be rolled back"
                );
            }
        }
    }

    /// Whether a failed append left bytes that could not be removed.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Sequence number of the last durable batch (0 when empty).
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernex_types::{AccountId, Currency};
    use rust_decimal::Decimal;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("kernex-wal-{}.log", uuid::Uuid::now_v7()))
    }

    fn batch() -> WriteBatch {
        let account = AccountId::new();
        let mut batch = WriteBatch::new();
        batch
            .open_account(account)
            .adjust(account, Currency::Litecoin, Decimal::new(1000, 0));
        batch
    }

    #[test]
    fn empty_log_has_no_records() {
        let path = temp_path();
        let (wal, records) = WriteAheadLog::open(&path).unwrap();
        assert!(records.is_empty());
        assert_eq!(wal.last_seq(), 0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn appended_batches_are_replayed_in_order() {
        let path = temp_path();
        let (first, second) = (batch(), batch());
        {
            let (mut wal, _) = WriteAheadLog::open(&path).unwrap();
            assert_eq!(wal.append(&first).unwrap(), 1);
            assert_eq!(wal.append(&second).unwrap(), 2);
        }
        let (wal, records) = WriteAheadLog::open(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].batch, first);
        assert_eq!(records[1].batch, second);
        assert_eq!(wal.last_seq(), 2);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn torn_tail_is_dropped_and_log_stays_appendable() {
        let path = temp_path();
        {
            let (mut wal, _) = WriteAheadLog::open(&path).unwrap();
            wal.append(&batch()).unwrap();
        }
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(b"{\"seq\":2,\"batch\":{\"mutat").unwrap();
        }
        {
            let (mut wal, records) = WriteAheadLog::open(&path).unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(wal.append(&batch()).unwrap(), 2);
        }
        let (_, records) = WriteAheadLog::open(&path).unwrap();
        assert_eq!(records.len(), 2);
        std::fs::remove_file(path).ok();
    }

    /// A file whose writes and syncs can be made to fail.
    struct FlakyFile {
        inner: File,
        short_write: bool,
        fail_sync: bool,
        fail_truncate: bool,
    }

    impl Write for FlakyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.short_write {
                self.inner.write_all(&buf[..buf.len() / 2])?;
                return Err(io::Error::other("disk full"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl LogFile for FlakyFile {
        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::other("sync failed"));
            }
            self.inner.sync_data()
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.fail_truncate {
                return Err(io::Error::other("read-only"));
            }
            LogFile::truncate(&mut self.inner, len)
        }
    }

    /// Reopen an existing log through a [`FlakyFile`].
    fn flaky(path: &Path) -> WriteAheadLog<FlakyFile> {
        let (wal, _) = WriteAheadLog::open(path).unwrap();
        let inner = OpenOptions::new().append(true).open(path).unwrap();
        WriteAheadLog {
            path: wal.path,
            file: FlakyFile {
                inner,
                short_write: false,
                fail_sync: false,
                fail_truncate: false,
            },
            len: wal.len,
            last_seq: wal.last_seq,
            poisoned: false,
        }
    }

    #[test]
    fn failed_sync_is_rolled_back() {
        let path = temp_path();
        {
            let (mut wal, _) = WriteAheadLog::open(&path).unwrap();
            wal.append(&batch()).unwrap();
        }
        let before = std::fs::metadata(&path).unwrap().len();

        let mut wal = flaky(&path);
        wal.file.fail_sync = true;
        let err = wal.append(&batch()).unwrap_err();
        assert!(matches!(err, KernexError::Io(_)), "got {err:?}");
        assert_eq!(wal.last_seq(), 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), before);

        // The next append reuses the sequence number and the log replays.
        wal.file.fail_sync = false;
        let kept = batch();
        assert_eq!(wal.append(&kept).unwrap(), 2);
        drop(wal);
        let (_, records) = WriteAheadLog::open(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].batch, kept);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn short_write_is_rolled_back() {
        let path = temp_path();
        let mut wal = flaky(&path);
        wal.file.short_write = true;
        assert!(wal.append(&batch()).is_err());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);

        wal.file.short_write = false;
        assert_eq!(wal.append(&batch()).unwrap(), 1);
        drop(wal);
        let (_, records) = WriteAheadLog::open(&path).unwrap();
        assert_eq!(records.len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn failed_rollback_poisons_the_log() {
        let path = temp_path();
        let mut wal = flaky(&path);
        wal.file.fail_sync = true;
        wal.file.fail_truncate = true;
        assert!(wal.append(&batch()).is_err());
        assert!(wal.is_poisoned());

        wal.file.fail_sync = false;
        let err = wal.append(&batch()).unwrap_err();
        assert!(matches!(err, KernexError::Store(_)));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn corruption_in_the_middle_is_an_error() {
        let path = temp_path();
        {
            let (mut wal, _) = WriteAheadLog::open(&path).unwrap();
            wal.append(&batch()).unwrap();
        }
        let good = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, format!("garbage\n{good}")).unwrap();
        let err = WriteAheadLog::open(&path).unwrap_err();
        assert!(matches!(err, KernexError::Store(_)));
        std::fs::remove_file(path).ok();
    }
}
