use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use super::{Document, DocumentStore, StoreError};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);
const LOCK_POLL: Duration = Duration::from_millis(5);

/// The study document as a pretty-printed JSON file.
///
/// Commits are serialised across processes by an exclusive OS lock on a
/// sibling `<file>.lock`. Under the lock the on-disk revision
/// is compared with the caller's, and the file is replaced atomically via a
/// temp file in the same directory.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    lock_timeout: Duration,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStore {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("document"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn read_document(&self) -> Result<Document, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no study document yet, starting empty");
                return Ok(Document::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(Document::default());
        }

        serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, document: &Document) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let directory = self.directory();
        fs::create_dir_all(directory).map_err(write_err)?;

        let temp = NamedTempFile::new_in(directory).map_err(write_err)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, document).map_err(StoreError::Encode)?;
            writer.write_all(b"\n").map_err(write_err)?;
            writer.flush().map_err(write_err)?;
        }
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path).map_err(|err| write_err(err.error))?;
        Ok(())
    }

    fn acquire_lock(&self) -> Result<DocumentLock, StoreError> {
        let lock_path = self.lock_path();
        let lock_err = |source: io::Error| StoreError::Write {
            path: lock_path.clone(),
            source,
        };
        fs::create_dir_all(self.directory()).map_err(lock_err)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(lock_err)?;

        let started = Instant::now();
        loop {
            match file.try_lock() {
                Ok(()) => return Ok(DocumentLock { file }),
                Err(TryLockError::WouldBlock) => {
                    if started.elapsed() >= self.lock_timeout {
                        return Err(StoreError::LockTimeout {
                            path: lock_path.clone(),
                        });
                    }
                    thread::sleep(LOCK_POLL);
                }
                Err(TryLockError::Error(source)) => return Err(lock_err(source)),
            }
        }
    }
}

impl DocumentStore for JsonStore {
    fn load(&self) -> Result<Document, StoreError> {
        let document = self.read_document()?;
        tracing::debug!(
            path = %self.path.display(),
            revision = document.revision,
            cards = document.srs_cards.len(),
            "loaded study document"
        );
        Ok(document)
    }

    fn commit(&self, document: &mut Document) -> Result<(), StoreError> {
        let _lock = self.acquire_lock()?;

        let actual = self.read_document()?.revision;
        if actual != document.revision {
            return Err(StoreError::Conflict {
                expected: document.revision,
                actual,
            });
        }

        document.revision += 1;
        if let Err(err) = self.write_document(document) {
            document.revision -= 1;
            return Err(err);
        }
        tracing::debug!(path = %self.path.display(), revision = document.revision, "committed study document");
        Ok(())
    }
}

/// Exclusive advisory lock on `<document>.lock`, released on drop or when
/// the holding process dies. The file itself is left in place.
struct DocumentLock {
    file: File,
}

impl Drop for DocumentLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::warn!(error = %err, "failed to release document lock");
        }
    }
}
