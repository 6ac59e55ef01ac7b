use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a valid study document", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode study document")]
    Encode(#[source] serde_json::Error),
    #[error("timed out waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf },
    #[error("concurrent write detected (expected revision {expected}, found {actual})")]
    Conflict { expected: u64, actual: u64 },
    #[error("document store lock poisoned")]
    Poisoned,
}
