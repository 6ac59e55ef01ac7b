use std::sync::Mutex;

use super::{Document, DocumentStore, StoreError};

/// A store that keeps the document in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: Document) -> Self {
        MemoryStore {
            document: Mutex::new(document),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Document, StoreError> {
        let stored = self.document.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(stored.clone())
    }

    fn commit(&self, document: &mut Document) -> Result<(), StoreError> {
        let mut stored = self.document.lock().map_err(|_| StoreError::Poisoned)?;
        if stored.revision != document.revision {
            return Err(StoreError::Conflict {
                expected: document.revision,
                actual: stored.revision,
            });
        }
        document.revision += 1;
        *stored = document.clone();
        Ok(())
    }
}
