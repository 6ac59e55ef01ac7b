pub mod document;
pub mod error;
pub mod json;
pub mod memory;

use std::sync::Arc;

pub use document::Document;
pub use error::StoreError;
pub use json::JsonStore;
pub use memory::MemoryStore;

/// Attempts a read-modify-write cycle gets before a conflict is reported.
pub const MAX_COMMIT_ATTEMPTS: u32 = 8;

/// Outcome of a mutation closure passed to [`DocumentStore::update`].
pub enum Change<T> {
    /// The document was modified and must be committed.
    Write(T),
    /// Nothing changed; skip the write.
    Keep(T),
}

/// Persistence for the whole study document.
///
/// `commit` is a compare-and-swap: it succeeds only if the stored revision
/// still equals `document.revision`, and bumps the revision on success.
pub trait DocumentStore {
    fn load(&self) -> Result<Document, StoreError>;

    fn commit(&self, document: &mut Document) -> Result<(), StoreError>;

    fn update<T, F>(&self, mut apply: F) -> Result<T, StoreError>
    where
        Self: Sized,
        F: FnMut(&mut Document) -> Change<T>,
    {
        let mut attempt = 1;
        loop {
            let mut document = self.load()?;
            let value = match apply(&mut document) {
                Change::Keep(value) => return Ok(value),
                Change::Write(value) => value,
            };

            match self.commit(&mut document) {
                Ok(()) => return Ok(value),
                Err(StoreError::Conflict { expected, actual }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    tracing::warn!(expected, actual, attempt, "document changed during update, retrying");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for &S {
    fn load(&self) -> Result<Document, StoreError> {
        (**self).load()
    }

    fn commit(&self, document: &mut Document) -> Result<(), StoreError> {
        (**self).commit(document)
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    fn load(&self) -> Result<Document, StoreError> {
        (**self).load()
    }

    fn commit(&self, document: &mut Document) -> Result<(), StoreError> {
        (**self).commit(document)
    }
}
