//! In-memory implementation of [`ModelStore`].
//!
//! [`InMemoryStore`] keeps the serialized document in a `String`. It goes
//! through the same reader and writer as the file store, so tests and dry
//! runs see exactly what would be written to disk.

use acm_core::ProjectModel;

use crate::error::StorageError;
use crate::reader::read_model;
use crate::traits::ModelStore;
use crate::writer::{write_model, WriteOptions};

/// A model store backed by a string.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    document: Option<String>,
    options: WriteOptions,
    writes: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `document`.
    pub fn with_document(document: impl Into<String>) -> Self {
        InMemoryStore {
            document: Some(document.into()),
            ..Self::default()
        }
    }

    /// The stored document, if any.
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Number of saves that changed the stored document.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ModelStore for InMemoryStore {
    fn exists(&self) -> bool {
        self.document.is_some()
    }

    fn load(&mut self, model: &mut ProjectModel) -> Result<(), StorageError> {
        match &self.document {
            Some(text) => read_model(text, model),
            None => {
                model.clear();
                Err(StorageError::Malformed {
                    reason: "no document stored".to_string(),
                })
            }
        }
    }

    fn save(&mut self, model: &mut ProjectModel) -> Result<bool, StorageError> {
        let text = write_model(model, &self.options)?;
        if self.document.as_deref() == Some(text.as_str()) {
            return Ok(false);
        }
        self.document = Some(text);
        self.writes += 1;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_empty_store_fails() {
        let mut store = InMemoryStore::new();
        let mut m = ProjectModel::new();
        assert!(!store.exists());
        assert!(store.load(&mut m).is_err());
    }

    #[test]
    fn identical_save_is_skipped() {
        let mut store = InMemoryStore::new();
        let mut m = ProjectModel::new();
        m.new_root().unwrap();
        assert!(store.save(&mut m).unwrap());
        assert!(!store.save(&mut m).unwrap());
        assert_eq!(store.writes(), 1);
        assert!(store.document().unwrap().contains(r#"<Namespace name="::"/>"#));
    }
}
