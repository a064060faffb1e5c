//! File-backed implementation of [`ModelStore`].
//!
//! [`XmlFileStore`] reads and writes one XML document on disk. It keeps a
//! blake3 hash of the document it last loaded or wrote, and skips the
//! write when a save would produce the same bytes, so an update that
//! changed nothing leaves the file and its timestamp alone.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use acm_core::ProjectModel;

use crate::error::StorageError;
use crate::reader::read_model;
use crate::traits::ModelStore;
use crate::writer::{write_model, WriteOptions};

/// Content hash of a serialized document.
pub fn document_hash(text: &str) -> blake3::Hash {
    blake3::hash(text.as_bytes())
}

/// A model store backed by an XML file.
#[derive(Debug, Clone)]
pub struct XmlFileStore {
    path: PathBuf,
    options: WriteOptions,
    last_hash: Option<blake3::Hash>,
}

impl XmlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        XmlFileStore {
            path: path.into(),
            options: WriteOptions::default(),
            last_hash: None,
        }
    }

    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the document last read from or written to the file.
    pub fn last_hash(&self) -> Option<blake3::Hash> {
        self.last_hash
    }
}

impl ModelStore for XmlFileStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&mut self, model: &mut ProjectModel) -> Result<(), StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                model.clear();
                return Err(StorageError::NotFound(self.path.clone()));
            }
            Err(e) => {
                model.clear();
                return Err(e.into());
            }
        };
        read_model(&text, model)?;
        self.last_hash = Some(document_hash(&text));
        debug!(path = %self.path.display(), nodes = model.len(), "project model loaded");
        Ok(())
    }

    fn save(&mut self, model: &mut ProjectModel) -> Result<bool, StorageError> {
        let text = write_model(model, &self.options)?;
        let hash = document_hash(&text);
        if self.last_hash == Some(hash) && self.exists() {
            debug!(path = %self.path.display(), "project model unchanged, not rewritten");
            return Ok(false);
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, text.as_bytes())?;
        self.last_hash = Some(hash);
        debug!(path = %self.path.display(), bytes = text.len(), "project model written");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_content_based() {
        assert_eq!(document_hash("<a/>"), document_hash("<a/>"));
        assert_ne!(document_hash("<a/>"), document_hash("<b/>"));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = XmlFileStore::new(dir.path().join("none.acp"));
        let mut m = ProjectModel::new();
        assert!(!store.exists());
        assert!(matches!(
            store.load(&mut m),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("project.acp");
        let mut store = XmlFileStore::new(&path);
        let mut m = ProjectModel::new();
        m.new_root().unwrap();
        assert!(store.save(&mut m).unwrap());
        assert!(path.is_file());
        assert_eq!(
            store.last_hash(),
            Some(document_hash(&fs::read_to_string(&path).unwrap()))
        );
    }
}
