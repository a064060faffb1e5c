//! Storage error types for acm-storage.
//!
//! [`StorageError`] covers every way loading or saving a model document
//! can fail: I/O, malformed XML, and documents that parse but do not
//! describe a consistent model (bad ids, dangling references, unknown
//! kinds).

use std::path::PathBuf;

use acm_core::CoreError;
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document is well-formed but not shaped like a model.
    #[error("malformed model document: {reason}")]
    Malformed { reason: String },

    /// The document element is neither `ac-model` nor `Model`.
    #[error("unexpected document root <{found}>")]
    UnexpectedRoot { found: String },

    /// The document root does not declare how many ids it uses.
    #[error("document root has no `ids` attribute")]
    MissingIds,

    /// An `id` attribute or id reference is not a decimal number.
    #[error("invalid id '{text}'")]
    InvalidId { text: String },

    /// An element carries an id at or beyond the declared count.
    #[error("id {id} out of range, document declares {count} ids")]
    IdOutOfRange { id: u32, count: u32 },

    /// Two elements carry the same id.
    #[error("duplicate id {id}")]
    DuplicateId { id: u32 },

    /// A reference names an id no element carries.
    #[error("reference to undefined id {id}")]
    UnresolvedReference { id: u32 },

    /// An element name is not a node kind.
    #[error("unknown element kind <{name}>")]
    UnknownKind { name: String },

    /// A node element lacks an attribute its identity depends on.
    #[error("<{element}> is missing required attribute `{attr}`")]
    MissingAttribute { element: String, attr: &'static str },

    /// No project document exists at the given path.
    #[error("project file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A model operation rejected the loaded data.
    #[error(transparent)]
    Core(#[from] CoreError),
}
