//! XML persistence for project models.
//!
//! A project model is stored as one XML document. The [`ModelStore`]
//! trait abstracts over where that document lives; [`XmlFileStore`] keeps
//! it on disk and [`InMemoryStore`] in memory. [`update_project`] is the
//! load, merge and save cycle a weaver runs for each translation unit.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`tree`]: element tree built from the `quick_xml` event stream
//! - [`reader`]: two-pass document loader
//! - [`writer`]: document writer and [`WriteOptions`]
//! - [`traits`]: ModelStore trait definition
//! - [`file`]: XmlFileStore implementation
//! - [`memory`]: InMemoryStore implementation
//! - [`project`]: the project update driver

pub mod error;
pub mod file;
pub mod memory;
pub mod project;
pub mod reader;
pub mod traits;
pub mod tree;
pub mod writer;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use file::{document_hash, XmlFileStore};
pub use memory::InMemoryStore;
pub use project::{update_project, UpdateOutcome};
pub use reader::read_model;
pub use traits::ModelStore;
pub use writer::{write_model, WriteOptions};
