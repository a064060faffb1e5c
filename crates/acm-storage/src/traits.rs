//! The [`ModelStore`] trait defining where a project model lives.
//!
//! A store holds at most one serialized model. Loading always replaces
//! the contents of the destination model; saving serializes the whole
//! model and clears its dirty flags.

use acm_core::ProjectModel;

use crate::error::StorageError;

/// Storage contract for a persisted project model.
///
/// Implementations are synchronous; one process owns the store for the
/// duration of an update.
pub trait ModelStore {
    /// True if a model has been stored.
    fn exists(&self) -> bool;

    /// Replaces the contents of `model` with the stored model.
    ///
    /// On failure `model` is left empty.
    fn load(&mut self, model: &mut ProjectModel) -> Result<(), StorageError>;

    /// Stores `model`. Returns false if the stored document already had
    /// exactly this content and nothing was written.
    fn save(&mut self, model: &mut ProjectModel) -> Result<bool, StorageError>;
}
