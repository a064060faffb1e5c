//! Core error types for acm-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! ways a caller can misuse the model API. Merging itself is infallible.

use thiserror::Error;

use crate::id::{ModelId, NodeId};
use crate::kind::Kind;

/// Core errors produced by the acm-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A kind name did not match any known node kind.
    #[error("unknown node kind: '{name}'")]
    UnknownKind { name: String },

    /// The model itself is not an arena node and cannot be created as one.
    #[error("cannot create a node of kind {kind}")]
    NotInstantiable { kind: Kind },

    /// A node id was not found in the arena.
    #[error("node not found: NodeId({id})")]
    NodeNotFound { id: NodeId },

    /// A node id belongs to another model.
    #[error("node {id} does not belong to model {model}")]
    ForeignNode { id: NodeId, model: ModelId },

    /// A node had a different kind than the operation expected.
    #[error("kind mismatch for node {id}: expected {expected}, found {found}")]
    KindMismatch {
        id: NodeId,
        expected: &'static str,
        found: Kind,
    },

    /// The kind has no scalar attribute with this name.
    #[error("{kind} has no attribute '{name}'")]
    UnknownAttribute { kind: Kind, name: String },

    /// A scalar value had the wrong shape or was out of range.
    #[error("invalid value for attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    /// The kind has no child or reference slot with this name.
    #[error("{kind} has no slot '{name}'")]
    UnknownSlot { kind: Kind, name: String },

    /// The slot exists but does not support the requested operation.
    #[error("slot '{name}' of {kind} is not {expected}")]
    SlotShape {
        kind: Kind,
        name: String,
        expected: &'static str,
    },

    /// A join-point id too large for the allocator.
    #[error("join-point id {jpid} is out of range")]
    JpidOutOfRange { jpid: u32 },
}
