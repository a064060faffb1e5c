//! Persistent join-point model for an aspect weaver.
//!
//! The model describes a C++ project as a tree of named entities
//! (namespaces, classes, functions, variables), code join points (calls,
//! variable accesses, executions) and aspect-language elements (aspects,
//! pointcuts, advice). Each translation unit produces its own model; these
//! are merged one by one into a project model that survives across builds.
//!
//! # Modules
//!
//! - [`kind`]: node kinds and kind masks
//! - [`attrs`], [`node`]: per-kind records and generic field access
//! - [`container`]: ordered node collections with a key-sorted view
//! - [`model`]: the [`ProjectModel`] arena
//! - [`key`]: identity keys used to match nodes across models
//! - [`jpid`]: join-point id allocation
//! - [`merge`]: the incremental merge engine

pub mod attrs;
mod builder;
pub mod container;
mod dump;
pub mod error;
pub mod id;
pub mod jpid;
pub mod key;
pub mod kind;
pub mod merge;
pub mod model;
pub mod node;
pub mod types;

// Re-export commonly used types
pub use attrs::{Fields, Scalar, ScalarField, ScalarType, Slot};
pub use builder::ROOT_NAMESPACE;
pub use container::Container;
pub use error::CoreError;
pub use id::{ModelId, NodeId};
pub use jpid::JpidAllocator;
pub use kind::{JoinPointType, Kind};
pub use merge::{AttrSite, DefaultPolicy, KeepProject, MergePolicy, MergeStats, Merger};
pub use model::{ProjectModel, SaveContext};
pub use node::{Node, NodeData};
pub use types::{
    AdviceCodeContext, AdviceCodeType, CvQualifiers, FunctionType, IntEnum, PointcutType,
    SourceLocKind, VariableType,
};
