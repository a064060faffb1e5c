//! Stable ID newtypes for model entities.
//!
//! A [`NodeId`] names a node inside the arena of one [`crate::ProjectModel`].
//! Every model draws a fresh [`ModelId`] when it is created, so an id taken
//! from a translation-unit model can never be confused with a project node,
//! even while both are being merged.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of one model arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(pub u32);

impl ModelId {
    /// Draws an id that no other model in this process has used.
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        ModelId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Node identifier: the owning model plus the arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub model: ModelId,
    pub index: u32,
}

impl NodeId {
    pub(crate) fn new(model: ModelId, index: usize) -> Self {
        NodeId {
            model,
            index: index as u32,
        }
    }
}

// Display implementations -- models print bare, nodes as `model:index`.

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.model, self.index)
    }
}
