//! Source cleanup: removing project nodes that came from modified files.
//!
//! A join point whose every source location lies in a modified file is
//! deleted. Deletion spreads along ownership (children of a deleted node
//! are deleted when next visited) and along required references (a node
//! whose single reference or owned child is deleted is deleted too).
//! Reference lists just lose their deleted entries.
//!
//! Each node is stamped with the current merge id on its first visit, so
//! reference cycles are visited once and the outcome of the first visit
//! is reused.

use tracing::{debug, warn};

use super::{container_at, Merger, Place};
use crate::attrs::Slot;
use crate::id::NodeId;
use crate::kind::Kind;
use crate::types::SourceLocKind;

/// What a slot looked like when cleanup reached it.
enum Visit {
    Single(NodeId),
    Container,
}

impl Merger<'_> {
    /// Removes everything that only existed because of modified files.
    /// Returns true if the root namespace itself was deleted.
    pub fn source_cleanup(&mut self) -> bool {
        if self.modified.is_empty() {
            return false;
        }
        self.cleanup_container(Place::Files);
        let root_deleted = match self.prj.root() {
            Some(root) => self.visit_single(root),
            None => false,
        };
        self.cleanup_container(Place::Speculations);
        debug!(deleted = self.stats.deleted, "source cleanup finished");
        root_deleted
    }

    /// Effective merge stamp of `id`, inheriting a newer stamp and the
    /// deleted state from a deleted ancestor.
    fn merge_count(&mut self, id: NodeId) -> u32 {
        let Some(node) = self.prj.get(id) else {
            return 0;
        };
        let (parent, mc) = (node.parent, node.merge_count);
        let Some(parent) = parent else {
            return mc;
        };
        let pmc = self.merge_count(parent);
        let parent_deleted = self.prj.get(parent).is_some_and(|p| p.deleted);
        if pmc > mc && parent_deleted {
            if let Ok(node) = self.prj.node_raw_mut(id) {
                node.merge_count = pmc;
                node.deleted = true;
                node.dirty = true;
            }
            return pmc;
        }
        mc
    }

    fn stamp(&mut self, id: NodeId) {
        let merge_id = self.prj.merge_id;
        if let Ok(node) = self.prj.node_raw_mut(id) {
            node.merge_count = merge_id;
        }
    }

    fn is_deleted(&self, id: NodeId) -> bool {
        self.prj.get(id).is_some_and(|n| n.deleted)
    }

    /// Cleans a node reached through a single slot. Returns true if it is
    /// (now or already) deleted.
    fn visit_single(&mut self, id: NodeId) -> bool {
        let mc = self.merge_count(id);
        self.stamp(id);
        if mc == self.prj.merge_id {
            self.is_deleted(id)
        } else {
            self.cleanup_node(id)
        }
    }

    /// Cleans every element of a container and removes the deleted ones.
    fn cleanup_container(&mut self, place: Place) {
        let items: Vec<NodeId> = match container_at(self.prj, place) {
            Some(c) => c.as_slice().to_vec(),
            None => return,
        };
        let mut found = Vec::new();
        for item in items {
            let mc = self.merge_count(item);
            if mc == self.prj.merge_id {
                if self.is_deleted(item) {
                    found.push(item);
                }
            } else {
                self.stamp(item);
                if self.cleanup_node(item) {
                    found.push(item);
                    self.unlink(item);
                }
            }
        }
        for item in found {
            match place {
                Place::Files => {
                    self.prj.files_mut().remove(item);
                }
                Place::Speculations => {
                    self.prj.speculations_mut().remove(item);
                }
                Place::Slot(owner, idx) => {
                    if let Err(e) = self.prj.remove_at(owner, idx, item) {
                        warn!(error = %e, "could not remove deleted node");
                    }
                }
            }
        }
    }

    /// Cleans one node. Returns true if the node has to be deleted.
    fn cleanup_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.prj.get(id) else {
            return false;
        };
        let is_any = node.data.any().is_some();
        if is_any && self.purge_sources(id) {
            self.unlink(id);
            return true;
        }

        let Some(node) = self.prj.get(id) else {
            return false;
        };
        let visits: Vec<(usize, Visit)> = node
            .data
            .slot_list()
            .into_iter()
            .enumerate()
            .filter(|(_, (name, _))| !(is_any && *name == "source"))
            .filter_map(|(idx, (_, slot))| match slot {
                Slot::Owned(Some(t)) | Slot::Link(Some(t)) => Some((idx, Visit::Single(t))),
                Slot::OwnedMany(_) | Slot::Links(_) => Some((idx, Visit::Container)),
                Slot::Owned(None) | Slot::Link(None) => None,
            })
            .collect();

        for (idx, visit) in visits {
            match visit {
                Visit::Single(t) => {
                    if self.visit_single(t) {
                        return true;
                    }
                }
                Visit::Container => self.cleanup_container(Place::Slot(id, idx)),
            }
        }
        false
    }

    /// Drops the source locations of join point `id` that lie in modified
    /// files. Returns true if the node itself has to go: either all of its
    /// locations were in modified files, or it lost its only declaration
    /// while it needs one (class and aspect members) and still has a
    /// definition elsewhere.
    pub fn purge_sources(&mut self, id: NodeId) -> bool {
        let Some(node) = self.prj.get(id) else {
            return false;
        };
        let Some(any) = node.data.any() else {
            return false;
        };
        let sources: Vec<NodeId> = any.source.as_slice().to_vec();
        if sources.is_empty() {
            return false;
        }
        let needs_decl = node
            .parent
            .and_then(|p| self.prj.get(p))
            .is_some_and(|p| matches!(p.kind(), Kind::Class | Kind::Aspect));

        let mut found = Vec::new();
        let (mut has_decl, mut has_def, mut removed_decl) = (false, false, false);
        for src in &sources {
            let Some(source) = self.prj.get(*src).and_then(|n| n.data.as_source()) else {
                continue;
            };
            let in_modified = source.file.is_some_and(|f| self.modified.contains(&f));
            if in_modified {
                found.push(*src);
                if source.kind == SourceLocKind::Decl {
                    removed_decl = true;
                }
            } else if source.kind == SourceLocKind::Decl {
                has_decl = true;
            } else if source.kind == SourceLocKind::Def {
                has_def = true;
            }
        }

        if has_def && removed_decl && needs_decl && !has_decl {
            return true;
        }
        if found.len() != sources.len() {
            if let Ok(idx) = self.prj.slot_index(id, "source") {
                for src in found {
                    if let Err(e) = self.prj.remove_at(id, idx, src) {
                        warn!(error = %e, "could not remove source location");
                    }
                    self.unlink(src);
                }
            }
            return false;
        }
        true
    }

    /// Marks `id` and everything it owns as deleted.
    fn unlink(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let Ok(node) = self.prj.node_raw_mut(id) else {
                continue;
            };
            if !node.deleted {
                node.deleted = true;
                node.dirty = true;
                self.stats.deleted += 1;
            }
            for (_, slot) in node.data.slot_list() {
                if slot.is_owned() {
                    pending.extend(slot.ids());
                }
            }
        }
    }
}
