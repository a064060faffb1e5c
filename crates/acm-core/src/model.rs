//! ProjectModel: the arena holding one join-point model.
//!
//! [`ProjectModel`] is the single entry point for constructing and querying
//! a model. Nodes live in an arena and are addressed by [`NodeId`]; the
//! model itself owns the file list, the root namespace and the speculation
//! list, and carries the version string and the jpid allocator.
//!
//! All mutations go through `ProjectModel` methods so that parent links,
//! dirty flags and cached keys stay consistent. Slots are addressed by the
//! same names the persisted format uses (`children`, `arg_types`, ...).

use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;

use crate::attrs::{Scalar, Slot, SlotMut};
use crate::container::Container;
use crate::error::CoreError;
use crate::id::{ModelId, NodeId};
use crate::jpid::JpidAllocator;
use crate::key::{self, NodeLookup};
use crate::kind::{JoinPointType, Kind};
use crate::node::{Node, NodeData, SaveStamp};

/// Id assignment state for one save of a model.
///
/// Every save runs in its own stage, so ids handed out by an earlier save
/// are never mistaken for ids of the current one.
#[derive(Debug)]
pub struct SaveContext {
    stage: u32,
    next: u32,
}

impl SaveContext {
    pub fn new() -> Self {
        static STAGE: AtomicU32 = AtomicU32::new(1);
        SaveContext {
            stage: STAGE.fetch_add(1, Ordering::Relaxed),
            next: 0,
        }
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    /// Number of ids handed out so far. All ids are below this.
    pub fn count(&self) -> u32 {
        self.next
    }
}

impl Default for SaveContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A join-point model: either the persistent project model or the model of
/// a single translation unit.
#[derive(Debug)]
pub struct ProjectModel {
    id: ModelId,
    nodes: Vec<Node>,
    /// Node ids per kind, indexed by [`Kind::index`], in creation order.
    by_kind: Vec<Vec<NodeId>>,
    files: Container,
    root: Option<NodeId>,
    speculations: Container,
    version: String,
    dirty: bool,
    jpids: JpidAllocator,
    /// Id of the current (or last) merge into this model.
    pub(crate) merge_id: u32,
}

impl Default for ProjectModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        ProjectModel {
            id: ModelId::fresh(),
            nodes: Vec::new(),
            by_kind: vec![Vec::new(); Kind::ALL.len()],
            files: Container::owning(),
            root: None,
            speculations: Container::owning(),
            version: String::new(),
            dirty: false,
            jpids: JpidAllocator::new(),
            merge_id: 0,
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Number of arena nodes, including deleted ones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drops every node and resets the model to its empty state. Ids
    /// handed out before the reset no longer resolve.
    pub fn clear(&mut self) {
        self.id = ModelId::fresh();
        self.nodes.clear();
        for list in &mut self.by_kind {
            list.clear();
        }
        self.files.clear();
        self.root = None;
        self.speculations.clear();
        self.version.clear();
        self.dirty = false;
        self.jpids.reset();
        self.merge_id = 0;
    }

    // -----------------------------------------------------------------------
    // Node access
    // -----------------------------------------------------------------------

    /// Looks up a node of this model.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.model != self.id {
            return None;
        }
        self.nodes.get(id.index as usize)
    }

    /// Looks up a node, reporting why it is missing.
    pub fn node(&self, id: NodeId) -> Result<&Node, CoreError> {
        if id.model != self.id {
            return Err(CoreError::ForeignNode {
                id,
                model: self.id,
            });
        }
        self.nodes
            .get(id.index as usize)
            .ok_or(CoreError::NodeNotFound { id })
    }

    /// Node access that leaves dirty flags and cached keys alone.
    pub(crate) fn node_raw_mut(&mut self, id: NodeId) -> Result<&mut Node, CoreError> {
        if id.model != self.id {
            return Err(CoreError::ForeignNode {
                id,
                model: self.id,
            });
        }
        self.nodes
            .get_mut(id.index as usize)
            .ok_or(CoreError::NodeNotFound { id })
    }

    pub fn data(&self, id: NodeId) -> Result<&NodeData, CoreError> {
        Ok(&self.node(id)?.data)
    }

    /// Mutable access to a node's record. Marks the node dirty and drops
    /// its cached key.
    pub fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, CoreError> {
        let node = self.node_raw_mut(id)?;
        node.dirty = true;
        node.key.take();
        Ok(&mut node.data)
    }

    pub fn kind(&self, id: NodeId) -> Result<Kind, CoreError> {
        Ok(self.node(id)?.kind())
    }

    /// Identity key of `id`.
    pub fn key(&self, id: NodeId) -> &str {
        key::key_of(self, id)
    }

    /// Key of a container of this model.
    pub fn container_key(&self, container: &Container) -> String {
        key::container_key(self, container)
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Creates a detached node of `kind` with default attributes.
    pub fn create(&mut self, kind: Kind) -> Result<NodeId, CoreError> {
        let data = NodeData::new(kind)?;
        Ok(self.register(data))
    }

    pub(crate) fn register(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.id, self.nodes.len());
        self.by_kind[data.kind().index()].push(id);
        self.nodes.push(Node::new(data));
        self.dirty = true;
        id
    }

    /// Sets a scalar attribute.
    pub fn set_scalar(
        &mut self,
        id: NodeId,
        name: &str,
        value: Option<Scalar>,
    ) -> Result<(), CoreError> {
        self.data_mut(id)?.set_scalar(name, value)
    }

    /// Sets or clears the jpid of a join point.
    pub fn set_jpid(&mut self, id: NodeId, jpid: Option<u32>) -> Result<(), CoreError> {
        let data = self.data_mut(id)?;
        let kind = data.kind();
        match data.any_mut() {
            Some(any) => {
                any.jpid = jpid;
                Ok(())
            }
            None => Err(CoreError::UnknownAttribute {
                kind,
                name: "jpid".to_string(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Model-level fields
    // -----------------------------------------------------------------------

    /// Translation units and headers, in insertion order.
    pub fn files(&self) -> &Container {
        &self.files
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn speculations(&self) -> &Container {
        &self.speculations
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.dirty = true;
    }

    /// Appends a translation unit or header to the file list.
    pub fn add_file(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.expect_kind(id, JoinPointType::FILE, "TUnit or Header")?;
        self.node_raw_mut(id)?.parent = None;
        self.files.push(id);
        self.dirty = true;
        Ok(())
    }

    /// Installs the root namespace.
    pub fn set_root(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.expect_kind(id, Kind::Namespace.mask(), "Namespace")?;
        self.node_raw_mut(id)?.parent = None;
        self.root = Some(id);
        self.dirty = true;
        Ok(())
    }

    pub fn add_speculation(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.expect_kind(id, Kind::Speculation.mask(), "Speculation")?;
        self.node_raw_mut(id)?.parent = None;
        self.speculations.push(id);
        self.dirty = true;
        Ok(())
    }

    pub(crate) fn files_mut(&mut self) -> &mut Container {
        self.dirty = true;
        &mut self.files
    }

    pub(crate) fn speculations_mut(&mut self) -> &mut Container {
        self.dirty = true;
        &mut self.speculations
    }

    pub(crate) fn set_root_raw(&mut self, id: Option<NodeId>) {
        self.root = id;
        self.dirty = true;
    }

    fn expect_kind(
        &self,
        id: NodeId,
        mask: JoinPointType,
        expected: &'static str,
    ) -> Result<(), CoreError> {
        let found = self.kind(id)?;
        if mask.contains(found) {
            Ok(())
        } else {
            Err(CoreError::KindMismatch {
                id,
                expected,
                found,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    /// Position of slot `name` in the owner's slot list.
    pub fn slot_index(&self, owner: NodeId, name: &str) -> Result<usize, CoreError> {
        let data = self.data(owner)?;
        data.slot_list()
            .iter()
            .position(|(n, _)| *n == name)
            .ok_or_else(|| CoreError::UnknownSlot {
                kind: data.kind(),
                name: name.to_string(),
            })
    }

    /// Targets of slot `name` in order.
    pub fn slot_ids(&self, owner: NodeId, name: &str) -> Result<Vec<NodeId>, CoreError> {
        let idx = self.slot_index(owner, name)?;
        Ok(self.slot_ids_at(owner, idx))
    }

    pub(crate) fn slot_ids_at(&self, owner: NodeId, idx: usize) -> Vec<NodeId> {
        self.get(owner)
            .and_then(|n| n.data.slot_list().get(idx).map(|(_, s)| s.ids()))
            .unwrap_or_default()
    }

    /// Appends `id` to the container slot `name`. Children of an owning
    /// container get `owner` as their parent.
    pub fn insert_into(&mut self, owner: NodeId, name: &str, id: NodeId) -> Result<(), CoreError> {
        self.node(id)?;
        let idx = self.slot_index(owner, name)?;
        self.push_at(owner, idx, id)
    }

    /// Removes `id` from the container slot `name`.
    pub fn remove_from(&mut self, owner: NodeId, name: &str, id: NodeId) -> Result<bool, CoreError> {
        let idx = self.slot_index(owner, name)?;
        self.remove_at(owner, idx, id)
    }

    /// Sets or clears the single slot `name`. An owned child gets `owner`
    /// as its parent.
    pub fn set_slot(
        &mut self,
        owner: NodeId,
        name: &str,
        value: Option<NodeId>,
    ) -> Result<(), CoreError> {
        if let Some(id) = value {
            self.node(id)?;
        }
        let idx = self.slot_index(owner, name)?;
        self.set_single_at(owner, idx, value)
    }

    fn shape_error(&self, owner: NodeId, idx: usize, expected: &'static str) -> CoreError {
        match self.get(owner) {
            Some(node) => CoreError::SlotShape {
                kind: node.kind(),
                name: node
                    .data
                    .slot_list()
                    .get(idx)
                    .map(|(n, _)| n.to_string())
                    .unwrap_or_default(),
                expected,
            },
            None => CoreError::NodeNotFound { id: owner },
        }
    }

    fn with_slot_mut<R>(
        &mut self,
        owner: NodeId,
        idx: usize,
        f: impl FnOnce(SlotMut<'_>) -> R,
    ) -> Result<R, CoreError> {
        let data = self.data_mut(owner)?;
        let kind = data.kind();
        let mut slots = data.slot_list_mut();
        if idx >= slots.len() {
            return Err(CoreError::UnknownSlot {
                kind,
                name: format!("#{idx}"),
            });
        }
        let (_, slot) = slots.swap_remove(idx);
        Ok(f(slot))
    }

    fn adopt(&mut self, owner: NodeId, child: NodeId) {
        if let Ok(node) = self.node_raw_mut(child) {
            node.parent = Some(owner);
        }
    }

    pub(crate) fn push_at(&mut self, owner: NodeId, idx: usize, id: NodeId) -> Result<(), CoreError> {
        let owning = self.with_slot_mut(owner, idx, |slot| match slot {
            SlotMut::OwnedMany(c) => {
                c.push(id);
                Some(true)
            }
            SlotMut::Links(c) => {
                c.push(id);
                Some(false)
            }
            _ => None,
        })?;
        match owning {
            Some(true) => {
                self.adopt(owner, id);
                Ok(())
            }
            Some(false) => Ok(()),
            None => Err(self.shape_error(owner, idx, "a container")),
        }
    }

    pub(crate) fn remove_at(&mut self, owner: NodeId, idx: usize, id: NodeId) -> Result<bool, CoreError> {
        self.with_slot_mut(owner, idx, |slot| match slot {
            SlotMut::OwnedMany(c) | SlotMut::Links(c) => c.remove(id),
            SlotMut::Owned(s) | SlotMut::Link(s) => {
                if *s == Some(id) {
                    *s = None;
                    true
                } else {
                    false
                }
            }
        })
    }

    pub(crate) fn set_single_at(
        &mut self,
        owner: NodeId,
        idx: usize,
        value: Option<NodeId>,
    ) -> Result<(), CoreError> {
        let owning = self.with_slot_mut(owner, idx, |slot| match slot {
            SlotMut::Owned(s) => {
                *s = value;
                Some(true)
            }
            SlotMut::Link(s) => {
                *s = value;
                Some(false)
            }
            _ => None,
        })?;
        match (owning, value) {
            (Some(true), Some(child)) => {
                self.adopt(owner, child);
                Ok(())
            }
            (Some(_), _) => Ok(()),
            (None, _) => Err(self.shape_error(owner, idx, "a single slot")),
        }
    }

    /// Replaces the contents of an owned slot and adopts the new children.
    pub(crate) fn replace_owned_at(
        &mut self,
        owner: NodeId,
        idx: usize,
        ids: Vec<NodeId>,
    ) -> Result<(), CoreError> {
        let children = ids.clone();
        self.with_slot_mut(owner, idx, |slot| match slot {
            SlotMut::Owned(s) => *s = ids.first().copied(),
            SlotMut::OwnedMany(c) => c.replace_all(ids),
            SlotMut::Link(_) | SlotMut::Links(_) => {}
        })?;
        for child in children {
            self.adopt(owner, child);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All live nodes whose kind is in `mask`, grouped by kind in bit
    /// order, each group in creation order.
    ///
    /// With `prj_only`, classes and aspects that were not seen in any
    /// translation unit are left out.
    pub fn select(&self, mask: JoinPointType, prj_only: bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        for kind in mask.kinds() {
            if kind == Kind::Model {
                continue;
            }
            for id in &self.by_kind[kind.index()] {
                let node = &self.nodes[id.index as usize];
                if node.deleted {
                    continue;
                }
                if prj_only {
                    if let Some(class) = node.data.class() {
                        if class.name.tunits.is_empty() {
                            continue;
                        }
                    }
                }
                out.push(*id);
            }
        }
        out
    }

    /// First live node of a kind in `mask` whose key equals `key`.
    pub fn find(&self, mask: JoinPointType, key: &str) -> Option<NodeId> {
        self.select(mask, false)
            .into_iter()
            .find(|id| self.key(*id) == key)
    }

    /// Live node counts per kind, in bit order. Kinds without nodes are
    /// left out.
    pub fn census(&self) -> IndexMap<Kind, usize> {
        let mut counts = IndexMap::new();
        for kind in Kind::ALL {
            if kind == Kind::Model {
                continue;
            }
            let n = self.by_kind[kind.index()]
                .iter()
                .filter(|id| !self.nodes[id.index as usize].deleted)
                .count();
            if n > 0 {
                counts.insert(kind, n);
            }
        }
        counts
    }

    /// Live nodes reachable through ownership, in document order: files,
    /// then the root namespace, then speculations, each subtree pre-order.
    pub fn tree_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let tops = self
            .files
            .iter()
            .chain(self.root)
            .chain(self.speculations.iter());
        for top in tops {
            stack.push(top);
            while let Some(id) = stack.pop() {
                let Some(node) = self.get(id) else {
                    continue;
                };
                if node.deleted {
                    continue;
                }
                out.push(id);
                let mut children: Vec<NodeId> = Vec::new();
                for (_, slot) in node.data.slot_list() {
                    match slot {
                        Slot::Owned(Some(child)) => children.push(child),
                        Slot::OwnedMany(c) => children.extend(c.iter()),
                        _ => {}
                    }
                }
                stack.extend(children.into_iter().rev());
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Join-point ids
    // -----------------------------------------------------------------------

    pub fn alloc_jpid(&mut self) -> u32 {
        self.jpids.alloc()
    }

    /// Marks a persisted jpid as taken.
    pub fn reserve_jpid(&mut self, jpid: u32) -> Result<(), CoreError> {
        self.jpids.alloc_at(jpid)
    }

    pub fn free_jpid(&mut self, jpid: u32) {
        self.jpids.free(jpid);
    }

    pub fn jpids(&self) -> &JpidAllocator {
        &self.jpids
    }

    // -----------------------------------------------------------------------
    // Persistence bookkeeping
    // -----------------------------------------------------------------------

    /// True if the model or any node changed since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.nodes.iter().any(|n| n.dirty && !n.deleted)
    }

    /// Number of live nodes with pending changes.
    pub fn dirty_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.dirty && !n.deleted).count()
    }

    /// Clears every dirty flag, after a load or a successful save.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
        for node in &mut self.nodes {
            node.dirty = false;
        }
    }

    /// Returns the id `id` carries in the save described by `ctx`,
    /// assigning the next free one first if needed.
    pub fn assign_save_id(&mut self, id: NodeId, ctx: &mut SaveContext) -> Result<u32, CoreError> {
        let node = self.node_raw_mut(id)?;
        if let Some(existing) = node.save_id(ctx.stage) {
            return Ok(existing);
        }
        let assigned = ctx.next;
        ctx.next += 1;
        node.save_stamp = Some(SaveStamp {
            stage: ctx.stage,
            id: assigned,
        });
        Ok(assigned)
    }

    // -----------------------------------------------------------------------
    // Transform info
    // -----------------------------------------------------------------------

    /// Attaches a weaver annotation to a node, replacing any previous one.
    pub fn set_transform_info(&mut self, id: NodeId, info: Box<dyn Any>) -> Result<(), CoreError> {
        self.node_raw_mut(id)?.transform_info = Some(info);
        Ok(())
    }

    pub fn take_transform_info(&mut self, id: NodeId) -> Result<Option<Box<dyn Any>>, CoreError> {
        Ok(self.node_raw_mut(id)?.transform_info.take())
    }
}

impl NodeLookup for ProjectModel {
    fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CvQualifiers, SourceLocKind};

    fn function_with_args(m: &mut ProjectModel, name: &str, args: &[&str]) -> NodeId {
        let root = m.root().unwrap();
        let f = m.new_name(root, Kind::Function, name).unwrap();
        for sig in args {
            let t = m.new_type(sig);
            m.insert_into(f, "arg_types", t).unwrap();
        }
        f
    }

    fn model_with_root() -> ProjectModel {
        let mut m = ProjectModel::new();
        m.new_root().unwrap();
        m
    }

    #[test]
    fn create_and_lookup() {
        let mut m = ProjectModel::new();
        let t = m.create(Kind::Type).unwrap();
        assert_eq!(m.kind(t).unwrap(), Kind::Type);
        assert!(m.node(t).unwrap().is_dirty());
        assert!(m.create(Kind::Model).is_err());
    }

    #[test]
    fn foreign_ids_do_not_resolve() {
        let mut a = ProjectModel::new();
        let b = ProjectModel::new();
        let t = a.create(Kind::Type).unwrap();
        assert!(b.get(t).is_none());
        assert!(matches!(b.node(t), Err(CoreError::ForeignNode { .. })));
    }

    #[test]
    fn clear_invalidates_old_ids() {
        let mut m = model_with_root();
        let tu = m.new_tunit("a.cc", 1).unwrap();
        m.set_version("1.0");
        m.clear();
        assert!(m.get(tu).is_none());
        assert!(m.files().is_empty());
        assert_eq!(m.root(), None);
        assert_eq!(m.version(), "");
        assert_eq!(m.jpids().high_water(), 0);
    }

    #[test]
    fn file_key() {
        let mut m = ProjectModel::new();
        let tu = m.new_tunit("main.cc", 0).unwrap();
        assert_eq!(m.key(tu), "TUnit|main.cc|");
    }

    #[test]
    fn function_key_includes_arg_types() {
        let mut m = model_with_root();
        let f = function_with_args(&mut m, "f", &["int", "char"]);
        m.data_mut(f)
            .unwrap()
            .as_function_mut()
            .unwrap()
            .cv_qualifiers = CvQualifiers::Const;
        assert_eq!(m.key(f), "Function|f|Type|int|Type|char|1|-|");
    }

    #[test]
    fn function_without_args() {
        let mut m = model_with_root();
        let f = function_with_args(&mut m, "g", &[]);
        assert_eq!(m.key(f), "Function|g|-|0|-|");
    }

    #[test]
    fn static_function_key_names_its_unit() {
        let mut m = model_with_root();
        let tu = m.new_tunit("a.cc", 0).unwrap();
        let f = function_with_args(&mut m, "h", &[]);
        m.set_slot(f, "static_in", Some(tu)).unwrap();
        assert_eq!(m.key(f), "Function|h|-|0|TUnit|a.cc|");
    }

    #[test]
    fn source_key() {
        let mut m = model_with_root();
        let tu = m.new_tunit("a.h", 0).unwrap();
        let root = m.root().unwrap();
        let c = m.new_name(root, Kind::Class, "C").unwrap();
        let s = m.new_source(c, tu, SourceLocKind::Decl, 12, 3).unwrap();
        assert_eq!(m.key(s), "Source|2|TUnit|a.h|12|");
    }

    #[test]
    fn access_key_uses_lid() {
        let mut m = model_with_root();
        let f = function_with_args(&mut m, "f", &[]);
        let call = m.new_code(f, Kind::Call, 4).unwrap();
        let exec = m.new_code(f, Kind::Execution, 0).unwrap();
        assert_eq!(m.key(call), "Call|4|");
        assert_eq!(m.key(exec), "Execution|");
    }

    #[test]
    fn key_cache_drops_on_mutation() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let ns = m.new_name(root, Kind::Namespace, "a").unwrap();
        assert_eq!(m.key(ns), "Namespace|a|");
        m.data_mut(ns).unwrap().name_mut().unwrap().name = "b".into();
        assert_eq!(m.key(ns), "Namespace|b|");
    }

    #[test]
    fn children_are_adopted() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let c = m.new_name(root, Kind::Class, "C").unwrap();
        assert_eq!(m.node(c).unwrap().parent(), Some(root));
        assert_eq!(m.slot_ids(root, "children").unwrap(), vec![c]);
        assert!(m.insert_into(root, "nope", c).is_err());
    }

    #[test]
    fn shape_mismatch_is_reported() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let f = function_with_args(&mut m, "f", &[]);
        let t = m.new_type("int");
        let err = m.insert_into(f, "result_type", t).unwrap_err();
        assert!(matches!(err, CoreError::SlotShape { .. }));
        assert!(m.set_slot(root, "children", None).is_err());
    }

    #[test]
    fn select_filters_by_mask() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let f = m.new_name(root, Kind::Function, "f").unwrap();
        let v = m.new_name(root, Kind::Variable, "v").unwrap();
        let _ = m.new_tunit("a.cc", 0).unwrap();
        assert_eq!(m.select(Kind::Function.mask(), false), vec![f]);
        let names = m.select(JoinPointType::NAME, false);
        assert_eq!(names, vec![root, f, v]);
        assert_eq!(m.select(JoinPointType::FILE, false).len(), 1);
    }

    #[test]
    fn select_prj_only_skips_unseen_classes() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let tu = m.new_tunit("a.cc", 0).unwrap();
        let seen = m.new_name(root, Kind::Class, "Seen").unwrap();
        let _unseen = m.new_name(root, Kind::Class, "Unseen").unwrap();
        m.insert_into(seen, "tunits", tu).unwrap();
        assert_eq!(m.select(Kind::Class.mask(), true), vec![seen]);
        assert_eq!(m.select(Kind::Class.mask(), false).len(), 2);
    }

    #[test]
    fn census_counts_live_nodes() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        m.new_name(root, Kind::Function, "f").unwrap();
        m.new_name(root, Kind::Function, "g").unwrap();
        let census = m.census();
        assert_eq!(census.get(&Kind::Function), Some(&2));
        assert_eq!(census.get(&Kind::Namespace), Some(&1));
        assert_eq!(census.get(&Kind::Class), None);
        let order: Vec<Kind> = census.keys().copied().collect();
        assert_eq!(order, vec![Kind::Namespace, Kind::Function]);
    }

    #[test]
    fn tree_order_is_preorder() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let tu = m.new_tunit("a.cc", 0).unwrap();
        let c = m.new_name(root, Kind::Class, "C").unwrap();
        let f = m.new_name(c, Kind::Function, "f").unwrap();
        let v = m.new_name(root, Kind::Variable, "v").unwrap();
        assert_eq!(m.tree_order(), vec![tu, root, c, f, v]);
    }

    #[test]
    fn save_ids_are_stage_scoped() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        let mut first = SaveContext::new();
        assert_eq!(m.assign_save_id(root, &mut first).unwrap(), 0);
        assert_eq!(m.assign_save_id(root, &mut first).unwrap(), 0);
        assert_eq!(first.count(), 1);
        let mut second = SaveContext::new();
        let tu = m.new_tunit("x.cc", 0).unwrap();
        assert_eq!(m.assign_save_id(tu, &mut second).unwrap(), 0);
        assert_eq!(m.assign_save_id(root, &mut second).unwrap(), 1);
        assert_eq!(m.node(root).unwrap().save_id(first.stage()), None);
    }

    #[test]
    fn mark_clean_resets_dirty() {
        let mut m = model_with_root();
        assert!(m.is_dirty());
        m.mark_clean();
        assert!(!m.is_dirty());
        let root = m.root().unwrap();
        m.set_scalar(root, "builtin", Some(Scalar::Bool(true))).unwrap();
        assert_eq!(m.dirty_count(), 1);
    }

    #[test]
    fn transform_info_roundtrip() {
        let mut m = model_with_root();
        let root = m.root().unwrap();
        m.set_transform_info(root, Box::new(42u32)).unwrap();
        let info = m.node(root).unwrap().transform_info().unwrap();
        assert_eq!(info.downcast_ref::<u32>(), Some(&42));
        let taken = m.take_transform_info(root).unwrap().unwrap();
        assert_eq!(*taken.downcast::<u32>().unwrap(), 42);
        assert!(m.node(root).unwrap().transform_info().is_none());
    }
}
