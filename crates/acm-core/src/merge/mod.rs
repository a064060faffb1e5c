//! Incremental merge of a translation-unit model into the project model.
//!
//! One merge runs these phases in order:
//!
//! 1. [`Merger::init_change_set`]: files present in both models whose
//!    modification time differs are recorded as modified.
//! 2. [`Merger::source_cleanup`]: every project node whose source
//!    locations all lie in modified files is deleted, transitively
//!    through ownership and required references.
//! 3. [`Merger::merge_model`]: the two trees are walked in parallel by key.
//!    Matching nodes are merged attribute by attribute, nodes only in the
//!    translation unit are deep-copied into the project.
//! 4. [`Merger::fix_refs`]: references that still point into the
//!    translation-unit model are redirected to their project counterparts.
//! 5. [`Merger::clear_change_set`].
//!
//! [`ProjectModel::merge`] runs all of them.

mod cleanup;
mod policy;

pub use policy::{AttrSite, DefaultPolicy, KeepProject, MergePolicy};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::attrs::{Scalar, Slot, SlotMut};
use crate::container::Container;
use crate::id::NodeId;
use crate::key::{self, NodeLookup};
use crate::kind::Kind;
use crate::model::ProjectModel;
use crate::node::Node;

/// What a merge did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    /// Files whose timestamp changed.
    pub modified_files: usize,
    /// Project nodes removed by source cleanup.
    pub deleted: usize,
    /// Node pairs merged in place.
    pub merged: usize,
    /// Translation-unit nodes copied into the project.
    pub copied: usize,
    /// References redirected into the project model.
    pub relinked: usize,
    /// References dropped because their target had no counterpart.
    pub dropped_refs: usize,
}

/// A container location in one of the models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Place {
    Files,
    Speculations,
    Slot(NodeId, usize),
}

/// Resolves ids of both models while they are being merged.
struct Both<'a> {
    prj: &'a ProjectModel,
    tu: &'a ProjectModel,
}

impl NodeLookup for Both<'_> {
    fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.prj.get(id).or_else(|| self.tu.get(id))
    }
}

fn container_at(model: &ProjectModel, place: Place) -> Option<&Container> {
    match place {
        Place::Files => Some(model.files()),
        Place::Speculations => Some(model.speculations()),
        Place::Slot(owner, idx) => {
            let node = model.get(owner)?;
            match node.data.slot_list().get(idx)? {
                (_, Slot::OwnedMany(c)) | (_, Slot::Links(c)) => Some(*c),
                _ => None,
            }
        }
    }
}

/// One step of a container walk.
enum Step {
    Merge(NodeId, NodeId),
    Insert(NodeId),
}

/// Shape of a translation-unit slot, captured before the project side is
/// mutated.
enum SlotShot {
    Owned(Option<NodeId>),
    OwnedMany,
    Link(Option<NodeId>),
    Links,
}

/// State of one merge of `tu` into `prj`.
pub struct Merger<'a> {
    prj: &'a mut ProjectModel,
    tu: &'a mut ProjectModel,
    policy: &'a mut dyn MergePolicy,
    modified: HashSet<NodeId>,
    /// Translation-unit node to the project node it was merged into or
    /// copied to.
    partners: HashMap<NodeId, NodeId>,
    stats: MergeStats,
}

impl<'a> Merger<'a> {
    /// Starts a new merge round on `prj`.
    pub fn new(
        prj: &'a mut ProjectModel,
        tu: &'a mut ProjectModel,
        policy: &'a mut dyn MergePolicy,
    ) -> Self {
        prj.merge_id += 1;
        Merger {
            prj,
            tu,
            policy,
            modified: HashSet::new(),
            partners: HashMap::new(),
            stats: MergeStats::default(),
        }
    }

    /// Runs every phase and returns the statistics.
    pub fn run(mut self) -> MergeStats {
        self.init_change_set();
        self.source_cleanup();
        self.merge_model();
        self.fix_refs();
        self.clear_change_set();
        info!(
            modified = self.stats.modified_files,
            deleted = self.stats.deleted,
            merged = self.stats.merged,
            copied = self.stats.copied,
            "merged translation unit model"
        );
        self.stats
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Project-side files recorded as modified in this round.
    pub fn modified_files(&self) -> &HashSet<NodeId> {
        &self.modified
    }

    /// Project node a translation-unit node was merged into or copied to.
    pub fn partner(&self, that: NodeId) -> Option<NodeId> {
        self.partners.get(&that).copied()
    }

    fn sorted(&self, from_prj: bool, place: Place) -> Vec<(String, NodeId)> {
        let both = Both {
            prj: &*self.prj,
            tu: &*self.tu,
        };
        let model: &ProjectModel = if from_prj { &*self.prj } else { &*self.tu };
        match container_at(model, place) {
            Some(c) => c
                .sorted_with(|id| key::key_of(&both, id).to_owned())
                .to_vec(),
            None => Vec::new(),
        }
    }

    fn walk(mine: &[(String, NodeId)], theirs: &[(String, NodeId)]) -> Vec<Step> {
        let mut steps = Vec::new();
        let (mut i, mut j) = (0, 0);
        while j < theirs.len() {
            if i >= mine.len() || theirs[j].0 < mine[i].0 {
                steps.push(Step::Insert(theirs[j].1));
                j += 1;
            } else if mine[i].0 < theirs[j].0 {
                i += 1;
            } else {
                steps.push(Step::Merge(mine[i].1, theirs[j].1));
                i += 1;
                j += 1;
            }
        }
        steps
    }

    // -----------------------------------------------------------------------
    // Change set
    // -----------------------------------------------------------------------

    /// Records files whose modification time differs between the models
    /// and takes over the new time.
    pub fn init_change_set(&mut self) {
        let mine = self.sorted(true, Place::Files);
        let theirs = self.sorted(false, Place::Files);
        for step in Self::walk(&mine, &theirs) {
            let Step::Merge(me, that) = step else {
                continue;
            };
            let Some(that_time) = self
                .tu
                .get(that)
                .and_then(|n| n.data.file())
                .map(|f| f.time)
            else {
                continue;
            };
            let my_time = self.prj.get(me).and_then(|n| n.data.file()).map(|f| f.time);
            if my_time == Some(that_time) {
                continue;
            }
            if let Ok(data) = self.prj.data_mut(me) {
                if let Some(file) = data.file_mut() {
                    debug!(file = %file.filename, "file modified");
                    file.time = that_time;
                }
            }
            self.modified.insert(me);
        }
        self.stats.modified_files = self.modified.len();
        debug!(modified = self.stats.modified_files, "change set computed");
    }

    /// Forgets the modified-file set.
    pub fn clear_change_set(&mut self) {
        self.modified.clear();
    }

    // -----------------------------------------------------------------------
    // Merging
    // -----------------------------------------------------------------------

    /// Merges the model-level fields: files, root namespace, speculations,
    /// version.
    pub fn merge_model(&mut self) {
        self.merge_container(Place::Files, Place::Files, false);
        match (self.prj.root(), self.tu.root()) {
            (Some(me), Some(that)) => self.merge_node(me, that),
            (None, Some(that)) => {
                if let Some(copy) = self.copy_node(that) {
                    self.prj.set_root_raw(Some(copy));
                }
            }
            _ => {}
        }
        self.merge_container(Place::Speculations, Place::Speculations, false);

        if self.prj.version() != self.tu.version() {
            let site = AttrSite {
                kind: Kind::Model,
                me: None,
                that: None,
                attr: "version",
            };
            let mine = Scalar::Str(self.prj.version().to_string());
            let theirs = Scalar::Str(self.tu.version().to_string());
            if self.policy.merge_attr(&site, &mine, &theirs) {
                let version = self.tu.version().to_string();
                self.prj.set_version(version);
            }
        }
        debug!(
            merged = self.stats.merged,
            copied = self.stats.copied,
            "trees merged"
        );
    }

    /// Merges translation-unit node `that` into project node `me`. The two
    /// must have equal keys.
    pub fn merge_node(&mut self, me: NodeId, that: NodeId) {
        self.stats.merged += 1;
        self.merge_scalars(me, that);

        let Some(that_node) = self.tu.get(that) else {
            return;
        };
        let shots: Vec<SlotShot> = that_node
            .data
            .slot_list()
            .into_iter()
            .map(|(_, slot)| match slot {
                Slot::Owned(id) => SlotShot::Owned(id),
                Slot::OwnedMany(_) => SlotShot::OwnedMany,
                Slot::Link(id) => SlotShot::Link(id),
                Slot::Links(_) => SlotShot::Links,
            })
            .collect();

        for (idx, shot) in shots.into_iter().enumerate() {
            let place = Place::Slot(me, idx);
            let that_place = Place::Slot(that, idx);
            match shot {
                SlotShot::Owned(Some(t)) => match self.single_at(me, idx) {
                    Some(m) => self.merge_node(m, t),
                    None => {
                        if let Some(copy) = self.copy_node(t) {
                            self.set_single(me, idx, Some(copy));
                        }
                    }
                },
                SlotShot::Link(Some(t)) => {
                    let current = self.single_at(me, idx);
                    if current.is_none() || self.partners.get(&t).copied() != current {
                        self.set_single(me, idx, Some(t));
                    }
                }
                SlotShot::OwnedMany => self.merge_container(place, that_place, false),
                SlotShot::Links => self.merge_container(place, that_place, true),
                SlotShot::Owned(None) | SlotShot::Link(None) => {}
            }
        }
        self.partners.insert(that, me);
    }

    fn merge_scalars(&mut self, me: NodeId, that: NodeId) {
        let (Some(me_node), Some(that_node)) = (self.prj.get(me), self.tu.get(that)) else {
            return;
        };
        let kind = me_node.kind();
        let mine = me_node.data.scalar_fields();
        let theirs = that_node.data.scalar_fields();
        for (m, t) in mine.into_iter().zip(theirs) {
            let site = AttrSite {
                kind,
                me: Some(me),
                that: Some(that),
                attr: m.name,
            };
            match (m.value, t.value) {
                (Some(a), Some(b)) if a != b => {
                    if m.name == "jpid" {
                        if let Scalar::Int(j) = a {
                            if let Err(e) = self.tu.set_jpid(that, u32::try_from(j).ok()) {
                                warn!(error = %e, "could not write jpid back");
                            }
                        }
                        continue;
                    }
                    if self.policy.merge_attr(&site, &a, &b) {
                        if let Err(e) = self.prj.set_scalar(me, m.name, Some(b)) {
                            warn!(error = %e, "could not take over attribute");
                        }
                    }
                }
                (None, Some(_)) => self.policy.merge_attr_only_in_that(&site),
                (Some(_), None) => self.policy.merge_attr_only_in_me(&site),
                _ => {}
            }
        }
    }

    fn single_at(&self, owner: NodeId, idx: usize) -> Option<NodeId> {
        let node = self.prj.get(owner)?;
        match node.data.slot_list().get(idx)? {
            (_, Slot::Owned(id)) | (_, Slot::Link(id)) => *id,
            _ => None,
        }
    }

    fn set_single(&mut self, owner: NodeId, idx: usize, value: Option<NodeId>) {
        if let Err(e) = self.prj.set_single_at(owner, idx, value) {
            warn!(error = %e, "could not set slot");
        }
    }

    fn push(&mut self, place: Place, id: NodeId) {
        match place {
            Place::Files => self.prj.files_mut().push(id),
            Place::Speculations => self.prj.speculations_mut().push(id),
            Place::Slot(owner, idx) => {
                if let Err(e) = self.prj.push_at(owner, idx, id) {
                    warn!(error = %e, "could not insert into container");
                }
            }
        }
    }

    /// Walks two containers in key order. Elements only in the
    /// translation unit are copied in (or, for reference containers,
    /// linked as-is and fixed up later); elements in both are merged.
    fn merge_container(&mut self, place: Place, that_place: Place, refs: bool) {
        let mine = self.sorted(true, place);
        let theirs = self.sorted(false, that_place);
        for step in Self::walk(&mine, &theirs) {
            match step {
                Step::Insert(t) => {
                    let id = if refs { Some(t) } else { self.copy_node(t) };
                    if let Some(id) = id {
                        self.push(place, id);
                    }
                }
                Step::Merge(m, t) => {
                    if !refs {
                        self.merge_node(m, t);
                    }
                }
            }
        }
    }

    /// Deep-copies translation-unit node `that` into the project model.
    ///
    /// Owned children are copied recursively; references are copied as-is
    /// and redirected by [`Merger::fix_refs`]. A node carrying a jpid gets
    /// a fresh project jpid, which is written back onto `that` as well.
    pub fn copy_node(&mut self, that: NodeId) -> Option<NodeId> {
        let mut data = self.tu.get(that)?.data.clone();
        if let Some(any) = data.any_mut() {
            if any.jpid.is_some() {
                let jpid = self.prj.alloc_jpid();
                any.jpid = Some(jpid);
                if let Err(e) = self.tu.set_jpid(that, Some(jpid)) {
                    warn!(error = %e, "could not write jpid back");
                }
            }
        }
        let owned: Vec<(usize, Vec<NodeId>)> = data
            .slot_list()
            .iter()
            .enumerate()
            .filter(|(_, (_, slot))| slot.is_owned())
            .map(|(idx, (_, slot))| (idx, slot.ids()))
            .collect();

        let copy = self.prj.register(data);
        self.partners.insert(that, copy);
        self.stats.copied += 1;

        for (idx, children) in owned {
            let copies: Vec<NodeId> = children
                .into_iter()
                .filter_map(|child| self.copy_node(child))
                .collect();
            if let Err(e) = self.prj.replace_owned_at(copy, idx, copies) {
                warn!(error = %e, "could not attach copied children");
            }
        }
        Some(copy)
    }

    // -----------------------------------------------------------------------
    // Reference fix-up
    // -----------------------------------------------------------------------

    /// Redirects every reference into the translation-unit model to the
    /// partner of its target. References whose target has no partner are
    /// dropped. Forgets the partner map afterwards.
    pub fn fix_refs(&mut self) {
        let tu_model = self.tu.id();
        for id in self.prj.tree_order() {
            let Some(node) = self.prj.get(id) else {
                continue;
            };
            let foreign = node
                .data
                .slot_list()
                .iter()
                .filter(|(_, slot)| !slot.is_owned())
                .any(|(_, slot)| slot.ids().iter().any(|t| t.model == tu_model));
            if !foreign {
                continue;
            }

            let Merger {
                prj,
                partners,
                stats,
                ..
            } = self;
            let Ok(data) = prj.data_mut(id) else {
                continue;
            };
            let kind = data.kind();
            let mut resolve = |t: NodeId, slot: &str| -> Option<NodeId> {
                if t.model != tu_model {
                    return Some(t);
                }
                match partners.get(&t) {
                    Some(local) => {
                        stats.relinked += 1;
                        Some(*local)
                    }
                    None => {
                        stats.dropped_refs += 1;
                        warn!(%kind, slot, target = %t, "dropping reference without counterpart");
                        None
                    }
                }
            };
            for (name, slot) in data.slot_list_mut() {
                match slot {
                    SlotMut::Link(target) => {
                        if let Some(t) = *target {
                            *target = resolve(t, name);
                        }
                    }
                    SlotMut::Links(c) => {
                        let fixed: Vec<NodeId> =
                            c.iter().filter_map(|t| resolve(t, name)).collect();
                        c.replace_all(fixed);
                    }
                    SlotMut::Owned(_) | SlotMut::OwnedMany(_) => {}
                }
            }
        }
        self.partners.clear();
        debug!(
            relinked = self.stats.relinked,
            dropped = self.stats.dropped_refs,
            "references fixed"
        );
    }
}

impl ProjectModel {
    /// Merges translation-unit model `tu` into this project model with the
    /// default conflict policy.
    pub fn merge(&mut self, tu: &mut ProjectModel) -> MergeStats {
        self.merge_with(tu, &mut DefaultPolicy)
    }

    /// Merges `tu` into this model, consulting `policy` on conflicts.
    pub fn merge_with(&mut self, tu: &mut ProjectModel, policy: &mut dyn MergePolicy) -> MergeStats {
        Merger::new(self, tu, policy).run()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::JoinPointType;
    use crate::types::SourceLocKind;

    fn tu_with_function(file: &str, time: i32, name: &str) -> (ProjectModel, NodeId) {
        let mut m = ProjectModel::new();
        let root = m.new_root().unwrap();
        let tu = m.new_tunit(file, time).unwrap();
        let f = m.new_name(root, Kind::Function, name).unwrap();
        m.assign_jpid(f).unwrap();
        m.new_source(f, tu, SourceLocKind::Def, 1, 1).unwrap();
        m.insert_into(f, "tunits", tu).unwrap();
        (m, f)
    }

    #[test]
    fn merge_into_empty_copies_everything() {
        let mut prj = ProjectModel::new();
        let (mut tu, _) = tu_with_function("a.cc", 1, "f");
        let stats = prj.merge(&mut tu);
        assert_eq!(stats.merged, 0);
        assert!(stats.copied >= 4);
        let f = prj.find(Kind::Function.mask(), "Function|f|-|0|-|").unwrap();
        assert_eq!(prj.data(f).unwrap().jpid(), Some(0));
        // References point into the project model.
        let tunits = prj.slot_ids(f, "tunits").unwrap();
        assert_eq!(tunits.len(), 1);
        assert_eq!(tunits[0].model, prj.id());
        assert_eq!(prj.files().len(), 1);
    }

    #[test]
    fn copy_writes_jpid_back() {
        let mut prj = ProjectModel::new();
        prj.new_root().unwrap();
        prj.reserve_jpid(0).unwrap();
        prj.reserve_jpid(1).unwrap();
        let (mut tu, f) = tu_with_function("a.cc", 1, "f");
        prj.merge(&mut tu);
        assert_eq!(tu.data(f).unwrap().jpid(), Some(2));
    }

    #[test]
    fn matching_jpid_is_kept_and_written_back() {
        let mut prj = ProjectModel::new();
        let (mut first, _) = tu_with_function("a.cc", 1, "f");
        prj.merge(&mut first);
        let (mut second, f2) = tu_with_function("b.cc", 1, "f");
        // The second unit numbered its own nodes independently.
        second.set_jpid(f2, Some(17)).unwrap();
        prj.merge(&mut second);
        assert_eq!(second.data(f2).unwrap().jpid(), Some(0));
        let f = prj.find(Kind::Function.mask(), "Function|f|-|0|-|").unwrap();
        assert_eq!(prj.data(f).unwrap().jpid(), Some(0));
        assert_eq!(prj.slot_ids(f, "tunits").unwrap().len(), 2);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut prj = ProjectModel::new();
        let (mut tu, _) = tu_with_function("a.cc", 1, "f");
        prj.merge(&mut tu);
        let census = prj.census();
        let (mut again, _) = tu_with_function("a.cc", 1, "f");
        let stats = prj.merge(&mut again);
        assert_eq!(stats.copied, 0);
        assert_eq!(stats.deleted, 0);
        assert_eq!(prj.census(), census);
    }

    #[test]
    fn policy_can_keep_project_values() {
        let mut prj = ProjectModel::new();
        let (mut first, _) = tu_with_function("a.cc", 1, "f");
        prj.merge(&mut first);
        let (mut second, f2) = tu_with_function("a.cc", 1, "f");
        second
            .set_scalar(f2, "variadic_args", Some(Scalar::Bool(true)))
            .unwrap();
        let mut policy = KeepProject::default();
        prj.merge_with(&mut second, &mut policy);
        assert_eq!(policy.conflicts.len(), 1);
        assert_eq!(policy.conflicts[0].attr, "variadic_args");
        let f = prj.select(Kind::Function.mask(), false)[0];
        assert!(!prj.data(f).unwrap().as_function().unwrap().variadic_args);
    }

    #[test]
    fn default_policy_takes_new_values() {
        let mut prj = ProjectModel::new();
        let (mut first, _) = tu_with_function("a.cc", 1, "f");
        prj.merge(&mut first);
        let (mut second, f2) = tu_with_function("a.cc", 1, "f");
        second
            .set_scalar(f2, "variadic_args", Some(Scalar::Bool(true)))
            .unwrap();
        prj.merge(&mut second);
        let f = prj.select(Kind::Function.mask(), false)[0];
        assert!(prj.data(f).unwrap().as_function().unwrap().variadic_args);
    }

    #[test]
    fn version_follows_the_unit() {
        let mut prj = ProjectModel::new();
        prj.set_version("1.0");
        let (mut tu, _) = tu_with_function("a.cc", 1, "f");
        tu.set_version("2.0");
        prj.merge(&mut tu);
        assert_eq!(prj.version(), "2.0");
    }

    #[test]
    fn change_set_detects_new_timestamps() {
        let mut prj = ProjectModel::new();
        let (mut first, _) = tu_with_function("a.cc", 1, "f");
        prj.merge(&mut first);
        let (mut second, _) = tu_with_function("a.cc", 2, "f");
        let mut policy = DefaultPolicy;
        let mut merger = Merger::new(&mut prj, &mut second, &mut policy);
        merger.init_change_set();
        assert_eq!(merger.modified_files().len(), 1);
        merger.clear_change_set();
        assert!(merger.modified_files().is_empty());
        drop(merger);
        let tu = prj.select(JoinPointType::FILE, false)[0];
        assert_eq!(prj.data(tu).unwrap().file().unwrap().time, 2);
    }

    #[test]
    fn unresolved_refs_are_dropped() {
        let mut prj = ProjectModel::new();
        let mut tu = ProjectModel::new();
        let root = tu.new_root().unwrap();
        let f = tu.new_name(root, Kind::Function, "f").unwrap();
        // A unit that is referenced but not part of the file list.
        let stray = tu.create(Kind::TUnit).unwrap();
        tu.insert_into(f, "tunits", stray).unwrap();
        let stats = prj.merge(&mut tu);
        assert_eq!(stats.dropped_refs, 1);
        let pf = prj.select(Kind::Function.mask(), false)[0];
        assert!(prj.slot_ids(pf, "tunits").unwrap().is_empty());
    }
}
