//! Identity keys.
//!
//! A node's key is the string that identifies it among its siblings, and
//! the thing the merge engine matches on. Every key starts with the kind
//! name and each component ends with `|`. Enums contribute their integer
//! value. Keys of referenced nodes and of whole containers are spliced in,
//! so a function's key includes the signatures of its argument types.
//!
//! Keys are computed on first use and cached on the node. Mutating a node
//! through [`crate::ProjectModel::data_mut`] drops its cached key.

use std::fmt::Write;

use crate::container::Container;
use crate::id::NodeId;
use crate::node::{Node, NodeData};

/// Resolves node ids for key computation. Implemented by a single model
/// and by the pair of models taking part in a merge.
pub trait NodeLookup {
    fn lookup(&self, id: NodeId) -> Option<&Node>;
}

const NONE: &str = "-|";

/// Key of node `id`, or `-|` if it cannot be resolved.
pub fn key_of<L: NodeLookup + ?Sized>(lookup: &L, id: NodeId) -> &str {
    match lookup.lookup(id) {
        Some(node) => node.key.get_or_init(|| compute(lookup, &node.data)),
        None => NONE,
    }
}

/// Key of an optional reference.
fn opt_key<L: NodeLookup + ?Sized>(lookup: &L, id: Option<NodeId>) -> &str {
    match id {
        Some(id) => key_of(lookup, id),
        None => NONE,
    }
}

/// Concatenated element keys in insertion order, or `-|` if empty.
pub fn container_key<L: NodeLookup + ?Sized>(lookup: &L, container: &Container) -> String {
    if container.is_empty() {
        return NONE.to_string();
    }
    container.iter().map(|id| key_of(lookup, id)).collect()
}

fn compute<L: NodeLookup + ?Sized>(lookup: &L, data: &NodeData) -> String {
    let mut key = String::new();
    // Writing to a String cannot fail.
    let _ = write!(key, "{}|", data.kind());
    match data {
        NodeData::TUnit(t) => push(&mut key, &t.file.filename),
        NodeData::Header(h) => push(&mut key, &h.file.filename),
        NodeData::Source(s) => {
            push(&mut key, s.kind as i64);
            key.push_str(opt_key(lookup, s.file));
            push(&mut key, s.line);
        }
        NodeData::MemberIntro(m) => key.push_str(opt_key(lookup, m.intro)),
        NodeData::BaseIntro(b) => key.push_str(opt_key(lookup, b.intro)),
        NodeData::CodeAdvice(c) => key.push_str(opt_key(lookup, c.advice)),
        NodeData::ClassPlan(_) | NodeData::CodePlan(_) => {}
        NodeData::Type(t) => push(&mut key, &t.signature),
        NodeData::Arg(a) => push(&mut key, &a.name),
        NodeData::Function(f) => {
            push(&mut key, &f.name.name);
            key.push_str(&container_key(lookup, &f.arg_types));
            push(&mut key, f.cv_qualifiers as i64);
            key.push_str(opt_key(lookup, f.static_in));
        }
        NodeData::Pointcut(p) => {
            push(&mut key, &p.name.name);
            key.push_str(&container_key(lookup, &p.args));
        }
        NodeData::Attribute(a) => {
            push(&mut key, &a.name.name);
            key.push_str(&container_key(lookup, &a.args));
        }
        NodeData::Speculation(s) => {
            key.push_str(opt_key(lookup, s.advice));
            key.push_str(opt_key(lookup, s.tunit));
        }
        NodeData::Execution(_) | NodeData::Construction(_) | NodeData::Destruction(_) => {}
        other => {
            if let Some(name) = other.name() {
                push(&mut key, &name.name);
            } else if let Some(access) = other.access() {
                push(&mut key, access.lid);
            } else if let Some(advice) = other.advice() {
                push(&mut key, advice.lid);
            }
        }
    }
    key
}

fn push(key: &mut String, part: impl std::fmt::Display) {
    let _ = write!(key, "{part}|");
}
