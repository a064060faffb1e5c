//! Node collections.
//!
//! A [`Container`] keeps its elements in insertion order and, lazily, a
//! key-sorted view with at most one element per key. Insertion order is
//! what gets persisted; the sorted view drives merging.
//!
//! Owning containers hold children (their elements' parent is the node that
//! owns the container); reference containers only point at nodes owned
//! elsewhere.

use std::cell::OnceCell;

use smallvec::SmallVec;

use crate::id::NodeId;

/// Insertion-ordered node list with a lazily built key-sorted view.
#[derive(Debug)]
pub struct Container {
    items: SmallVec<[NodeId; 4]>,
    owning: bool,
    sorted: OnceCell<Vec<(String, NodeId)>>,
}

impl Container {
    /// An empty container that owns its elements.
    pub fn owning() -> Self {
        Container {
            items: SmallVec::new(),
            owning: true,
            sorted: OnceCell::new(),
        }
    }

    /// An empty container of references.
    pub fn refs() -> Self {
        Container {
            items: SmallVec::new(),
            owning: false,
            sorted: OnceCell::new(),
        }
    }

    pub fn is_owning(&self) -> bool {
        self.owning
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Elements in insertion order.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.items.contains(&id)
    }

    /// The key-sorted view. Built on first use with `key`, then cached
    /// until the next mutation. For equal keys only the first inserted
    /// element is kept.
    pub fn sorted_with<F>(&self, key: F) -> &[(String, NodeId)]
    where
        F: Fn(NodeId) -> String,
    {
        self.sorted.get_or_init(|| {
            let mut view: Vec<(String, NodeId)> =
                self.items.iter().map(|id| (key(*id), *id)).collect();
            view.sort_by(|a, b| a.0.cmp(&b.0));
            view.dedup_by(|later, kept| later.0 == kept.0);
            view
        })
    }

    pub(crate) fn push(&mut self, id: NodeId) {
        self.items.push(id);
        self.sorted.take();
    }

    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        match self.items.iter().position(|x| *x == id) {
            Some(pos) => {
                self.items.remove(pos);
                self.sorted.take();
                true
            }
            None => false,
        }
    }

    pub(crate) fn replace_all<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = NodeId>,
    {
        self.items = ids.into_iter().collect();
        self.sorted.take();
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
        self.sorted.take();
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        Container {
            items: self.items.clone(),
            owning: self.owning,
            sorted: OnceCell::new(),
        }
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.owning == other.owning && self.items == other.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ModelId;

    fn id(i: usize) -> NodeId {
        NodeId::new(ModelId(0), i)
    }

    #[test]
    fn keeps_insertion_order() {
        let mut c = Container::owning();
        c.push(id(3));
        c.push(id(1));
        c.push(id(2));
        assert_eq!(c.as_slice(), &[id(3), id(1), id(2)]);
        assert!(c.is_owning());
    }

    #[test]
    fn sorted_view_orders_by_key() {
        let mut c = Container::refs();
        c.push(id(0));
        c.push(id(1));
        c.push(id(2));
        let keys = ["b|", "c|", "a|"];
        let view = c.sorted_with(|n| keys[n.index as usize].to_string());
        let order: Vec<NodeId> = view.iter().map(|(_, n)| *n).collect();
        assert_eq!(order, vec![id(2), id(0), id(1)]);
    }

    #[test]
    fn sorted_view_keeps_first_of_equal_keys() {
        let mut c = Container::owning();
        c.push(id(5));
        c.push(id(6));
        c.push(id(7));
        let view = c.sorted_with(|n| if n.index == 7 { "z|".into() } else { "k|".into() });
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].1, id(5));
        // Both elements are still in the sequence.
        assert_eq!(c.len(), 3);
    }

    #[test]
    fn mutation_invalidates_view() {
        let mut c = Container::owning();
        c.push(id(1));
        assert_eq!(c.sorted_with(|_| "x|".into()).len(), 1);
        c.push(id(2));
        let view = c.sorted_with(|n| format!("{}|", n.index));
        assert_eq!(view.len(), 2);
        assert!(c.remove(id(1)));
        assert!(!c.remove(id(1)));
        assert_eq!(c.sorted_with(|n| format!("{}|", n.index)).len(), 1);
    }

    #[test]
    fn clone_drops_cached_view() {
        let mut c = Container::refs();
        c.push(id(1));
        let _ = c.sorted_with(|_| "x|".into());
        let copy = c.clone();
        assert_eq!(copy, c);
        assert!(copy.sorted.get().is_none());
    }
}
