//! Serializes a [`ProjectModel`] as an XML document.
//!
//! Every live node reachable through ownership becomes an element named
//! after its kind. Scalars and references are attributes; owned slots are
//! wrapper elements named after the slot, holding one kind-named element
//! per child. A node gets an `id` attribute only if something refers to
//! it; ids are handed out densely in the order references are first seen
//! and the total goes into the root's `ids` attribute.

use std::collections::HashSet;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::{debug, warn};

use acm_core::{NodeId, ProjectModel, SaveContext, Scalar, Slot};

use crate::error::StorageError;

/// Name of the document element.
pub const DOCUMENT_ROOT: &str = "ac-model";

/// Formatting options for [`write_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level; 0 writes the document on one line.
    pub indent: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions { indent: 2 }
    }
}

/// Writes `model` as an XML document and clears its dirty flags.
///
/// References to nodes outside the saved tree (deleted or never attached)
/// are left out.
pub fn write_model(model: &mut ProjectModel, options: &WriteOptions) -> Result<String, StorageError> {
    let order = model.tree_order();
    let saved: HashSet<NodeId> = order.iter().copied().collect();

    let mut ctx = SaveContext::new();
    let mut dropped = 0usize;
    for &id in &order {
        let node = model.node(id)?;
        let kind = node.kind();
        let targets: Vec<(&'static str, NodeId)> = node
            .data()
            .slot_list()
            .into_iter()
            .filter(|(_, slot)| !slot.is_owned())
            .flat_map(|(name, slot)| slot.ids().into_iter().map(move |t| (name, t)))
            .collect();
        for (slot, target) in targets {
            if saved.contains(&target) {
                model.assign_save_id(target, &mut ctx)?;
            } else {
                warn!(%kind, slot, %target, "dropping reference to a node outside the saved tree");
                dropped += 1;
            }
        }
    }

    let mut writer = if options.indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', options.indent)
    } else {
        Writer::new(Vec::new())
    };
    let emit = Emitter {
        model: &*model,
        saved: &saved,
        stage: ctx.stage(),
    };

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new(DOCUMENT_ROOT);
    root.push_attribute(("ids", ctx.count().to_string().as_str()));
    root.push_attribute(("version", model.version()));
    writer.write_event(Event::Start(root))?;

    emit.section(&mut writer, "files", model.files().as_slice())?;
    let root_ns: Vec<NodeId> = model.root().into_iter().collect();
    emit.section(&mut writer, "root", &root_ns)?;
    emit.section(&mut writer, "speculations", model.speculations().as_slice())?;

    writer.write_event(Event::End(BytesEnd::new(DOCUMENT_ROOT)))?;

    let text = String::from_utf8(writer.into_inner()).map_err(|e| StorageError::Malformed {
        reason: e.to_string(),
    })?;
    debug!(nodes = order.len(), ids = ctx.count(), dropped, "model written");
    model.mark_clean();
    Ok(text)
}

struct Emitter<'a> {
    model: &'a ProjectModel,
    saved: &'a HashSet<NodeId>,
    stage: u32,
}

impl Emitter<'_> {
    fn section(
        &self,
        writer: &mut Writer<Vec<u8>>,
        name: &str,
        items: &[NodeId],
    ) -> Result<(), StorageError> {
        let live: Vec<NodeId> = items
            .iter()
            .copied()
            .filter(|id| self.saved.contains(id))
            .collect();
        if live.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
            return Ok(());
        }
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        for id in live {
            self.node(writer, id)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn save_id(&self, id: NodeId) -> Option<u32> {
        self.model.get(id).and_then(|n| n.save_id(self.stage))
    }

    fn node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), StorageError> {
        let node = self.model.node(id)?;
        let tag = node.kind().type_str();
        let mut start = BytesStart::new(tag);
        if let Some(sid) = self.save_id(id) {
            start.push_attribute(("id", sid.to_string().as_str()));
        }

        for field in node.data().scalar_fields() {
            match field.value {
                None | Some(Scalar::Bool(false)) => {}
                Some(value) => start.push_attribute((field.name, value.to_string().as_str())),
            }
        }

        let mut owned: Vec<(&'static str, Vec<NodeId>)> = Vec::new();
        for (name, slot) in node.data().slot_list() {
            if slot.is_owned() {
                let children: Vec<NodeId> = slot
                    .ids()
                    .into_iter()
                    .filter(|c| self.saved.contains(c))
                    .collect();
                if !children.is_empty() {
                    owned.push((name, children));
                }
                continue;
            }
            let refs: Vec<String> = slot
                .ids()
                .into_iter()
                .filter_map(|t| self.save_id(t))
                .map(|sid| sid.to_string())
                .collect();
            let keep = match slot {
                Slot::Link(_) => refs.len() == 1,
                _ => !refs.is_empty(),
            };
            if keep {
                start.push_attribute((name, refs.join(" ").as_str()));
            }
        }

        if owned.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for (name, children) in owned {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for child in children {
                self.node(writer, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }
}
