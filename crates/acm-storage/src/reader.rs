//! Loads a [`ProjectModel`] from an XML document.
//!
//! Loading takes two passes over the parsed element tree. The first pass
//! creates a bare node for every element that carries an `id`, so
//! references to elements later in the document resolve. The second pass
//! fills in attributes, resolves references and builds the ownership
//! tree, creating nodes for elements without an id on the way. Afterwards
//! the jpid allocator is rebuilt from the jpids found in the model.

use std::str::FromStr;

use tracing::debug;

use acm_core::{JoinPointType, Kind, NodeId, ProjectModel, Scalar, Slot};

use crate::error::StorageError;
use crate::tree::{self, Element};
use crate::writer::DOCUMENT_ROOT;

/// Document element name used by older project files.
const LEGACY_ROOT: &str = "Model";

/// Attributes a node's identity depends on. An element of a kind that has
/// one of them must carry it.
const REQUIRED: [&str; 3] = ["filename", "name", "signature"];

/// Replaces the contents of `model` with the model stored in `text`.
///
/// On failure `model` is left empty.
pub fn read_model(text: &str, model: &mut ProjectModel) -> Result<(), StorageError> {
    model.clear();
    let result = tree::parse(text).and_then(|doc| Loader::new(model).load(&doc, text.len()));
    if result.is_err() {
        model.clear();
    }
    result
}

struct Loader<'a> {
    model: &'a mut ProjectModel,
    table: Vec<Option<NodeId>>,
}

impl<'a> Loader<'a> {
    fn new(model: &'a mut ProjectModel) -> Self {
        Loader {
            model,
            table: Vec::new(),
        }
    }

    /// `len` is the document size; every id takes at least one byte of it.
    fn load(mut self, doc: &Element, len: usize) -> Result<(), StorageError> {
        if doc.name != DOCUMENT_ROOT && doc.name != LEGACY_ROOT {
            return Err(StorageError::UnexpectedRoot {
                found: doc.name.clone(),
            });
        }
        let count = parse_id(doc.attr("ids").ok_or(StorageError::MissingIds)?)?;
        if count as usize > len {
            return Err(StorageError::Malformed {
                reason: format!("ids=\"{count}\" exceeds what a {len} byte document can hold"),
            });
        }
        self.table = vec![None; count as usize];
        if let Some(version) = doc.attr("version") {
            self.model.set_version(version);
        }

        for section in &doc.children {
            for element in &section.children {
                self.allocate(element)?;
            }
        }

        for section in &doc.children {
            match section.name.as_str() {
                "files" => {
                    for element in &section.children {
                        let id = self.init(element)?;
                        self.model.add_file(id)?;
                    }
                }
                "root" => {
                    if let Some(element) = section.children.first() {
                        let id = self.init(element)?;
                        self.model.set_root(id)?;
                    }
                }
                "speculations" => {
                    for element in &section.children {
                        let id = self.init(element)?;
                        self.model.add_speculation(id)?;
                    }
                }
                other => {
                    return Err(StorageError::Malformed {
                        reason: format!("unknown section <{other}>"),
                    })
                }
            }
        }

        let mut reserved = 0usize;
        for id in self.model.select(JoinPointType::ANY, false) {
            if let Some(jpid) = self.model.data(id)?.jpid() {
                self.model.reserve_jpid(jpid)?;
                reserved += 1;
            }
        }
        self.model.mark_clean();
        debug!(nodes = self.model.len(), ids = count, jpids = reserved, "model loaded");
        Ok(())
    }

    fn kind_of(element: &Element) -> Result<Kind, StorageError> {
        Kind::from_str(&element.name).map_err(|_| StorageError::UnknownKind {
            name: element.name.clone(),
        })
    }

    /// First pass: creates the nodes of every element with an id.
    fn allocate(&mut self, element: &Element) -> Result<(), StorageError> {
        let kind = Self::kind_of(element)?;
        if let Some(text) = element.attr("id") {
            let id = parse_id(text)?;
            let count = self.table.len() as u32;
            let slot = self
                .table
                .get_mut(id as usize)
                .ok_or(StorageError::IdOutOfRange { id, count })?;
            if slot.is_some() {
                return Err(StorageError::DuplicateId { id });
            }
            *slot = Some(self.model.create(kind)?);
        }
        for wrapper in &element.children {
            for child in &wrapper.children {
                self.allocate(child)?;
            }
        }
        Ok(())
    }

    fn resolve(&self, text: &str) -> Result<NodeId, StorageError> {
        let id = parse_id(text)?;
        self.table
            .get(id as usize)
            .copied()
            .flatten()
            .ok_or(StorageError::UnresolvedReference { id })
    }

    /// Second pass: fills in the node of `element` and its subtree.
    fn init(&mut self, element: &Element) -> Result<NodeId, StorageError> {
        let id = match element.attr("id") {
            Some(text) => self.resolve(text)?,
            None => self.model.create(Self::kind_of(element)?)?,
        };

        let fields = self.model.data(id)?.scalar_fields();
        for field in &fields {
            if REQUIRED.contains(&field.name) && element.attr(field.name).is_none() {
                return Err(StorageError::MissingAttribute {
                    element: element.name.clone(),
                    attr: field.name,
                });
            }
        }

        for (name, text) in &element.attrs {
            if name == "id" {
                continue;
            }
            if let Some(field) = fields.iter().find(|f| f.name == name.as_str()) {
                let value = Scalar::parse(name, field.ty, text)?;
                self.model.set_scalar(id, name, Some(value))?;
                continue;
            }
            let idx = self.model.slot_index(id, name)?;
            let single = match self.model.data(id)?.slot_list().get(idx) {
                Some((_, Slot::Link(_))) => true,
                Some((_, Slot::Links(_))) => false,
                _ => {
                    return Err(StorageError::Malformed {
                        reason: format!("<{}> has owned slot `{name}` as an attribute", element.name),
                    })
                }
            };
            if single {
                let target = self.resolve(text)?;
                self.model.set_slot(id, name, Some(target))?;
            } else {
                for part in text.split_whitespace() {
                    let target = self.resolve(part)?;
                    self.model.insert_into(id, name, target)?;
                }
            }
        }

        for wrapper in &element.children {
            let idx = self.model.slot_index(id, &wrapper.name)?;
            let single = match self.model.data(id)?.slot_list().get(idx) {
                Some((_, Slot::Owned(_))) => true,
                Some((_, Slot::OwnedMany(_))) => false,
                _ => {
                    return Err(StorageError::Malformed {
                        reason: format!(
                            "<{}> has reference slot `{}` as an element",
                            element.name, wrapper.name
                        ),
                    })
                }
            };
            if single && wrapper.children.len() > 1 {
                return Err(StorageError::Malformed {
                    reason: format!(
                        "<{}> slot `{}` holds more than one node",
                        element.name, wrapper.name
                    ),
                });
            }
            for child in &wrapper.children {
                let child_id = self.init(child)?;
                if single {
                    self.model.set_slot(id, &wrapper.name, Some(child_id))?;
                } else {
                    self.model.insert_into(id, &wrapper.name, child_id)?;
                }
            }
        }
        Ok(id)
    }
}

fn parse_id(text: &str) -> Result<u32, StorageError> {
    text.trim().parse().map_err(|_| StorageError::InvalidId {
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use acm_core::SourceLocKind;

    const SMALL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ac-model ids="2" version="1.2">
  <files>
    <TUnit id="0" filename="main.cc" time="7"/>
  </files>
  <root>
    <Namespace name="::">
      <children>
        <Function jpid="4" name="main" tunits="0" calls="1">
          <source>
            <Source kind="1" line="3" len="4" file="0"/>
          </source>
        </Function>
        <Function id="1" jpid="2" name="helper" calls="1"/>
      </children>
    </Namespace>
  </root>
  <speculations/>
</ac-model>"#;

    #[test]
    fn loads_small_document() {
        let mut m = ProjectModel::new();
        read_model(SMALL, &mut m).unwrap();

        assert_eq!(m.version(), "1.2");
        assert_eq!(m.files().len(), 1);
        let main = m.find(Kind::Function.mask(), "Function|main|-|0|-|").unwrap();
        let helper = m.find(Kind::Function.mask(), "Function|helper|-|0|-|").unwrap();
        assert_eq!(m.data(main).unwrap().jpid(), Some(4));
        assert_eq!(m.slot_ids(main, "calls").unwrap(), vec![helper]);
        assert_eq!(m.slot_ids(helper, "calls").unwrap(), vec![helper]);
        assert_eq!(m.node(main).unwrap().parent(), m.root());

        let sources = m.slot_ids(main, "source").unwrap();
        let source = m.data(sources[0]).unwrap().as_source().unwrap();
        assert_eq!(source.kind, SourceLocKind::Def);
        assert_eq!(source.file, Some(m.files().as_slice()[0]));
        assert!(!m.is_dirty());
    }

    #[test]
    fn allocator_is_rebuilt_from_loaded_jpids() {
        let mut m = ProjectModel::new();
        read_model(SMALL, &mut m).unwrap();
        assert!(m.jpids().is_used(2));
        assert!(m.jpids().is_used(4));
        assert_eq!(m.alloc_jpid(), 0);
        assert_eq!(m.alloc_jpid(), 1);
        assert_eq!(m.alloc_jpid(), 3);
        assert_eq!(m.alloc_jpid(), 5);
    }

    #[test]
    fn legacy_root_name_is_accepted() {
        let mut m = ProjectModel::new();
        read_model(r#"<Model ids="0"><files/></Model>"#, &mut m).unwrap();
        assert!(m.root().is_none());
    }

    fn load_err(text: &str) -> StorageError {
        let mut m = ProjectModel::new();
        let err = read_model(text, &mut m).unwrap_err();
        assert!(m.is_empty());
        assert!(m.root().is_none());
        err
    }

    #[test]
    fn rejects_unexpected_root() {
        assert!(matches!(
            load_err(r#"<project ids="0"/>"#),
            StorageError::UnexpectedRoot { .. }
        ));
    }

    #[test]
    fn rejects_missing_ids() {
        assert!(matches!(
            load_err("<ac-model><files/></ac-model>"),
            StorageError::MissingIds
        ));
    }

    #[test]
    fn rejects_id_out_of_range() {
        let err = load_err(r#"<ac-model ids="1"><files><TUnit id="1" filename="a.cc"/></files></ac-model>"#);
        assert!(matches!(err, StorageError::IdOutOfRange { id: 1, count: 1 }));
    }

    #[test]
    fn rejects_duplicate_id() {
        let err = load_err(
            r#"<ac-model ids="1"><files>
                 <TUnit id="0" filename="a.cc"/>
                 <TUnit id="0" filename="b.cc"/>
               </files></ac-model>"#,
        );
        assert!(matches!(err, StorageError::DuplicateId { id: 0 }));
    }

    #[test]
    fn rejects_unresolved_reference() {
        let err = load_err(
            r#"<ac-model ids="3"><root>
                 <Namespace name="::" tunits="2"/>
               </root></ac-model>"#,
        );
        assert!(matches!(err, StorageError::UnresolvedReference { id: 2 }));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = load_err(r#"<ac-model ids="0"><files><Blob/></files></ac-model>"#);
        assert!(matches!(err, StorageError::UnknownKind { ref name } if name == "Blob"));
    }

    #[test]
    fn rejects_missing_name() {
        let err = load_err(r#"<ac-model ids="0"><root><Namespace/></root></ac-model>"#);
        assert!(matches!(
            err,
            StorageError::MissingAttribute { attr: "name", .. }
        ));
    }

    #[test]
    fn rejects_bad_integer() {
        let err = load_err(
            r#"<ac-model ids="0"><files><TUnit filename="a.cc" time="soon"/></files></ac-model>"#,
        );
        assert!(matches!(err, StorageError::Core(_)));
    }

    #[test]
    fn rejects_id_count_larger_than_document() {
        let err = load_err(r#"<ac-model ids="4000000000"><files/></ac-model>"#);
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn huge_jpid_reserves_one_gap() {
        let mut m = ProjectModel::new();
        read_model(
            r#"<ac-model ids="0"><root><Namespace name="::" jpid="4294967294"/></root></ac-model>"#,
            &mut m,
        )
        .unwrap();
        assert!(m.jpids().is_used(4_294_967_294));
        assert_eq!(m.alloc_jpid(), 0);
    }

    #[test]
    fn rejects_jpid_at_u32_max() {
        let err = load_err(
            r#"<ac-model ids="0"><root><Namespace name="::" jpid="4294967295"/></root></ac-model>"#,
        );
        assert!(matches!(
            err,
            StorageError::Core(acm_core::CoreError::JpidOutOfRange { jpid: u32::MAX })
        ));
    }

    #[test]
    fn failed_load_clears_previous_contents() {
        let mut m = ProjectModel::new();
        read_model(SMALL, &mut m).unwrap();
        assert!(read_model("<ac-model/>", &mut m).is_err());
        assert!(m.is_empty());
        assert_eq!(m.jpids().high_water(), 0);
    }
}
