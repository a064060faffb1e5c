//! Convenience constructors for common node shapes.
//!
//! These wrap [`ProjectModel::create`] plus the slot setters so front ends
//! and tests can build models without spelling out every attribute.

use crate::attrs::Scalar;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::kind::{JoinPointType, Kind};
use crate::model::ProjectModel;
use crate::types::SourceLocKind;

/// Name of the root namespace.
pub const ROOT_NAMESPACE: &str = "::";

impl ProjectModel {
    /// Creates the root namespace and installs it.
    pub fn new_root(&mut self) -> Result<NodeId, CoreError> {
        let ns = self.create(Kind::Namespace)?;
        self.set_scalar(ns, "name", Some(Scalar::Str(ROOT_NAMESPACE.to_string())))?;
        self.set_root(ns)?;
        Ok(ns)
    }

    /// Creates a translation unit and appends it to the file list.
    pub fn new_tunit(&mut self, filename: &str, time: i32) -> Result<NodeId, CoreError> {
        self.new_file(Kind::TUnit, filename, time)
    }

    /// Creates a header and appends it to the file list.
    pub fn new_header(&mut self, filename: &str, time: i32) -> Result<NodeId, CoreError> {
        self.new_file(Kind::Header, filename, time)
    }

    fn new_file(&mut self, kind: Kind, filename: &str, time: i32) -> Result<NodeId, CoreError> {
        let id = self.create(kind)?;
        if let Some(file) = self.data_mut(id)?.file_mut() {
            file.filename = filename.to_string();
            file.time = time;
        }
        self.add_file(id)?;
        Ok(id)
    }

    /// Creates a named entity of `kind` as a child of `parent`.
    pub fn new_name(&mut self, parent: NodeId, kind: Kind, name: &str) -> Result<NodeId, CoreError> {
        if !JoinPointType::NAME.contains(kind) {
            return Err(CoreError::KindMismatch {
                id: parent,
                expected: "a named kind",
                found: kind,
            });
        }
        let id = self.create(kind)?;
        self.set_scalar(id, "name", Some(Scalar::Str(name.to_string())))?;
        self.insert_into(parent, "children", id)?;
        Ok(id)
    }

    /// Creates a code join point of `kind` as a child of `parent`. Access
    /// kinds get `lid` as their local id.
    pub fn new_code(&mut self, parent: NodeId, kind: Kind, lid: i32) -> Result<NodeId, CoreError> {
        if !JoinPointType::CODE.contains(kind) {
            return Err(CoreError::KindMismatch {
                id: parent,
                expected: "a code kind",
                found: kind,
            });
        }
        let id = self.create(kind)?;
        if JoinPointType::ACCESS.contains(kind) {
            self.set_scalar(id, "lid", Some(Scalar::Int(lid.into())))?;
        }
        self.insert_into(parent, "children", id)?;
        Ok(id)
    }

    /// Creates a detached type node.
    pub fn new_type(&mut self, signature: &str) -> NodeId {
        let data = crate::node::NodeData::Type(crate::attrs::Type {
            signature: signature.to_string(),
            ..Default::default()
        });
        self.register(data)
    }

    /// Records a source location of join point `owner` in `file`.
    pub fn new_source(
        &mut self,
        owner: NodeId,
        file: NodeId,
        kind: SourceLocKind,
        line: i32,
        len: i32,
    ) -> Result<NodeId, CoreError> {
        let id = self.create(Kind::Source)?;
        if let crate::node::NodeData::Source(s) = self.data_mut(id)? {
            s.kind = kind;
            s.line = line;
            s.len = len;
        }
        self.set_slot(id, "file", Some(file))?;
        self.insert_into(owner, "source", id)?;
        Ok(id)
    }

    /// Gives a join point a fresh jpid.
    pub fn assign_jpid(&mut self, id: NodeId) -> Result<u32, CoreError> {
        let data = self.data(id)?;
        if data.any().is_none() {
            return Err(CoreError::UnknownAttribute {
                kind: data.kind(),
                name: "jpid".to_string(),
            });
        }
        let jpid = self.alloc_jpid();
        self.set_jpid(id, Some(jpid))?;
        Ok(jpid)
    }
}
