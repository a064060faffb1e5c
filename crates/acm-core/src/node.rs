//! Arena nodes.
//!
//! A [`Node`] pairs the kind-specific record ([`NodeData`]) with the
//! bookkeeping every node carries: parent link, persistence dirty flag,
//! deletion and merge stamps, cached key, and a transient slot that
//! weaving passes may use for their own annotations.

use std::any::Any;
use std::cell::OnceCell;
use std::fmt;

use crate::attrs::*;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::kind::Kind;

/// Kind-specific data of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    TUnit(TUnit),
    Header(Header),
    Source(Source),
    MemberIntro(MemberIntro),
    BaseIntro(BaseIntro),
    ClassPlan(ClassPlan),
    CodeAdvice(CodeAdvice),
    CodePlan(CodePlan),
    Type(Type),
    Arg(Arg),
    Namespace(NameAttrs),
    Function(Function),
    Variable(Variable),
    Class(ClassAttrs),
    ClassSlice(ClassSlice),
    Get(VariableAccess),
    Set(VariableAccess),
    Call(Call),
    Builtin(Builtin),
    Ref(Ref),
    GetRef(TypedAccess),
    SetRef(TypedAccess),
    CallRef(TypedAccess),
    Execution(CodeAttrs),
    Construction(CodeAttrs),
    Destruction(CodeAttrs),
    Pointcut(Pointcut),
    Attribute(Attribute),
    AdviceCode(AdviceCode),
    Introduction(Introduction),
    Order(Order),
    Aspect(Aspect),
    Speculation(Speculation),
}

macro_rules! each_variant {
    ($data:expr, $inner:ident => $body:expr) => {
        match $data {
            NodeData::TUnit($inner) => $body,
            NodeData::Header($inner) => $body,
            NodeData::Source($inner) => $body,
            NodeData::MemberIntro($inner) => $body,
            NodeData::BaseIntro($inner) => $body,
            NodeData::ClassPlan($inner) => $body,
            NodeData::CodeAdvice($inner) => $body,
            NodeData::CodePlan($inner) => $body,
            NodeData::Type($inner) => $body,
            NodeData::Arg($inner) => $body,
            NodeData::Namespace($inner) => $body,
            NodeData::Function($inner) => $body,
            NodeData::Variable($inner) => $body,
            NodeData::Class($inner) => $body,
            NodeData::ClassSlice($inner) => $body,
            NodeData::Get($inner) => $body,
            NodeData::Set($inner) => $body,
            NodeData::Call($inner) => $body,
            NodeData::Builtin($inner) => $body,
            NodeData::Ref($inner) => $body,
            NodeData::GetRef($inner) => $body,
            NodeData::SetRef($inner) => $body,
            NodeData::CallRef($inner) => $body,
            NodeData::Execution($inner) => $body,
            NodeData::Construction($inner) => $body,
            NodeData::Destruction($inner) => $body,
            NodeData::Pointcut($inner) => $body,
            NodeData::Attribute($inner) => $body,
            NodeData::AdviceCode($inner) => $body,
            NodeData::Introduction($inner) => $body,
            NodeData::Order($inner) => $body,
            NodeData::Aspect($inner) => $body,
            NodeData::Speculation($inner) => $body,
        }
    };
}

impl NodeData {
    /// A record of `kind` with every attribute at its default.
    pub fn new(kind: Kind) -> Result<NodeData, CoreError> {
        Ok(match kind {
            Kind::TUnit => NodeData::TUnit(TUnit::default()),
            Kind::Header => NodeData::Header(Header::default()),
            Kind::Source => NodeData::Source(Source::default()),
            Kind::MemberIntro => NodeData::MemberIntro(MemberIntro::default()),
            Kind::BaseIntro => NodeData::BaseIntro(BaseIntro::default()),
            Kind::ClassPlan => NodeData::ClassPlan(ClassPlan::default()),
            Kind::CodeAdvice => NodeData::CodeAdvice(CodeAdvice::default()),
            Kind::CodePlan => NodeData::CodePlan(CodePlan::default()),
            Kind::Type => NodeData::Type(Type::default()),
            Kind::Arg => NodeData::Arg(Arg::default()),
            Kind::Namespace => NodeData::Namespace(NameAttrs::default()),
            Kind::Function => NodeData::Function(Function::default()),
            Kind::Variable => NodeData::Variable(Variable::default()),
            Kind::Class => NodeData::Class(ClassAttrs::default()),
            Kind::ClassSlice => NodeData::ClassSlice(ClassSlice::default()),
            Kind::Get => NodeData::Get(VariableAccess::default()),
            Kind::Set => NodeData::Set(VariableAccess::default()),
            Kind::Call => NodeData::Call(Call::default()),
            Kind::Builtin => NodeData::Builtin(Builtin::default()),
            Kind::Ref => NodeData::Ref(Ref::default()),
            Kind::GetRef => NodeData::GetRef(TypedAccess::default()),
            Kind::SetRef => NodeData::SetRef(TypedAccess::default()),
            Kind::CallRef => NodeData::CallRef(TypedAccess::default()),
            Kind::Execution => NodeData::Execution(CodeAttrs::default()),
            Kind::Construction => NodeData::Construction(CodeAttrs::default()),
            Kind::Destruction => NodeData::Destruction(CodeAttrs::default()),
            Kind::Pointcut => NodeData::Pointcut(Pointcut::default()),
            Kind::Attribute => NodeData::Attribute(Attribute::default()),
            Kind::AdviceCode => NodeData::AdviceCode(AdviceCode::default()),
            Kind::Introduction => NodeData::Introduction(Introduction::default()),
            Kind::Order => NodeData::Order(Order::default()),
            Kind::Aspect => NodeData::Aspect(Aspect::default()),
            Kind::Speculation => NodeData::Speculation(Speculation::default()),
            Kind::Model => return Err(CoreError::NotInstantiable { kind }),
        })
    }

    pub fn kind(&self) -> Kind {
        match self {
            NodeData::TUnit(_) => Kind::TUnit,
            NodeData::Header(_) => Kind::Header,
            NodeData::Source(_) => Kind::Source,
            NodeData::MemberIntro(_) => Kind::MemberIntro,
            NodeData::BaseIntro(_) => Kind::BaseIntro,
            NodeData::ClassPlan(_) => Kind::ClassPlan,
            NodeData::CodeAdvice(_) => Kind::CodeAdvice,
            NodeData::CodePlan(_) => Kind::CodePlan,
            NodeData::Type(_) => Kind::Type,
            NodeData::Arg(_) => Kind::Arg,
            NodeData::Namespace(_) => Kind::Namespace,
            NodeData::Function(_) => Kind::Function,
            NodeData::Variable(_) => Kind::Variable,
            NodeData::Class(_) => Kind::Class,
            NodeData::ClassSlice(_) => Kind::ClassSlice,
            NodeData::Get(_) => Kind::Get,
            NodeData::Set(_) => Kind::Set,
            NodeData::Call(_) => Kind::Call,
            NodeData::Builtin(_) => Kind::Builtin,
            NodeData::Ref(_) => Kind::Ref,
            NodeData::GetRef(_) => Kind::GetRef,
            NodeData::SetRef(_) => Kind::SetRef,
            NodeData::CallRef(_) => Kind::CallRef,
            NodeData::Execution(_) => Kind::Execution,
            NodeData::Construction(_) => Kind::Construction,
            NodeData::Destruction(_) => Kind::Destruction,
            NodeData::Pointcut(_) => Kind::Pointcut,
            NodeData::Attribute(_) => Kind::Attribute,
            NodeData::AdviceCode(_) => Kind::AdviceCode,
            NodeData::Introduction(_) => Kind::Introduction,
            NodeData::Order(_) => Kind::Order,
            NodeData::Aspect(_) => Kind::Aspect,
            NodeData::Speculation(_) => Kind::Speculation,
        }
    }

    /// Scalar attributes, ancestor-first.
    pub fn scalar_fields(&self) -> Vec<ScalarField> {
        let mut out = Vec::new();
        each_variant!(self, d => d.scalars(&mut out));
        out
    }

    /// Child and reference slots, ancestor-first.
    pub fn slot_list(&self) -> Vec<(&'static str, Slot<'_>)> {
        let mut out = Vec::new();
        each_variant!(self, d => d.slots(&mut out));
        out
    }

    pub(crate) fn slot_list_mut(&mut self) -> Vec<(&'static str, SlotMut<'_>)> {
        let mut out = Vec::new();
        each_variant!(self, d => d.slots_mut(&mut out));
        out
    }

    /// Sets a scalar attribute by name.
    pub fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<(), CoreError> {
        let kind = self.kind();
        let known = each_variant!(self, d => d.set_scalar(name, value))?;
        if known {
            Ok(())
        } else {
            Err(CoreError::UnknownAttribute {
                kind,
                name: name.to_string(),
            })
        }
    }

    /// Value of a scalar attribute by name.
    pub fn scalar(&self, name: &str) -> Option<Scalar> {
        self.scalar_fields()
            .into_iter()
            .find(|f| f.name == name)
            .and_then(|f| f.value)
    }

    // -----------------------------------------------------------------------
    // Family views
    // -----------------------------------------------------------------------

    /// File fields of a translation unit or header.
    pub fn file(&self) -> Option<&FileAttrs> {
        match self {
            NodeData::TUnit(t) => Some(&t.file),
            NodeData::Header(h) => Some(&h.file),
            _ => None,
        }
    }

    pub fn file_mut(&mut self) -> Option<&mut FileAttrs> {
        match self {
            NodeData::TUnit(t) => Some(&mut t.file),
            NodeData::Header(h) => Some(&mut h.file),
            _ => None,
        }
    }

    /// Named-entity fields, for every kind in the `Name` family.
    pub fn name(&self) -> Option<&NameAttrs> {
        match self {
            NodeData::Namespace(n) => Some(n),
            NodeData::Function(f) => Some(&f.name),
            NodeData::Variable(v) => Some(&v.name),
            NodeData::Class(c) => Some(&c.name),
            NodeData::ClassSlice(s) => Some(&s.name),
            NodeData::Pointcut(p) => Some(&p.name),
            NodeData::Attribute(a) => Some(&a.name),
            NodeData::Aspect(a) => Some(&a.class.name),
            _ => None,
        }
    }

    pub fn name_mut(&mut self) -> Option<&mut NameAttrs> {
        match self {
            NodeData::Namespace(n) => Some(n),
            NodeData::Function(f) => Some(&mut f.name),
            NodeData::Variable(v) => Some(&mut v.name),
            NodeData::Class(c) => Some(&mut c.name),
            NodeData::ClassSlice(s) => Some(&mut s.name),
            NodeData::Pointcut(p) => Some(&mut p.name),
            NodeData::Attribute(a) => Some(&mut a.name),
            NodeData::Aspect(a) => Some(&mut a.class.name),
            _ => None,
        }
    }

    /// Class fields of a class or aspect.
    pub fn class(&self) -> Option<&ClassAttrs> {
        match self {
            NodeData::Class(c) => Some(c),
            NodeData::Aspect(a) => Some(&a.class),
            _ => None,
        }
    }

    pub fn class_mut(&mut self) -> Option<&mut ClassAttrs> {
        match self {
            NodeData::Class(c) => Some(c),
            NodeData::Aspect(a) => Some(&mut a.class),
            _ => None,
        }
    }

    /// Access fields, for every kind in the `Access` family.
    pub fn access(&self) -> Option<&AccessAttrs> {
        match self {
            NodeData::Get(a) | NodeData::Set(a) => Some(&a.access),
            NodeData::Call(c) => Some(&c.access),
            NodeData::Builtin(b) => Some(&b.access),
            NodeData::Ref(r) => Some(&r.access),
            NodeData::GetRef(t) | NodeData::SetRef(t) | NodeData::CallRef(t) => Some(&t.access),
            _ => None,
        }
    }

    pub fn access_mut(&mut self) -> Option<&mut AccessAttrs> {
        match self {
            NodeData::Get(a) | NodeData::Set(a) => Some(&mut a.access),
            NodeData::Call(c) => Some(&mut c.access),
            NodeData::Builtin(b) => Some(&mut b.access),
            NodeData::Ref(r) => Some(&mut r.access),
            NodeData::GetRef(t) | NodeData::SetRef(t) | NodeData::CallRef(t) => {
                Some(&mut t.access)
            }
            _ => None,
        }
    }

    /// Code fields, for every kind in the `Code` family.
    pub fn code(&self) -> Option<&CodeAttrs> {
        match self {
            NodeData::Execution(c) | NodeData::Construction(c) | NodeData::Destruction(c) => {
                Some(c)
            }
            _ => self.access().map(|a| &a.code),
        }
    }

    /// Advice fields, for every kind in the `Advice` family.
    pub fn advice(&self) -> Option<&AdviceAttrs> {
        match self {
            NodeData::AdviceCode(a) => Some(&a.advice),
            NodeData::Introduction(i) => Some(&i.advice),
            NodeData::Order(o) => Some(&o.advice),
            _ => None,
        }
    }

    pub fn advice_mut(&mut self) -> Option<&mut AdviceAttrs> {
        match self {
            NodeData::AdviceCode(a) => Some(&mut a.advice),
            NodeData::Introduction(i) => Some(&mut i.advice),
            NodeData::Order(o) => Some(&mut o.advice),
            _ => None,
        }
    }

    /// Join-point fields, for every kind in the `Any` family.
    pub fn any(&self) -> Option<&AnyAttrs> {
        match self {
            NodeData::Type(t) => Some(&t.any),
            NodeData::Arg(a) => Some(&a.any),
            NodeData::AdviceCode(_) | NodeData::Introduction(_) | NodeData::Order(_) => {
                self.advice().map(|a| &a.any)
            }
            _ => {
                if let Some(n) = self.name() {
                    Some(&n.any)
                } else {
                    self.code().map(|c| &c.any)
                }
            }
        }
    }

    pub fn any_mut(&mut self) -> Option<&mut AnyAttrs> {
        match self {
            NodeData::Type(t) => Some(&mut t.any),
            NodeData::Arg(a) => Some(&mut a.any),
            NodeData::Namespace(n) => Some(&mut n.any),
            NodeData::Function(f) => Some(&mut f.name.any),
            NodeData::Variable(v) => Some(&mut v.name.any),
            NodeData::Class(c) => Some(&mut c.name.any),
            NodeData::ClassSlice(s) => Some(&mut s.name.any),
            NodeData::Pointcut(p) => Some(&mut p.name.any),
            NodeData::Attribute(a) => Some(&mut a.name.any),
            NodeData::Aspect(a) => Some(&mut a.class.name.any),
            NodeData::Execution(c) | NodeData::Construction(c) | NodeData::Destruction(c) => {
                Some(&mut c.any)
            }
            NodeData::Get(a) | NodeData::Set(a) => Some(&mut a.access.code.any),
            NodeData::Call(c) => Some(&mut c.access.code.any),
            NodeData::Builtin(b) => Some(&mut b.access.code.any),
            NodeData::Ref(r) => Some(&mut r.access.code.any),
            NodeData::GetRef(t) | NodeData::SetRef(t) | NodeData::CallRef(t) => {
                Some(&mut t.access.code.any)
            }
            NodeData::AdviceCode(a) => Some(&mut a.advice.any),
            NodeData::Introduction(i) => Some(&mut i.advice.any),
            NodeData::Order(o) => Some(&mut o.advice.any),
            _ => None,
        }
    }

    /// Join-point id, if this is a join point and one is assigned.
    pub fn jpid(&self) -> Option<u32> {
        self.any().and_then(|a| a.jpid)
    }

    // -----------------------------------------------------------------------
    // Leaf views
    // -----------------------------------------------------------------------

    pub fn as_tunit(&self) -> Option<&TUnit> {
        match self {
            NodeData::TUnit(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_header(&self) -> Option<&Header> {
        match self {
            NodeData::Header(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_source(&self) -> Option<&Source> {
        match self {
            NodeData::Source(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            NodeData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut Function> {
        match self {
            NodeData::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            NodeData::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            NodeData::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            NodeData::Call(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_pointcut(&self) -> Option<&Pointcut> {
        match self {
            NodeData::Pointcut(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_aspect(&self) -> Option<&Aspect> {
        match self {
            NodeData::Aspect(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_introduction(&self) -> Option<&Introduction> {
        match self {
            NodeData::Introduction(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_code_plan(&self) -> Option<&CodePlan> {
        match self {
            NodeData::CodePlan(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_speculation(&self) -> Option<&Speculation> {
        match self {
            NodeData::Speculation(s) => Some(s),
            _ => None,
        }
    }
}

/// Id a node received in the current save, tagged with the save's stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SaveStamp {
    pub stage: u32,
    pub id: u32,
}

/// One node in a model arena.
pub struct Node {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) dirty: bool,
    pub(crate) deleted: bool,
    pub(crate) merge_count: u32,
    pub(crate) key: OnceCell<String>,
    pub(crate) save_stamp: Option<SaveStamp>,
    pub(crate) transform_info: Option<Box<dyn Any>>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Node {
            data,
            parent: None,
            dirty: true,
            deleted: false,
            merge_count: 0,
            key: OnceCell::new(),
            save_stamp: None,
            transform_info: None,
        }
    }

    pub fn kind(&self) -> Kind {
        self.data.kind()
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Owning node, or `None` for top-level nodes owned by the model.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// True if the node changed since it was last loaded or saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True if a merge removed this node from the model.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Id assigned in save `stage`, if any.
    pub fn save_id(&self, stage: u32) -> Option<u32> {
        self.save_stamp
            .filter(|s| s.stage == stage)
            .map(|s| s.id)
    }

    /// Per-node annotation owned by the weaver. Never persisted or merged.
    pub fn transform_info(&self) -> Option<&dyn Any> {
        self.transform_info.as_deref()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("data", &self.data)
            .field("parent", &self.parent)
            .field("dirty", &self.dirty)
            .field("deleted", &self.deleted)
            .field("merge_count", &self.merge_count)
            .finish_non_exhaustive()
    }
}
