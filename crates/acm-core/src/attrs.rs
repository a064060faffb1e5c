//! Per-kind attribute records.
//!
//! Each concrete kind stores its own fields plus those of its abstract
//! ancestors, composed by value: a [`Function`] holds a [`NameAttrs`],
//! which holds an [`AnyAttrs`]. The [`Fields`] trait exposes every record
//! generically as named scalars and named slots, ancestor fields first.
//! Key computation, merging, cleanup, persistence and dumping are all
//! written against that trait instead of per kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::error::CoreError;
use crate::id::NodeId;
use crate::types::{
    AdviceCodeContext, AdviceCodeType, CvQualifiers, FunctionType, IntEnum, PointcutType,
    SourceLocKind, VariableType,
};

// ---------------------------------------------------------------------------
// Generic field access
// ---------------------------------------------------------------------------

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Scalar {
    /// Parses persisted text as a value of type `ty`. Booleans are true
    /// only for the literal `true`.
    pub fn parse(name: &str, ty: ScalarType, text: &str) -> Result<Scalar, CoreError> {
        match ty {
            ScalarType::Str => Ok(Scalar::Str(text.to_string())),
            ScalarType::Bool => Ok(Scalar::Bool(text == "true")),
            ScalarType::Int => text
                .trim()
                .parse::<i64>()
                .map(Scalar::Int)
                .map_err(|e| CoreError::InvalidAttribute {
                    name: name.to_string(),
                    reason: format!("'{text}' is not an integer: {e}"),
                }),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Value type of a scalar attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Int,
    Bool,
}

/// One scalar attribute of a node. `value` is `None` only for optional
/// attributes that are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub name: &'static str,
    pub ty: ScalarType,
    pub value: Option<Scalar>,
}

/// Read view of a child or reference slot.
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    /// Optional owned child.
    Owned(Option<NodeId>),
    /// Owned children.
    OwnedMany(&'a Container),
    /// Optional reference.
    Link(Option<NodeId>),
    /// Reference list.
    Links(&'a Container),
}

/// Write view of a child or reference slot.
#[derive(Debug)]
pub enum SlotMut<'a> {
    Owned(&'a mut Option<NodeId>),
    OwnedMany(&'a mut Container),
    Link(&'a mut Option<NodeId>),
    Links(&'a mut Container),
}

impl Slot<'_> {
    /// Targets of this slot in order.
    pub fn ids(&self) -> Vec<NodeId> {
        match self {
            Slot::Owned(id) | Slot::Link(id) => id.iter().copied().collect(),
            Slot::OwnedMany(c) | Slot::Links(c) => c.as_slice().to_vec(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Slot::Owned(_) | Slot::OwnedMany(_))
    }
}

/// Generic, ancestor-first access to a record's attributes.
pub trait Fields {
    /// Appends the scalar attributes.
    fn scalars(&self, _out: &mut Vec<ScalarField>) {}

    /// Sets a scalar attribute. Returns `Ok(false)` if the record has no
    /// attribute of that name.
    fn set_scalar(&mut self, _name: &str, _value: Option<Scalar>) -> Result<bool, CoreError> {
        Ok(false)
    }

    /// Appends the child and reference slots.
    fn slots<'a>(&'a self, _out: &mut Vec<(&'static str, Slot<'a>)>) {}

    /// Appends mutable views of the child and reference slots, in the same
    /// order as [`Fields::slots`].
    fn slots_mut<'a>(&'a mut self, _out: &mut Vec<(&'static str, SlotMut<'a>)>) {}
}

fn str_field(name: &'static str, value: &str) -> ScalarField {
    ScalarField {
        name,
        ty: ScalarType::Str,
        value: Some(Scalar::Str(value.to_string())),
    }
}

fn int_field(name: &'static str, value: i64) -> ScalarField {
    ScalarField {
        name,
        ty: ScalarType::Int,
        value: Some(Scalar::Int(value)),
    }
}

fn opt_int_field(name: &'static str, value: Option<i64>) -> ScalarField {
    ScalarField {
        name,
        ty: ScalarType::Int,
        value: value.map(Scalar::Int),
    }
}

fn bool_field(name: &'static str, value: bool) -> ScalarField {
    ScalarField {
        name,
        ty: ScalarType::Bool,
        value: Some(Scalar::Bool(value)),
    }
}

fn enum_field<E: IntEnum>(name: &'static str, value: E) -> ScalarField {
    int_field(name, value.to_int())
}

fn invalid(name: &str, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidAttribute {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn take_str(name: &str, value: Option<Scalar>) -> Result<String, CoreError> {
    match value {
        Some(Scalar::Str(s)) => Ok(s),
        other => Err(invalid(name, format!("expected a string, got {other:?}"))),
    }
}

fn take_bool(name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
    match value {
        Some(Scalar::Bool(b)) => Ok(b),
        None => Ok(false),
        other => Err(invalid(name, format!("expected a boolean, got {other:?}"))),
    }
}

fn take_opt_int<T: TryFrom<i64>>(name: &str, value: Option<Scalar>) -> Result<Option<T>, CoreError> {
    match value {
        None => Ok(None),
        Some(Scalar::Int(n)) => T::try_from(n)
            .map(Some)
            .map_err(|_| invalid(name, format!("{n} is out of range"))),
        other => Err(invalid(name, format!("expected an integer, got {other:?}"))),
    }
}

fn take_int<T: TryFrom<i64>>(name: &str, value: Option<Scalar>) -> Result<T, CoreError> {
    take_opt_int(name, value)?.ok_or_else(|| invalid(name, "value is required"))
}

fn take_enum<E: IntEnum>(name: &str, value: Option<Scalar>) -> Result<E, CoreError> {
    let n: i64 = take_int(name, value)?;
    E::from_int(n).ok_or_else(|| invalid(name, format!("{n} is not a valid {}", E::NAME)))
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Fields shared by translation units and headers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileAttrs {
    pub filename: String,
    pub len: i32,
    /// Modification time; a differing value marks the file as changed.
    pub time: i32,
}

impl Fields for FileAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        out.push(str_field("filename", &self.filename));
        out.push(int_field("len", self.len.into()));
        out.push(int_field("time", self.time.into()));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "filename" => self.filename = take_str(name, value)?,
            "len" => self.len = take_int(name, value)?,
            "time" => self.time = take_int(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TUnit {
    pub file: FileAttrs,
    pub dirty_flag: bool,
}

impl Fields for TUnit {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.file.scalars(out);
        out.push(bool_field("dirty_flag", self.dirty_flag));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "dirty_flag" => self.dirty_flag = take_bool(name, value)?,
            _ => return self.file.set_scalar(name, value),
        }
        Ok(true)
    }
}

/// A header file, with the translation units that include it.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub file: FileAttrs,
    pub in_units: Container,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            file: FileAttrs::default(),
            in_units: Container::refs(),
        }
    }
}

impl Fields for Header {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.file.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.file.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("in", Slot::Links(&self.in_units)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("in", SlotMut::Links(&mut self.in_units)));
    }
}

// ---------------------------------------------------------------------------
// Source locations and weaving plans
// ---------------------------------------------------------------------------

/// One source location of an element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub kind: SourceLocKind,
    pub file: Option<NodeId>,
    pub line: i32,
    pub len: i32,
}

impl Fields for Source {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        out.push(enum_field("kind", self.kind));
        out.push(int_field("line", self.line.into()));
        out.push(int_field("len", self.len.into()));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "kind" => self.kind = take_enum(name, value)?,
            "line" => self.line = take_int(name, value)?,
            "len" => self.len = take_int(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("file", Slot::Link(self.file)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("file", SlotMut::Link(&mut self.file)));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberIntro {
    pub intro: Option<NodeId>,
    pub members: Container,
}

impl Default for MemberIntro {
    fn default() -> Self {
        MemberIntro {
            intro: None,
            members: Container::refs(),
        }
    }
}

impl Fields for MemberIntro {
    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("intro", Slot::Link(self.intro)));
        out.push(("members", Slot::Links(&self.members)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("intro", SlotMut::Link(&mut self.intro)));
        out.push(("members", SlotMut::Links(&mut self.members)));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseIntro {
    pub intro: Option<NodeId>,
    pub bases: Container,
}

impl Default for BaseIntro {
    fn default() -> Self {
        BaseIntro {
            intro: None,
            bases: Container::refs(),
        }
    }
}

impl Fields for BaseIntro {
    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("intro", Slot::Link(self.intro)));
        out.push(("bases", Slot::Links(&self.bases)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("intro", SlotMut::Link(&mut self.intro)));
        out.push(("bases", SlotMut::Links(&mut self.bases)));
    }
}

/// Introductions woven into a class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPlan {
    pub base_intros: Container,
    pub member_intros: Container,
}

impl Default for ClassPlan {
    fn default() -> Self {
        ClassPlan {
            base_intros: Container::owning(),
            member_intros: Container::owning(),
        }
    }
}

impl Fields for ClassPlan {
    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("base_intros", Slot::OwnedMany(&self.base_intros)));
        out.push(("member_intros", Slot::OwnedMany(&self.member_intros)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("base_intros", SlotMut::OwnedMany(&mut self.base_intros)));
        out.push(("member_intros", SlotMut::OwnedMany(&mut self.member_intros)));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeAdvice {
    pub advice: Option<NodeId>,
    pub conditional: bool,
}

impl Fields for CodeAdvice {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        out.push(bool_field("conditional", self.conditional));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "conditional" => self.conditional = take_bool(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("advice", Slot::Link(self.advice)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("advice", SlotMut::Link(&mut self.advice)));
    }
}

/// Advice woven into a code join point: before, around, after, and the
/// plan for the next nesting level of around advice.
#[derive(Debug, Clone, PartialEq)]
pub struct CodePlan {
    pub before: Container,
    pub around: Option<NodeId>,
    pub after: Container,
    pub next_level: Option<NodeId>,
}

impl Default for CodePlan {
    fn default() -> Self {
        CodePlan {
            before: Container::owning(),
            around: None,
            after: Container::owning(),
            next_level: None,
        }
    }
}

impl Fields for CodePlan {
    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("before", Slot::OwnedMany(&self.before)));
        out.push(("around", Slot::Owned(self.around)));
        out.push(("after", Slot::OwnedMany(&self.after)));
        out.push(("next_level", Slot::Owned(self.next_level)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("before", SlotMut::OwnedMany(&mut self.before)));
        out.push(("around", SlotMut::Owned(&mut self.around)));
        out.push(("after", SlotMut::OwnedMany(&mut self.after)));
        out.push(("next_level", SlotMut::Owned(&mut self.next_level)));
    }
}

// ---------------------------------------------------------------------------
// Join points
// ---------------------------------------------------------------------------

/// Fields shared by every join-point kind.
#[derive(Debug, Clone, PartialEq)]
pub struct AnyAttrs {
    pub jpid: Option<u32>,
    pub source: Container,
    pub attributes: Container,
}

impl Default for AnyAttrs {
    fn default() -> Self {
        AnyAttrs {
            jpid: None,
            source: Container::owning(),
            attributes: Container::refs(),
        }
    }
}

impl Fields for AnyAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        out.push(opt_int_field("jpid", self.jpid.map(i64::from)));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "jpid" => self.jpid = take_opt_int(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("source", Slot::OwnedMany(&self.source)));
        out.push(("attributes", Slot::Links(&self.attributes)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("source", SlotMut::OwnedMany(&mut self.source)));
        out.push(("attributes", SlotMut::Links(&mut self.attributes)));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Type {
    pub any: AnyAttrs,
    pub signature: String,
}

impl Fields for Type {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.any.scalars(out);
        out.push(str_field("signature", &self.signature));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "signature" => self.signature = take_str(name, value)?,
            _ => return self.any.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.any.slots(out);
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.any.slots_mut(out);
    }
}

/// A named, typed argument (pointcut and attribute parameters).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Arg {
    pub any: AnyAttrs,
    pub ty: String,
    pub name: String,
}

impl Fields for Arg {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.any.scalars(out);
        out.push(str_field("type", &self.ty));
        out.push(str_field("name", &self.name));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "type" => self.ty = take_str(name, value)?,
            "name" => self.name = take_str(name, value)?,
            _ => return self.any.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.any.slots(out);
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.any.slots_mut(out);
    }
}

// ---------------------------------------------------------------------------
// Named entities
// ---------------------------------------------------------------------------

/// Fields shared by named program entities. A plain namespace is just this.
#[derive(Debug, Clone, PartialEq)]
pub struct NameAttrs {
    pub any: AnyAttrs,
    pub children: Container,
    pub name: String,
    pub builtin: bool,
    /// Translation units in which the entity was seen.
    pub tunits: Container,
}

impl Default for NameAttrs {
    fn default() -> Self {
        NameAttrs {
            any: AnyAttrs::default(),
            children: Container::owning(),
            name: String::new(),
            builtin: false,
            tunits: Container::refs(),
        }
    }
}

impl Fields for NameAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.any.scalars(out);
        out.push(str_field("name", &self.name));
        out.push(bool_field("builtin", self.builtin));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "name" => self.name = take_str(name, value)?,
            "builtin" => self.builtin = take_bool(name, value)?,
            _ => return self.any.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.any.slots(out);
        out.push(("children", Slot::OwnedMany(&self.children)));
        out.push(("tunits", Slot::Links(&self.tunits)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.any.slots_mut(out);
        out.push(("children", SlotMut::OwnedMany(&mut self.children)));
        out.push(("tunits", SlotMut::Links(&mut self.tunits)));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: NameAttrs,
    pub result_type: Option<NodeId>,
    pub arg_types: Container,
    pub kind: FunctionType,
    pub variadic_args: bool,
    pub cv_qualifiers: CvQualifiers,
    /// Translation unit of a static non-member function.
    pub static_in: Option<NodeId>,
    pub calls: Container,
}

impl Default for Function {
    fn default() -> Self {
        Function {
            name: NameAttrs::default(),
            result_type: None,
            arg_types: Container::owning(),
            kind: FunctionType::default(),
            variadic_args: false,
            cv_qualifiers: CvQualifiers::default(),
            static_in: None,
            calls: Container::refs(),
        }
    }
}

impl Fields for Function {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.name.scalars(out);
        out.push(enum_field("kind", self.kind));
        out.push(bool_field("variadic_args", self.variadic_args));
        out.push(enum_field("cv_qualifiers", self.cv_qualifiers));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "kind" => self.kind = take_enum(name, value)?,
            "variadic_args" => self.variadic_args = take_bool(name, value)?,
            "cv_qualifiers" => self.cv_qualifiers = take_enum(name, value)?,
            _ => return self.name.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.name.slots(out);
        out.push(("result_type", Slot::Owned(self.result_type)));
        out.push(("arg_types", Slot::OwnedMany(&self.arg_types)));
        out.push(("static_in", Slot::Link(self.static_in)));
        out.push(("calls", Slot::Links(&self.calls)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.name.slots_mut(out);
        out.push(("result_type", SlotMut::Owned(&mut self.result_type)));
        out.push(("arg_types", SlotMut::OwnedMany(&mut self.arg_types)));
        out.push(("static_in", SlotMut::Link(&mut self.static_in)));
        out.push(("calls", SlotMut::Links(&mut self.calls)));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variable {
    pub name: NameAttrs,
    pub ty: Option<NodeId>,
    pub kind: VariableType,
}

impl Fields for Variable {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.name.scalars(out);
        out.push(enum_field("kind", self.kind));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "kind" => self.kind = take_enum(name, value)?,
            _ => return self.name.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.name.slots(out);
        out.push(("type", Slot::Owned(self.ty)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.name.slots_mut(out);
        out.push(("type", SlotMut::Owned(&mut self.ty)));
    }
}

/// Class fields. Aspects extend these.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAttrs {
    pub name: NameAttrs,
    pub bases: Container,
    pub derived: Container,
    pub intro_target: bool,
    pub plan: Option<NodeId>,
}

impl Default for ClassAttrs {
    fn default() -> Self {
        ClassAttrs {
            name: NameAttrs::default(),
            bases: Container::refs(),
            derived: Container::refs(),
            intro_target: false,
            plan: None,
        }
    }
}

impl Fields for ClassAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.name.scalars(out);
        out.push(bool_field("intro_target", self.intro_target));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "intro_target" => self.intro_target = take_bool(name, value)?,
            _ => return self.name.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.name.slots(out);
        out.push(("bases", Slot::Links(&self.bases)));
        out.push(("derived", Slot::Links(&self.derived)));
        out.push(("plan", Slot::Owned(self.plan)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.name.slots_mut(out);
        out.push(("bases", SlotMut::Links(&mut self.bases)));
        out.push(("derived", SlotMut::Links(&mut self.derived)));
        out.push(("plan", SlotMut::Owned(&mut self.plan)));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassSlice {
    pub name: NameAttrs,
    pub is_struct: bool,
}

impl Fields for ClassSlice {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.name.scalars(out);
        out.push(bool_field("is_struct", self.is_struct));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "is_struct" => self.is_struct = take_bool(name, value)?,
            _ => return self.name.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.name.slots(out);
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.name.slots_mut(out);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pointcut {
    pub name: NameAttrs,
    pub expr: String,
    pub args: Container,
    pub kind: PointcutType,
}

impl Default for Pointcut {
    fn default() -> Self {
        Pointcut {
            name: NameAttrs::default(),
            expr: String::new(),
            args: Container::owning(),
            kind: PointcutType::default(),
        }
    }
}

impl Fields for Pointcut {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.name.scalars(out);
        out.push(str_field("expr", &self.expr));
        out.push(enum_field("kind", self.kind));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "expr" => self.expr = take_str(name, value)?,
            "kind" => self.kind = take_enum(name, value)?,
            _ => return self.name.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.name.slots(out);
        out.push(("args", Slot::OwnedMany(&self.args)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.name.slots_mut(out);
        out.push(("args", SlotMut::OwnedMany(&mut self.args)));
    }
}

/// A user-defined attribute declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: NameAttrs,
    pub args: Container,
}

impl Default for Attribute {
    fn default() -> Self {
        Attribute {
            name: NameAttrs::default(),
            args: Container::owning(),
        }
    }
}

impl Fields for Attribute {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.name.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.name.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.name.slots(out);
        out.push(("args", Slot::OwnedMany(&self.args)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.name.slots_mut(out);
        out.push(("args", SlotMut::OwnedMany(&mut self.args)));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aspect {
    pub class: ClassAttrs,
    pub intros: Container,
    pub advices: Container,
    pub orders: Container,
}

impl Default for Aspect {
    fn default() -> Self {
        Aspect {
            class: ClassAttrs::default(),
            intros: Container::owning(),
            advices: Container::owning(),
            orders: Container::owning(),
        }
    }
}

impl Fields for Aspect {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.class.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.class.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.class.slots(out);
        out.push(("intros", Slot::OwnedMany(&self.intros)));
        out.push(("advices", Slot::OwnedMany(&self.advices)));
        out.push(("orders", Slot::OwnedMany(&self.orders)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.class.slots_mut(out);
        out.push(("intros", SlotMut::OwnedMany(&mut self.intros)));
        out.push(("advices", SlotMut::OwnedMany(&mut self.advices)));
        out.push(("orders", SlotMut::OwnedMany(&mut self.orders)));
    }
}

// ---------------------------------------------------------------------------
// Code join points
// ---------------------------------------------------------------------------

/// Fields shared by code join points. Execution, construction and
/// destruction join points are just this.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodeAttrs {
    pub any: AnyAttrs,
    pub plan: Option<NodeId>,
}

impl Fields for CodeAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.any.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.any.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.any.slots(out);
        out.push(("plan", Slot::Owned(self.plan)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.any.slots_mut(out);
        out.push(("plan", SlotMut::Owned(&mut self.plan)));
    }
}

/// Fields shared by access join points.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccessAttrs {
    pub code: CodeAttrs,
    /// Local id, unique within the enclosing function.
    pub lid: i32,
    pub target_object_lid: Option<i32>,
    pub cfg_block_lid: Option<i32>,
    pub target_class: Option<NodeId>,
}

impl Fields for AccessAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.code.scalars(out);
        out.push(int_field("lid", self.lid.into()));
        out.push(opt_int_field(
            "target_object_lid",
            self.target_object_lid.map(i64::from),
        ));
        out.push(opt_int_field("cfg_block_lid", self.cfg_block_lid.map(i64::from)));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "lid" => self.lid = take_int(name, value)?,
            "target_object_lid" => self.target_object_lid = take_opt_int(name, value)?,
            "cfg_block_lid" => self.cfg_block_lid = take_opt_int(name, value)?,
            _ => return self.code.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.code.slots(out);
        out.push(("target_class", Slot::Link(self.target_class)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.code.slots_mut(out);
        out.push(("target_class", SlotMut::Link(&mut self.target_class)));
    }
}

/// A variable read or write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableAccess {
    pub access: AccessAttrs,
    pub variable: Option<NodeId>,
}

impl Fields for VariableAccess {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.access.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.access.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.access.slots(out);
        out.push(("variable", Slot::Link(self.variable)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.access.slots_mut(out);
        out.push(("variable", SlotMut::Link(&mut self.variable)));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub access: AccessAttrs,
    pub target: Option<NodeId>,
    pub variadic_arg_types: Container,
    pub default_args: Option<i32>,
}

impl Default for Call {
    fn default() -> Self {
        Call {
            access: AccessAttrs::default(),
            target: None,
            variadic_arg_types: Container::owning(),
            default_args: None,
        }
    }
}

impl Fields for Call {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.access.scalars(out);
        out.push(opt_int_field("default_args", self.default_args.map(i64::from)));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "default_args" => self.default_args = take_opt_int(name, value)?,
            _ => return self.access.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.access.slots(out);
        out.push(("target", Slot::Link(self.target)));
        out.push(("variadic_arg_types", Slot::OwnedMany(&self.variadic_arg_types)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.access.slots_mut(out);
        out.push(("target", SlotMut::Link(&mut self.target)));
        out.push((
            "variadic_arg_types",
            SlotMut::OwnedMany(&mut self.variadic_arg_types),
        ));
    }
}

/// A use of a built-in operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Builtin {
    pub access: AccessAttrs,
    pub target: Option<NodeId>,
    pub implicit_access: Container,
}

impl Default for Builtin {
    fn default() -> Self {
        Builtin {
            access: AccessAttrs::default(),
            target: None,
            implicit_access: Container::owning(),
        }
    }
}

impl Fields for Builtin {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.access.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.access.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.access.slots(out);
        out.push(("target", Slot::Link(self.target)));
        out.push(("implicit_access", Slot::OwnedMany(&self.implicit_access)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.access.slots_mut(out);
        out.push(("target", SlotMut::Link(&mut self.target)));
        out.push(("implicit_access", SlotMut::OwnedMany(&mut self.implicit_access)));
    }
}

/// Taking a reference to a variable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ref {
    pub access: AccessAttrs,
    pub variable: Option<NodeId>,
    pub ty: Option<NodeId>,
}

impl Fields for Ref {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.access.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.access.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.access.slots(out);
        out.push(("variable", Slot::Link(self.variable)));
        out.push(("type", Slot::Owned(self.ty)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.access.slots_mut(out);
        out.push(("variable", SlotMut::Link(&mut self.variable)));
        out.push(("type", SlotMut::Owned(&mut self.ty)));
    }
}

/// Access through a reference or pointer: `GetRef`, `SetRef`, `CallRef`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedAccess {
    pub access: AccessAttrs,
    pub ty: Option<NodeId>,
}

impl Fields for TypedAccess {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.access.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.access.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.access.slots(out);
        out.push(("type", Slot::Owned(self.ty)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.access.slots_mut(out);
        out.push(("type", SlotMut::Owned(&mut self.ty)));
    }
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

/// Fields shared by advice kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdviceAttrs {
    pub any: AnyAttrs,
    pub pointcut: Option<NodeId>,
    /// Local id within the aspect.
    pub lid: i32,
}

impl Fields for AdviceAttrs {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.any.scalars(out);
        out.push(int_field("lid", self.lid.into()));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "lid" => self.lid = take_int(name, value)?,
            _ => return self.any.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.any.slots(out);
        out.push(("pointcut", Slot::Owned(self.pointcut)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.any.slots_mut(out);
        out.push(("pointcut", SlotMut::Owned(&mut self.pointcut)));
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AdviceCode {
    pub advice: AdviceAttrs,
    pub kind: AdviceCodeType,
    pub context: AdviceCodeContext,
}

impl Fields for AdviceCode {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.advice.scalars(out);
        out.push(enum_field("kind", self.kind));
        out.push(enum_field("context", self.context));
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        match name {
            "kind" => self.kind = take_enum(name, value)?,
            "context" => self.context = take_enum(name, value)?,
            _ => return self.advice.set_scalar(name, value),
        }
        Ok(true)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.advice.slots(out);
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.advice.slots_mut(out);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Introduction {
    pub advice: AdviceAttrs,
    pub named_slice: Option<NodeId>,
    pub anon_slice: Option<NodeId>,
}

impl Fields for Introduction {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.advice.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.advice.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.advice.slots(out);
        out.push(("named_slice", Slot::Link(self.named_slice)));
        out.push(("anon_slice", Slot::Owned(self.anon_slice)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.advice.slots_mut(out);
        out.push(("named_slice", SlotMut::Link(&mut self.named_slice)));
        out.push(("anon_slice", SlotMut::Owned(&mut self.anon_slice)));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub advice: AdviceAttrs,
    pub aspect_exprs: Container,
}

impl Default for Order {
    fn default() -> Self {
        Order {
            advice: AdviceAttrs::default(),
            aspect_exprs: Container::owning(),
        }
    }
}

impl Fields for Order {
    fn scalars(&self, out: &mut Vec<ScalarField>) {
        self.advice.scalars(out);
    }

    fn set_scalar(&mut self, name: &str, value: Option<Scalar>) -> Result<bool, CoreError> {
        self.advice.set_scalar(name, value)
    }

    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        self.advice.slots(out);
        out.push(("aspect_exprs", Slot::OwnedMany(&self.aspect_exprs)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        self.advice.slots_mut(out);
        out.push(("aspect_exprs", SlotMut::OwnedMany(&mut self.aspect_exprs)));
    }
}

/// Join points an advice may match in a translation unit, recorded ahead
/// of weaving.
#[derive(Debug, Clone, PartialEq)]
pub struct Speculation {
    pub advice: Option<NodeId>,
    pub tunit: Option<NodeId>,
    pub true_jps: Container,
    pub false_jps: Container,
    pub conditional_jps: Container,
}

impl Default for Speculation {
    fn default() -> Self {
        Speculation {
            advice: None,
            tunit: None,
            true_jps: Container::refs(),
            false_jps: Container::refs(),
            conditional_jps: Container::refs(),
        }
    }
}

impl Fields for Speculation {
    fn slots<'a>(&'a self, out: &mut Vec<(&'static str, Slot<'a>)>) {
        out.push(("advice", Slot::Link(self.advice)));
        out.push(("tunit", Slot::Link(self.tunit)));
        out.push(("true_jps", Slot::Links(&self.true_jps)));
        out.push(("false_jps", Slot::Links(&self.false_jps)));
        out.push(("conditional_jps", Slot::Links(&self.conditional_jps)));
    }

    fn slots_mut<'a>(&'a mut self, out: &mut Vec<(&'static str, SlotMut<'a>)>) {
        out.push(("advice", SlotMut::Link(&mut self.advice)));
        out.push(("tunit", SlotMut::Link(&mut self.tunit)));
        out.push(("true_jps", SlotMut::Links(&mut self.true_jps)));
        out.push(("false_jps", SlotMut::Links(&mut self.false_jps)));
        out.push(("conditional_jps", SlotMut::Links(&mut self.conditional_jps)));
    }
}
