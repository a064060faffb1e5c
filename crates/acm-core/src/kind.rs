//! Node kinds and kind masks.
//!
//! Every concrete node has exactly one [`Kind`]. Each kind owns one bit of
//! a [`JoinPointType`] mask, and the abstract families (`File`, `Any`,
//! `Name`, `Code`, `Access`, `Advice`) are unions of those bits. Masks are
//! what [`crate::ProjectModel::select`] filters on.

use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Concrete node kind. The discriminant is the kind's bit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Kind {
    TUnit,
    Header,
    Source,
    MemberIntro,
    BaseIntro,
    ClassPlan,
    CodeAdvice,
    CodePlan,
    Type,
    Arg,
    Namespace,
    Function,
    Variable,
    Class,
    ClassSlice,
    Get,
    Set,
    Call,
    Builtin,
    Ref,
    GetRef,
    SetRef,
    CallRef,
    Execution,
    Construction,
    Destruction,
    Pointcut,
    Attribute,
    AdviceCode,
    Introduction,
    Order,
    Aspect,
    Speculation,
    Model,
}

impl Kind {
    /// All kinds in bit order.
    pub const ALL: [Kind; 34] = [
        Kind::TUnit,
        Kind::Header,
        Kind::Source,
        Kind::MemberIntro,
        Kind::BaseIntro,
        Kind::ClassPlan,
        Kind::CodeAdvice,
        Kind::CodePlan,
        Kind::Type,
        Kind::Arg,
        Kind::Namespace,
        Kind::Function,
        Kind::Variable,
        Kind::Class,
        Kind::ClassSlice,
        Kind::Get,
        Kind::Set,
        Kind::Call,
        Kind::Builtin,
        Kind::Ref,
        Kind::GetRef,
        Kind::SetRef,
        Kind::CallRef,
        Kind::Execution,
        Kind::Construction,
        Kind::Destruction,
        Kind::Pointcut,
        Kind::Attribute,
        Kind::AdviceCode,
        Kind::Introduction,
        Kind::Order,
        Kind::Aspect,
        Kind::Speculation,
        Kind::Model,
    ];

    /// Bit index of this kind.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-bit mask for this kind.
    pub fn mask(self) -> JoinPointType {
        JoinPointType(1u64 << self.index())
    }

    /// The kind's type name, used in keys and as the XML element name.
    pub fn type_str(self) -> &'static str {
        match self {
            Kind::TUnit => "TUnit",
            Kind::Header => "Header",
            Kind::Source => "Source",
            Kind::MemberIntro => "MemberIntro",
            Kind::BaseIntro => "BaseIntro",
            Kind::ClassPlan => "ClassPlan",
            Kind::CodeAdvice => "CodeAdvice",
            Kind::CodePlan => "CodePlan",
            Kind::Type => "Type",
            Kind::Arg => "Arg",
            Kind::Namespace => "Namespace",
            Kind::Function => "Function",
            Kind::Variable => "Variable",
            Kind::Class => "Class",
            Kind::ClassSlice => "ClassSlice",
            Kind::Get => "Get",
            Kind::Set => "Set",
            Kind::Call => "Call",
            Kind::Builtin => "Builtin",
            Kind::Ref => "Ref",
            Kind::GetRef => "GetRef",
            Kind::SetRef => "SetRef",
            Kind::CallRef => "CallRef",
            Kind::Execution => "Execution",
            Kind::Construction => "Construction",
            Kind::Destruction => "Destruction",
            Kind::Pointcut => "Pointcut",
            Kind::Attribute => "Attribute",
            Kind::AdviceCode => "AdviceCode",
            Kind::Introduction => "Introduction",
            Kind::Order => "Order",
            Kind::Aspect => "Aspect",
            Kind::Speculation => "Speculation",
            Kind::Model => "Model",
        }
    }

    /// Reverse of [`Kind::type_str`].
    pub fn from_type_str(name: &str) -> Option<Kind> {
        Kind::ALL.iter().copied().find(|k| k.type_str() == name)
    }

    /// True if this kind belongs to the given mask.
    pub fn is(self, mask: JoinPointType) -> bool {
        mask.contains(self)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_str())
    }
}

impl FromStr for Kind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::from_type_str(s).ok_or_else(|| CoreError::UnknownKind {
            name: s.to_string(),
        })
    }
}

/// Bit mask over [`Kind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct JoinPointType(pub u64);

const fn bits(from: Kind, to: Kind) -> u64 {
    let mut mask = 0u64;
    let mut i = from as u32;
    while i <= to as u32 {
        mask |= 1u64 << i;
        i += 1;
    }
    mask
}

const fn bit(kind: Kind) -> u64 {
    1u64 << (kind as u32)
}

impl JoinPointType {
    pub const NONE: JoinPointType = JoinPointType(0);
    /// Every concrete kind, including the model.
    pub const NODE: JoinPointType = JoinPointType(bits(Kind::TUnit, Kind::Model));
    pub const FILE: JoinPointType = JoinPointType(bit(Kind::TUnit) | bit(Kind::Header));
    pub const ANY: JoinPointType = JoinPointType(bits(Kind::Type, Kind::Aspect));
    pub const NAME: JoinPointType = JoinPointType(
        bits(Kind::Namespace, Kind::ClassSlice)
            | bit(Kind::Pointcut)
            | bit(Kind::Attribute)
            | bit(Kind::Aspect),
    );
    pub const CODE: JoinPointType = JoinPointType(bits(Kind::Get, Kind::Destruction));
    pub const ACCESS: JoinPointType = JoinPointType(bits(Kind::Get, Kind::CallRef));
    pub const ADVICE: JoinPointType = JoinPointType(bits(Kind::AdviceCode, Kind::Order));

    /// True if `kind`'s bit is set.
    pub fn contains(self, kind: Kind) -> bool {
        self.0 & kind.mask().0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The concrete kinds in this mask, in bit order.
    pub fn kinds(self) -> impl Iterator<Item = Kind> {
        Kind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    /// Resolves a concrete kind name or a family name (`Any`, `Name`, ...).
    pub fn from_name(name: &str) -> Option<JoinPointType> {
        match name {
            "Node" => Some(JoinPointType::NODE),
            "File" => Some(JoinPointType::FILE),
            "Any" => Some(JoinPointType::ANY),
            "Name" => Some(JoinPointType::NAME),
            "Code" => Some(JoinPointType::CODE),
            "Access" => Some(JoinPointType::ACCESS),
            "Advice" => Some(JoinPointType::ADVICE),
            _ => Kind::from_type_str(name).map(Kind::mask),
        }
    }
}

impl From<Kind> for JoinPointType {
    fn from(kind: Kind) -> Self {
        kind.mask()
    }
}

impl BitOr for JoinPointType {
    type Output = JoinPointType;

    fn bitor(self, rhs: JoinPointType) -> JoinPointType {
        JoinPointType(self.0 | rhs.0)
    }
}

impl BitOr<Kind> for JoinPointType {
    type Output = JoinPointType;

    fn bitor(self, rhs: Kind) -> JoinPointType {
        self | rhs.mask()
    }
}

impl BitOr for Kind {
    type Output = JoinPointType;

    fn bitor(self, rhs: Kind) -> JoinPointType {
        self.mask() | rhs.mask()
    }
}
