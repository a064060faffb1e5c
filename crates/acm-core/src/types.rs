//! Enumerated attribute values.
//!
//! These are stored as their integer discriminants both in keys and in the
//! persisted model, so the numbering here is part of the file format.

use serde::{Deserialize, Serialize};

/// Integer-backed attribute enum.
pub trait IntEnum: Copy + Sized {
    /// Attribute-level name used in error messages.
    const NAME: &'static str;

    fn to_int(self) -> i64;

    fn from_int(value: i64) -> Option<Self>;
}

macro_rules! int_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            $($variant = $value),+
        }

        impl IntEnum for $name {
            const NAME: &'static str = stringify!($name);

            fn to_int(self) -> i64 {
                self as i64
            }

            fn from_int(value: i64) -> Option<Self> {
                match value {
                    $(v if v == $value => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

int_enum! {
    /// Whether a source location is a definition or a declaration.
    SourceLocKind { None = 0, Def = 1, Decl = 2 }
}

int_enum! {
    /// Function classification.
    FunctionType {
        Unknown = 0,
        NonMember = 1,
        StaticNonMember = 2,
        Member = 3,
        StaticMember = 4,
        VirtualMember = 5,
        PureVirtualMember = 6,
        Constructor = 7,
        Destructor = 8,
        VirtualDestructor = 9,
        PureVirtualDestructor = 10,
    }
}

int_enum! {
    PointcutType { Normal = 0, Virtual = 1, PureVirtual = 2 }
}

int_enum! {
    /// Variable classification.
    VariableType {
        Unknown = 0,
        NonMember = 1,
        StaticNonMember = 2,
        Member = 3,
        StaticMember = 4,
    }
}

int_enum! {
    AdviceCodeType { Before = 0, After = 1, Around = 2 }
}

int_enum! {
    /// Which context an advice body needs (type, object, argument variables).
    AdviceCodeContext {
        None = 0,
        Type = 1,
        Obj = 2,
        TypeObj = 3,
        Vars = 4,
        TypeVars = 5,
        ObjVars = 6,
        TypeObjVars = 7,
    }
}

int_enum! {
    /// cv-qualification of a member function.
    CvQualifiers { None = 0, Const = 1, Volatile = 2, ConstVolatile = 3 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_zero() {
        assert_eq!(FunctionType::default().to_int(), 0);
        assert_eq!(SourceLocKind::default(), SourceLocKind::None);
        assert_eq!(CvQualifiers::default(), CvQualifiers::None);
    }

    #[test]
    fn discriminants() {
        assert_eq!(SourceLocKind::Decl.to_int(), 2);
        assert_eq!(FunctionType::PureVirtualDestructor.to_int(), 10);
        assert_eq!(AdviceCodeContext::TypeObjVars.to_int(), 7);
        assert_eq!(CvQualifiers::from_int(3), Some(CvQualifiers::ConstVolatile));
    }

    #[test]
    fn out_of_range_rejected() {
        assert_eq!(PointcutType::from_int(3), None);
        assert_eq!(VariableType::from_int(-1), None);
        assert_eq!(AdviceCodeType::from_int(99), None);
    }
}
