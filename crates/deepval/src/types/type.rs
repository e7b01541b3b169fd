use std::fmt;

use strum::{EnumString, IntoStaticStr};

use crate::{
    heap::{Heap, HeapData, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Represents a builtin Python type.
///
/// Declaration order doubles as the types' identity order: the ordering
/// fallback ranks two types "by address" using this order, which is stable for
/// the life of the process.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    IntoStaticStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum Type {
    Object,
    Type,
    #[strum(serialize = "NoneType")]
    NoneType,
    Ellipsis,
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    List,
    Tuple,
    Dict,
    Set,
    Range,
    Slice,
}

impl Type {
    /// The Python-visible name of the type (`int`, `NoneType`, ...).
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Whether values of this type take part in numeric comparisons.
    ///
    /// Numbers order before every non-number in the total-order fallback.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::Float | Self::Complex)
    }

    /// The direct base class, `None` only for `object`.
    #[must_use]
    pub fn base(self) -> Option<Self> {
        match self {
            Self::Object => None,
            Self::Bool => Some(Self::Int),
            _ => Some(Self::Object),
        }
    }

    /// Whether `self` is `other` or inherits from it.
    #[must_use]
    pub fn is_subtype_of(self, other: Self) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.base();
        }
        false
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// The runtime type of a value: a builtin type or a user class on the heap.
///
/// The derived `Ord` is the "type identity" order used by the comparison
/// fallback: builtins first in declaration order, then classes by heap slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeRef {
    Builtin(Type),
    Class(HeapId),
}

impl TypeRef {
    /// The Python-visible type name.
    #[must_use]
    pub fn name<'h>(self, heap: &'h Heap<impl ResourceTracker>) -> &'h str {
        match self {
            Self::Builtin(ty) => ty.name(),
            Self::Class(id) => match heap.get(id) {
                HeapData::Class(class) => class.name(),
                other => unreachable!("TypeRef::Class points at {}", other.variant_name()),
            },
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Builtin(ty) if ty.is_numeric())
    }

    /// Whether `self` is `other` or inherits from it.
    ///
    /// Classes inherit from their declared base chain and ultimately from `object`.
    #[must_use]
    pub fn is_subtype_of(self, other: Self, heap: &Heap<impl ResourceTracker>) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a.is_subtype_of(b),
            (Self::Builtin(_), Self::Class(_)) => false,
            (Self::Class(_), Self::Builtin(b)) => b == Type::Object,
            (Self::Class(a), Self::Class(b)) => {
                let mut current = Some(a);
                while let Some(id) = current {
                    if id == b {
                        return true;
                    }
                    current = match heap.get(id) {
                        HeapData::Class(class) => class.base(),
                        _ => None,
                    };
                }
                false
            }
        }
    }

    /// Returns this type as a type-descriptor value, taking a new reference for classes.
    #[must_use]
    pub fn to_value(self, heap: &Heap<impl ResourceTracker>) -> Value {
        match self {
            Self::Builtin(ty) => Value::Builtin(ty),
            Self::Class(id) => {
                heap.inc_ref(id);
                Value::Ref(id)
            }
        }
    }
}

impl From<Type> for TypeRef {
    fn from(ty: Type) -> Self {
        Self::Builtin(ty)
    }
}
