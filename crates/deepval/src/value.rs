use crate::{
    heap::{Heap, HeapData, HeapId},
    py_hash::{TupleHasher, hash_bigint, hash_bytes, hash_complex, hash_float, hash_identity, hash_int, hash_str},
    resource::ResourceTracker,
    types::{Type, TypeRef},
};

/// Runtime value handled by the engine.
///
/// Small immediates (None, Ellipsis, bool, machine ints, floats, builtin type
/// descriptors) are stored inline; everything else lives in the heap arena and
/// is referenced via `Ref(HeapId)`.
///
/// NOTE: `Clone` is intentionally NOT derived. Use `clone_with_heap()` for heap values
/// or `clone_immediate()` for immediate values only. Direct cloning would bypass
/// reference counting.
#[derive(Debug)]
pub enum Value {
    None,
    Ellipsis,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A builtin type used as a value, e.g. `int` in `{int: 1}`.
    Builtin(Type),
    Ref(HeapId),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Identity of a value, the engine's notion of "address".
///
/// Heap values are identified by their slot. Immediates have no slot, so two
/// immediates of the same type and payload bits are the same object, the way
/// small ints and singletons are shared in CPython. The derived order is the
/// identity order used by the comparison fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Identity {
    Immediate { ty: Type, bits: u64 },
    Heap(HeapId),
}

impl Identity {
    /// Bits suitable for identity hashing.
    fn hash_bits(self) -> u64 {
        match self {
            Self::Immediate { ty, bits } => bits ^ ((ty as u64) << 56),
            Self::Heap(id) => (id.index() as u64) << 4,
        }
    }
}

impl Value {
    /// Returns a new reference to the same value, incrementing the refcount of heap values.
    #[must_use]
    pub fn clone_with_heap(&self, heap: &Heap<impl ResourceTracker>) -> Self {
        match self {
            Self::Ref(id) => {
                heap.inc_ref(*id);
                Self::Ref(*id)
            }
            other => other.clone_immediate(),
        }
    }

    /// Copies an immediate value.
    ///
    /// # Panics
    /// Panics on `Ref`: heap references must go through `clone_with_heap`.
    #[must_use]
    pub fn clone_immediate(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Ellipsis => Self::Ellipsis,
            Self::Bool(b) => Self::Bool(*b),
            Self::Int(i) => Self::Int(*i),
            Self::Float(f) => Self::Float(*f),
            Self::Builtin(ty) => Self::Builtin(*ty),
            Self::Ref(_) => panic!("Ref clones must go through clone_with_heap to maintain refcounts"),
        }
    }

    /// Bitwise copy that does NOT touch reference counts.
    ///
    /// Used to snapshot a container's children before recursing into them
    /// with a mutable heap. The snapshot must be discarded with plain `drop`,
    /// never `drop_with_heap`, and must not outlive the container it was taken from.
    pub(crate) fn copy_for_extend(&self) -> Self {
        match self {
            Self::Ref(id) => Self::Ref(*id),
            other => other.clone_immediate(),
        }
    }

    /// Releases this value, decrementing its heap reference count if applicable.
    #[inline]
    pub fn drop_with_heap(self, heap: &mut Heap<impl ResourceTracker>) {
        if let Self::Ref(id) = self {
            heap.dec_ref(id);
        }
    }

    /// Returns the heap id if this value is a reference.
    #[must_use]
    pub fn ref_id(&self) -> Option<HeapId> {
        match self {
            Self::Ref(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn py_type(&self, heap: &Heap<impl ResourceTracker>) -> TypeRef {
        match self {
            Self::None => Type::NoneType.into(),
            Self::Ellipsis => Type::Ellipsis.into(),
            Self::Bool(_) => Type::Bool.into(),
            Self::Int(_) => Type::Int.into(),
            Self::Float(_) => Type::Float.into(),
            Self::Builtin(_) => Type::Type.into(),
            Self::Ref(id) => heap.get(*id).py_type(),
        }
    }

    /// The Python-visible name of this value's type.
    #[must_use]
    pub fn type_name<'h>(&self, heap: &'h Heap<impl ResourceTracker>) -> &'h str {
        self.py_type(heap).name(heap)
    }

    /// Whether this value is a type descriptor (builtin type or user class).
    #[must_use]
    pub fn is_type(&self, heap: &Heap<impl ResourceTracker>) -> bool {
        match self {
            Self::Builtin(_) => true,
            Self::Ref(id) => matches!(heap.get(*id), HeapData::Class(_)),
            _ => false,
        }
    }

    /// The value as a `TypeRef`, when it is a type descriptor.
    #[must_use]
    pub fn as_type_ref(&self, heap: &Heap<impl ResourceTracker>) -> Option<TypeRef> {
        match self {
            Self::Builtin(ty) => Some(TypeRef::Builtin(*ty)),
            Self::Ref(id) if matches!(heap.get(*id), HeapData::Class(_)) => Some(TypeRef::Class(*id)),
            _ => None,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        let (ty, bits) = match self {
            Self::Ref(id) => return Identity::Heap(*id),
            Self::None => (Type::NoneType, 0),
            Self::Ellipsis => (Type::Ellipsis, 0),
            Self::Bool(b) => (Type::Bool, u64::from(*b)),
            Self::Int(i) => (Type::Int, *i as u64),
            Self::Float(f) => (Type::Float, f.to_bits()),
            Self::Builtin(ty) => (Type::Type, *ty as u64),
        };
        Identity::Immediate { ty, bits }
    }

    /// Equivalent of Python's `is` operator.
    #[must_use]
    pub fn is_identical(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }

    /// Python `hash()`, or `None` when the value is unhashable.
    ///
    /// Values that compare equal hash equal, including across numeric types.
    #[must_use]
    pub fn py_hash(&self, heap: &Heap<impl ResourceTracker>) -> Option<u64> {
        let hash = match self {
            Self::Bool(b) => hash_int(i64::from(*b)),
            Self::Int(i) => hash_int(*i),
            Self::Float(f) => hash_float(*f),
            Self::None | Self::Ellipsis | Self::Builtin(_) => hash_identity(self.identity().hash_bits()),
            Self::Ref(id) => match heap.get(*id) {
                HeapData::Str(s) => hash_str(s.as_str()),
                HeapData::Bytes(b) => hash_bytes(b.as_slice()),
                HeapData::LongInt(li) => hash_bigint(li.as_bigint()),
                HeapData::Complex(c) => hash_complex(c.re, c.im),
                HeapData::Tuple(tuple) => {
                    let mut hasher = TupleHasher::new();
                    for item in tuple.as_slice() {
                        hasher.push(item.py_hash(heap)?);
                    }
                    hasher.finish()
                }
                HeapData::Range(range) => {
                    // hash((len, start, step)), with the parts that do not
                    // affect equality replaced by None
                    let none = hash_identity(Self::None.identity().hash_bits());
                    let len = range.len();
                    let mut hasher = TupleHasher::new();
                    hasher.push(hash_int(i64::try_from(len).unwrap_or(i64::MAX)));
                    hasher.push(if len == 0 { none } else { hash_int(range.start()) });
                    hasher.push(if len <= 1 { none } else { hash_int(range.step()) });
                    hasher.finish()
                }
                HeapData::Class(_) | HeapData::Instance(_) => hash_identity(self.identity().hash_bits()),
                HeapData::List(_) | HeapData::Dict(_) | HeapData::Set(_) | HeapData::Slice(_) => return None,
            },
        };
        Some(hash)
    }
}
