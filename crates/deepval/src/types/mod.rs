//! Heap payload types for the closed set of Python value variants.
//!
//! Each type owns the references it stores (`Value::Ref` children) and
//! releases them through [`DropWithHeap`](crate::heap::DropWithHeap).
pub mod bytes;
pub mod class;
pub mod complex;
pub mod dict;
pub mod list;
pub mod long_int;
pub mod range;
pub mod set;
pub mod slice;
pub mod str;
pub mod tuple;
pub mod r#type;

pub use bytes::Bytes;
pub use class::{Class, Instance};
pub use complex::Complex;
pub use dict::Dict;
pub use list::List;
pub use long_int::LongInt;
pub use r#type::{Type, TypeRef};
pub use range::Range;
pub use set::Set;
pub use slice::Slice;
pub use str::Str;
pub use tuple::Tuple;
