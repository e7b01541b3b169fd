use std::fmt::{self, Write};

use hashbrown::HashSet;
use num_bigint::BigInt;

use crate::{
    engine::{Comparator, CompareMode, CompareOp},
    exception::{ExcType, RunResult},
    heap::{DropWithHeap, Heap, HeapData, HeapId},
    resource::ResourceTracker,
    tracer::NoopTracer,
    types::{
        Bytes, Complex, Dict, List, LongInt, Range, Set, Slice, Str, Tuple, Type,
        bytes::bytes_repr,
        str::string_repr,
    },
    value::Value,
};

/// A Python value owned outside the heap.
///
/// This is the public-facing type for building values and inspecting results.
/// It owns all its data and can be freely cloned, compared or serialized.
///
/// `Repr` is output-only: it stands for values with no structural mapping
/// (classes, instances, cyclic references) and cannot be converted back.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Object {
    /// Python's `None` singleton.
    None,
    /// Python's `Ellipsis` singleton (`...`).
    Ellipsis,
    Bool(bool),
    Int(i64),
    /// An integer outside the `i64` range. Values that fit are demoted to `Int` on conversion.
    BigInt(BigInt),
    Float(f64),
    Complex { re: f64, im: f64 },
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Object>),
    Tuple(Vec<Object>),
    /// Entries in insertion order. Duplicate keys keep the first key and the last value.
    Dict(Vec<(Object, Object)>),
    /// Elements in insertion order. Duplicates are dropped.
    Set(Vec<Object>),
    Range { start: i64, stop: i64, step: i64 },
    Slice {
        start: Box<Object>,
        stop: Box<Object>,
        step: Box<Object>,
    },
    /// A builtin type used as a value.
    Type(Type),
    /// Output-only textual stand-in.
    Repr(String),
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Repr(s) => f.write_str(s),
            _ => self.repr_fmt(f),
        }
    }
}

impl Object {
    /// Convenience constructor for `Object::String`.
    pub fn str(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Convenience constructor for a `slice` with integer or `None` parts.
    #[must_use]
    pub fn slice(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        let part = |p: Option<i64>| Box::new(p.map_or(Self::None, Self::Int));
        Self::Slice {
            start: part(start),
            stop: part(stop),
            step: part(step),
        }
    }

    /// Converts this object into a `Value`, allocating on the heap as needed.
    ///
    /// The returned value owns one reference; release it with `drop_with_heap`.
    ///
    /// # Errors
    /// - `TypeError` for unhashable dict keys or set elements and for `Repr`
    /// - `ValueError` for a range with a zero step
    /// - `MemoryError` when the heap's resource limits refuse an allocation
    ///
    /// On error nothing allocated by the conversion stays alive.
    pub fn to_value(&self, heap: &mut Heap<impl ResourceTracker>) -> RunResult<Value> {
        let data = match self {
            Self::None => return Ok(Value::None),
            Self::Ellipsis => return Ok(Value::Ellipsis),
            Self::Bool(b) => return Ok(Value::Bool(*b)),
            Self::Int(i) => return Ok(Value::Int(*i)),
            Self::Float(f) => return Ok(Value::Float(*f)),
            Self::Type(ty) => return Ok(Value::Builtin(*ty)),
            Self::BigInt(bi) => return Ok(LongInt::new(bi.clone()).into_value(heap)?),
            Self::Complex { re, im } => HeapData::Complex(Complex::new(*re, *im)),
            Self::String(s) => HeapData::Str(Str::new(s.clone())),
            Self::Bytes(b) => HeapData::Bytes(Bytes::new(b.clone())),
            Self::List(items) => HeapData::List(List::new(values_from(items, heap)?)),
            Self::Tuple(items) => HeapData::Tuple(Tuple::new(values_from(items, heap)?)),
            Self::Dict(pairs) => HeapData::Dict(dict_from(pairs, heap)?),
            Self::Set(items) => HeapData::Set(set_from(items, heap)?),
            Self::Range { start, stop, step } => match Range::new(*start, *stop, *step) {
                Some(range) => HeapData::Range(range),
                None => return Err(ExcType::range_step_zero().into()),
            },
            Self::Slice { start, stop, step } => {
                let mut parts = values_from([&**start, &**stop, &**step], heap)?.into_iter();
                let (Some(start), Some(stop), Some(step)) = (parts.next(), parts.next(), parts.next()) else {
                    unreachable!("three slice parts converted");
                };
                HeapData::Slice(Slice::new(start, stop, step))
            }
            Self::Repr(_) => return Err(ExcType::repr_not_convertible().into()),
        };
        Ok(Value::Ref(heap.allocate(data)?))
    }

    /// Snapshot of a value. The value itself is left untouched.
    ///
    /// Cyclic references are rendered as `Repr("[...]")`, `Repr("{...}")` or
    /// `Repr("(...)")`.
    #[must_use]
    pub fn from_value(value: &Value, heap: &Heap<impl ResourceTracker>) -> Self {
        let mut active = HashSet::new();
        Self::from_value_inner(value, heap, &mut active)
    }

    /// Converts a value into an object and releases the value.
    pub fn new(value: Value, heap: &mut Heap<impl ResourceTracker>) -> Self {
        let object = Self::from_value(&value, heap);
        value.drop_with_heap(heap);
        object
    }

    fn from_value_inner(value: &Value, heap: &Heap<impl ResourceTracker>, active: &mut HashSet<HeapId>) -> Self {
        let id = match value {
            Value::None => return Self::None,
            Value::Ellipsis => return Self::Ellipsis,
            Value::Bool(b) => return Self::Bool(*b),
            Value::Int(i) => return Self::Int(*i),
            Value::Float(f) => return Self::Float(*f),
            Value::Builtin(ty) => return Self::Type(*ty),
            Value::Ref(id) => *id,
        };

        if !active.insert(id) {
            let placeholder = match heap.get(id) {
                HeapData::List(_) => "[...]",
                HeapData::Tuple(_) => "(...)",
                HeapData::Dict(_) | HeapData::Set(_) => "{...}",
                _ => "...",
            };
            return Self::Repr(placeholder.to_owned());
        }

        let object = match heap.get(id) {
            HeapData::Str(s) => Self::String(s.as_str().to_owned()),
            HeapData::Bytes(b) => Self::Bytes(b.as_slice().to_owned()),
            HeapData::LongInt(li) => Self::BigInt(li.as_bigint().clone()),
            HeapData::Complex(c) => Self::Complex { re: c.re, im: c.im },
            HeapData::List(list) => Self::List(objects_from(list.as_slice(), heap, active)),
            HeapData::Tuple(tuple) => Self::Tuple(objects_from(tuple.as_slice(), heap, active)),
            HeapData::Set(set) => Self::Set(objects_from(set.iter(), heap, active)),
            HeapData::Dict(dict) => Self::Dict(
                dict.iter()
                    .map(|(k, v)| {
                        (
                            Self::from_value_inner(k, heap, active),
                            Self::from_value_inner(v, heap, active),
                        )
                    })
                    .collect(),
            ),
            HeapData::Range(range) => Self::Range {
                start: range.start(),
                stop: range.stop(),
                step: range.step(),
            },
            HeapData::Slice(slice) => Self::Slice {
                start: Box::new(Self::from_value_inner(slice.start(), heap, active)),
                stop: Box::new(Self::from_value_inner(slice.stop(), heap, active)),
                step: Box::new(Self::from_value_inner(slice.step(), heap, active)),
            },
            HeapData::Class(class) => Self::Repr(format!("<class '{}'>", class.name())),
            HeapData::Instance(_) => Self::Repr(format!("<{} object>", value.type_name(heap))),
        };
        active.remove(&id);
        object
    }

    /// Returns the Python `repr()` string for this value.
    ///
    /// # Panics
    /// Could panic if out of memory.
    #[must_use]
    pub fn py_repr(&self) -> String {
        let mut s = String::new();
        self.repr_fmt(&mut s).expect("Unable to format repr display value");
        s
    }

    /// Name of the Python type this object converts to.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Ellipsis => "ellipsis",
            Self::Bool(_) => "bool",
            Self::Int(_) | Self::BigInt(_) => "int",
            Self::Float(_) => "float",
            Self::Complex { .. } => "complex",
            Self::String(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::Range { .. } => "range",
            Self::Slice { .. } => "slice",
            Self::Type(_) => "type",
            Self::Repr(_) => "repr",
        }
    }

    fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Ellipsis => f.write_str("Ellipsis"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Float(v) => f.write_str(&float_repr(*v)),
            Self::Complex { re, im } => {
                let sign = if im.is_sign_negative() && !im.is_nan() { '-' } else { '+' };
                let im_text = complex_part(im.abs());
                if *re == 0.0 && re.is_sign_positive() {
                    write!(f, "{}j", complex_part(*im))
                } else {
                    write!(f, "({}{sign}{im_text}j)", complex_part(*re))
                }
            }
            Self::String(s) => f.write_str(&string_repr(s)),
            Self::Bytes(b) => f.write_str(&bytes_repr(b)),
            Self::List(items) => {
                f.write_char('[')?;
                write_items(f, items)?;
                f.write_char(']')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::Dict(pairs) => {
                f.write_char('{')?;
                for (index, (k, v)) in pairs.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    k.repr_fmt(f)?;
                    f.write_str(": ")?;
                    v.repr_fmt(f)?;
                }
                f.write_char('}')
            }
            Self::Set(items) if items.is_empty() => f.write_str("set()"),
            Self::Set(items) => {
                f.write_char('{')?;
                write_items(f, items)?;
                f.write_char('}')
            }
            Self::Range { start, stop, step } => {
                if *step == 1 {
                    write!(f, "range({start}, {stop})")
                } else {
                    write!(f, "range({start}, {stop}, {step})")
                }
            }
            Self::Slice { start, stop, step } => {
                f.write_str("slice(")?;
                start.repr_fmt(f)?;
                f.write_str(", ")?;
                stop.repr_fmt(f)?;
                f.write_str(", ")?;
                step.repr_fmt(f)?;
                f.write_char(')')
            }
            Self::Type(ty) => write!(f, "<class '{ty}'>"),
            Self::Repr(s) => f.write_str(s),
        }
    }
}

fn objects_from<'v>(
    items: impl IntoIterator<Item = &'v Value>,
    heap: &Heap<impl ResourceTracker>,
    active: &mut HashSet<HeapId>,
) -> Vec<Object> {
    items
        .into_iter()
        .map(|item| Object::from_value_inner(item, heap, active))
        .collect()
}

fn write_items(f: &mut impl Write, items: &[Object]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        item.repr_fmt(f)?;
    }
    Ok(())
}

/// Shortest round-tripping repr of a float, in CPython's spelling.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    let text = buffer.format_finite(value);
    match text.split_once('e') {
        // ryu writes `1e20` and `1e-7`; Python writes `1e+20` and `1e-07`
        Some((mantissa, exponent)) => {
            let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => text.to_owned(),
    }
}

/// A complex component: like a float repr, but integral values drop the `.0`.
fn complex_part(value: f64) -> String {
    let text = float_repr(value);
    if let Some(integral) = text.strip_suffix(".0") {
        return integral.to_owned();
    }
    text
}

/// Converts every object, releasing the ones already converted if one fails.
fn values_from<'o>(
    objects: impl IntoIterator<Item = &'o Object>,
    heap: &mut Heap<impl ResourceTracker>,
) -> RunResult<Vec<Value>> {
    let mut values = Vec::new();
    for object in objects {
        match object.to_value(heap) {
            Ok(value) => values.push(value),
            Err(err) => {
                values.drop_with_heap(heap);
                return Err(err);
            }
        }
    }
    Ok(values)
}

fn dict_from(pairs: &[(Object, Object)], heap: &mut Heap<impl ResourceTracker>) -> RunResult<Dict> {
    let mut dict = Dict::with_capacity(pairs.len());
    for (key, value) in pairs {
        if let Err(err) = insert_pair(&mut dict, key, value, heap) {
            dict.drop_with_heap(heap);
            return Err(err);
        }
    }
    Ok(dict)
}

fn insert_pair(
    dict: &mut Dict,
    key: &Object,
    value: &Object,
    heap: &mut Heap<impl ResourceTracker>,
) -> RunResult<()> {
    let key = key.to_value(heap)?;
    let hash = match hashed(&key, heap) {
        Ok(hash) => hash,
        Err(err) => {
            key.drop_with_heap(heap);
            return Err(err);
        }
    };
    let value = match value.to_value(heap) {
        Ok(value) => value,
        Err(err) => {
            key.drop_with_heap(heap);
            return Err(err);
        }
    };

    let mut tracer = NoopTracer;
    let mut comparator = Comparator::new(&*heap, &mut tracer, CompareMode::Total);
    let found = dict.find_index(&key, hash, &mut |a, b| comparator.rich_compare(a, b, CompareOp::Eq));
    match found {
        Ok(Some(index)) => {
            // `{1: 'a', 1.0: 'b'}` keeps the first key and the last value
            let old = dict.replace_value(index, value);
            old.drop_with_heap(heap);
            key.drop_with_heap(heap);
            Ok(())
        }
        Ok(None) => {
            dict.push_unique(key, value, hash);
            Ok(())
        }
        Err(err) => {
            (key, value).drop_with_heap(heap);
            Err(err)
        }
    }
}

fn set_from(items: &[Object], heap: &mut Heap<impl ResourceTracker>) -> RunResult<Set> {
    let mut set = Set::with_capacity(items.len());
    for item in items {
        if let Err(err) = insert_element(&mut set, item, heap) {
            set.drop_with_heap(heap);
            return Err(err);
        }
    }
    Ok(set)
}

fn insert_element(set: &mut Set, item: &Object, heap: &mut Heap<impl ResourceTracker>) -> RunResult<()> {
    let value = item.to_value(heap)?;
    let hash = match hashed(&value, heap) {
        Ok(hash) => hash,
        Err(err) => {
            value.drop_with_heap(heap);
            return Err(err);
        }
    };

    let mut tracer = NoopTracer;
    let mut comparator = Comparator::new(&*heap, &mut tracer, CompareMode::Total);
    match set.contains_hashed(&value, hash, &mut |a, b| comparator.rich_compare(a, b, CompareOp::Eq)) {
        Ok(false) => {
            set.push_unique(value, hash);
            Ok(())
        }
        Ok(true) => {
            value.drop_with_heap(heap);
            Ok(())
        }
        Err(err) => {
            value.drop_with_heap(heap);
            Err(err)
        }
    }
}

/// Python `hash()` of a dict key or set element, `TypeError` when unhashable.
fn hashed(value: &Value, heap: &Heap<impl ResourceTracker>) -> RunResult<u64> {
    value
        .py_hash(heap)
        .ok_or_else(|| ExcType::unhashable(value.type_name(heap)).into())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::resource::NoLimitTracker;

    #[test]
    fn float_repr_matches_python() {
        assert_eq!(float_repr(1.0), "1.0");
        assert_eq!(float_repr(0.1), "0.1");
        assert_eq!(float_repr(1e20), "1e+20");
        assert_eq!(float_repr(1.5e-7), "1.5e-07");
        assert_eq!(float_repr(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn reprs() {
        let object = Object::Dict(vec![
            (Object::str("a"), Object::Tuple(vec![Object::Int(1)])),
            (Object::None, Object::Set(vec![])),
        ]);
        assert_eq!(object.py_repr(), "{'a': (1,), None: set()}");
        assert_eq!(Object::Complex { re: 1.0, im: -2.0 }.py_repr(), "(1-2j)");
        assert_eq!(Object::Complex { re: 0.0, im: 3.0 }.py_repr(), "3j");
        assert_eq!(Object::slice(None, Some(3), None).py_repr(), "slice(None, 3, None)");
        assert_eq!(Object::Type(Type::Int).to_string(), "<class 'int'>");
    }

    #[test]
    fn dict_keys_collide_across_numeric_types() {
        let mut heap = Heap::new(16, NoLimitTracker);
        let object = Object::Dict(vec![
            (Object::Int(1), Object::str("int")),
            (Object::Float(1.0), Object::str("float")),
            (Object::Bool(true), Object::str("bool")),
        ]);
        let value = object.to_value(&mut heap).unwrap();
        assert_eq!(
            Object::from_value(&value, &heap),
            Object::Dict(vec![(Object::Int(1), Object::str("bool"))])
        );
        value.drop_with_heap(&mut heap);
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn set_drops_duplicates() {
        let mut heap = Heap::new(16, NoLimitTracker);
        let object = Object::Set(vec![Object::str("x"), Object::str("y"), Object::str("x")]);
        let value = object.to_value(&mut heap).unwrap();
        assert_eq!(
            Object::new(value, &mut heap),
            Object::Set(vec![Object::str("x"), Object::str("y")])
        );
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn unhashable_key_releases_everything() {
        let mut heap = Heap::new(16, NoLimitTracker);
        let object = Object::Dict(vec![
            (Object::str("ok"), Object::List(vec![Object::str("kept")])),
            (Object::List(vec![]), Object::Int(1)),
        ]);
        let err = object.to_value(&mut heap).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: unhashable type: 'list'");
        assert_eq!(heap.stats().live_objects, 0);
    }

    #[test]
    fn cycles_render_as_placeholders() {
        let mut heap = Heap::new(16, NoLimitTracker);
        let list = Object::List(vec![Object::Int(1)]).to_value(&mut heap).unwrap();
        let id = list.ref_id().unwrap();
        let inner = list.clone_with_heap(&heap);
        match heap.get_mut(id) {
            HeapData::List(items) => items.push(inner),
            _ => unreachable!(),
        }
        assert_eq!(
            Object::from_value(&list, &heap),
            Object::List(vec![Object::Int(1), Object::Repr("[...]".to_owned())])
        );
    }

    /// Only containers on the current path are placeholders; a shared child
    /// seen earlier in a sibling renders in full.
    #[test]
    fn shared_children_render_in_full() {
        let mut heap = Heap::new(16, NoLimitTracker);
        let outer = Object::List(vec![Object::List(vec![Object::Int(1)])])
            .to_value(&mut heap)
            .unwrap();
        let id = outer.ref_id().unwrap();
        let shared = match heap.get(id) {
            HeapData::List(items) => items.as_slice()[0].clone_with_heap(&heap),
            _ => unreachable!(),
        };
        match heap.get_mut(id) {
            HeapData::List(items) => items.push(shared),
            _ => unreachable!(),
        }
        let inner = Object::List(vec![Object::Int(1)]);
        assert_eq!(Object::from_value(&outer, &heap), Object::List(vec![inner.clone(), inner]));
        outer.drop_with_heap(&mut heap);
        assert_eq!(heap.stats().live_objects, 0);
    }
}
