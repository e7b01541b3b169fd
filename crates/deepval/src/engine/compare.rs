//! Rich comparison dispatch, the per-type comparison slots and the ordering fallback.
//!
//! A slot returns `Some(bool)` when it can decide the comparison and `None`
//! ("NotImplemented") otherwise. Dispatch tries the slots of both operands,
//! reversed subtype first. In total mode, types with a three-way comparison
//! (dicts) get one more chance before the ordering fallback.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::FromPrimitive;

use super::{CompareMode, CompareOp, FallbackRule};
use crate::{
    exception::{ExcType, RunResult, SimpleException},
    heap::{Heap, HeapData},
    resource::ResourceTracker,
    tracer::EngineTracer,
    types::{Dict, Set, Type, TypeRef},
    value::Value,
};

/// Largest magnitude below which every `i64` converts to `f64` exactly.
const EXACT_F64_INT: u64 = 1 << 53;

/// Compares values over a borrowed heap.
///
/// Comparison never allocates, so it only needs `&Heap`; this lets dict and set
/// construction run key equality while holding the heap immutably.
pub(crate) struct Comparator<'a, T: ResourceTracker, Tr: EngineTracer> {
    heap: &'a Heap<T>,
    tracer: &'a mut Tr,
    mode: CompareMode,
}

impl<'a, T: ResourceTracker, Tr: EngineTracer> Comparator<'a, T, Tr> {
    pub fn new(heap: &'a Heap<T>, tracer: &'a mut Tr, mode: CompareMode) -> Self {
        Self { heap, tracer, mode }
    }

    /// Full rich comparison with the integer fast path and depth accounting.
    pub fn rich_compare(&mut self, a: &Value, b: &Value, op: CompareOp) -> RunResult<bool> {
        if let (Value::Int(x), Value::Int(y)) = (a, b) {
            return Ok(op.apply(x.cmp(y)));
        }
        self.enter()?;
        let result = self.rich_compare_norecurse(a, b, op);
        self.heap.data_depth_exit();
        result
    }

    /// Slot dispatch without touching the depth counter for this level.
    pub fn rich_compare_norecurse(&mut self, a: &Value, b: &Value, op: CompareOp) -> RunResult<bool> {
        let heap = self.heap;
        let type_a = a.py_type(heap);
        let type_b = b.py_type(heap);

        if type_a == type_b {
            if let Some(result) = self.slot(a, b, op)? {
                return Ok(result);
            }
            if self.mode == CompareMode::Total
                && let Some(ordering) = self.three_way(a, b)?
            {
                return Ok(op.apply(ordering));
            }
            return self.ordering_fallback(a, b, op);
        }

        let reversed_first = type_b.is_subtype_of(type_a, heap);
        if reversed_first && let Some(result) = self.slot(b, a, op.swapped())? {
            return Ok(result);
        }
        if let Some(result) = self.slot(a, b, op)? {
            return Ok(result);
        }
        if !reversed_first && let Some(result) = self.slot(b, a, op.swapped())? {
            return Ok(result);
        }
        self.ordering_fallback(a, b, op)
    }

    /// Decides a comparison no slot implements.
    pub fn ordering_fallback(&mut self, a: &Value, b: &Value, op: CompareOp) -> RunResult<bool> {
        let (rule, result) = match self.mode {
            CompareMode::Total => {
                let (rule, ordering) = self.total_order(a, b);
                (rule, op.apply(ordering))
            }
            CompareMode::Strict => {
                let identical = a.is_identical(b);
                let result = match op {
                    CompareOp::Eq => identical,
                    CompareOp::Ne => !identical,
                    _ => {
                        let heap = self.heap;
                        return Err(
                            ExcType::not_supported_between(op, a.type_name(heap), b.type_name(heap)).into(),
                        );
                    }
                };
                (FallbackRule::Strict, result)
            }
        };
        self.tracer.on_fallback(op, rule, result);
        Ok(result)
    }

    /// The legacy total order over all values.
    fn total_order(&self, a: &Value, b: &Value) -> (FallbackRule, Ordering) {
        if a.is_identical(b) {
            return (FallbackRule::Identical, Ordering::Equal);
        }
        let heap = self.heap;
        let type_a = a.py_type(heap);
        let type_b = b.py_type(heap);
        if type_a == type_b {
            return (FallbackRule::SameTypeIdentity, a.identity().cmp(&b.identity()));
        }

        let none = TypeRef::Builtin(Type::NoneType);
        if type_a == none {
            return (FallbackRule::NoneFirst, Ordering::Less);
        }
        if type_b == none {
            return (FallbackRule::NoneFirst, Ordering::Greater);
        }

        match (type_a.is_numeric(), type_b.is_numeric()) {
            (true, true) => (FallbackRule::NumericTypeIdentity, type_a.cmp(&type_b)),
            (true, false) => (FallbackRule::NumericFirst, Ordering::Less),
            (false, true) => (FallbackRule::NumericFirst, Ordering::Greater),
            (false, false) => match type_a.name(heap).as_bytes().cmp(type_b.name(heap).as_bytes()) {
                Ordering::Equal => (FallbackRule::TypeIdentity, type_a.cmp(&type_b)),
                ordering => (FallbackRule::TypeName, ordering),
            },
        }
    }

    /// The comparison slot of `left`'s type, applied as `left <op> right`.
    fn slot(&mut self, left: &Value, right: &Value, op: CompareOp) -> RunResult<Option<bool>> {
        let heap = self.heap;
        if let Some(l) = Number::of(left, heap) {
            let Some(r) = Number::of(right, heap) else {
                return Ok(None);
            };
            if !op.is_equality() && (l.is_complex() || r.is_complex()) {
                return Err(ExcType::complex_ordering().into());
            }
            return Ok(l.compare(r, op));
        }

        let Value::Ref(left_id) = left else {
            return Ok(identity_slot(left, right, op));
        };
        let left_data = heap.get(*left_id);
        let right_data = match right {
            Value::Ref(right_id) => Some(heap.get(*right_id)),
            _ => None,
        };

        let result = match (left_data, right_data) {
            (HeapData::Str(a), Some(HeapData::Str(b))) => Some(op.apply(a.as_str().cmp(b.as_str()))),
            (HeapData::Bytes(a), Some(HeapData::Bytes(b))) => Some(op.apply(a.as_slice().cmp(b.as_slice()))),
            (HeapData::List(a), Some(HeapData::List(b))) => Some(self.compare_sequences(a.as_slice(), b.as_slice(), op)?),
            (HeapData::Tuple(a), Some(HeapData::Tuple(b))) => {
                Some(self.compare_sequences(a.as_slice(), b.as_slice(), op)?)
            }
            (HeapData::Slice(a), Some(HeapData::Slice(b))) => Some(self.compare_sequences(a.parts(), b.parts(), op)?),
            (HeapData::Dict(a), Some(HeapData::Dict(b))) if op.is_equality() => {
                Some(self.dicts_equal(a, b)? == (op == CompareOp::Eq))
            }
            (HeapData::Set(a), Some(HeapData::Set(b))) => Some(self.compare_sets(a, b, op)?),
            (HeapData::Range(a), Some(HeapData::Range(b))) => Some(op.apply(a.cmp_sequence(b))),
            (HeapData::Class(_) | HeapData::Instance(_), _) => identity_slot(left, right, op),
            _ => None,
        };
        Ok(result)
    }

    /// Lexicographic comparison: the first pair that is neither identical nor
    /// equal decides, otherwise the lengths do.
    fn compare_sequences(&mut self, a: &[Value], b: &[Value], op: CompareOp) -> RunResult<bool> {
        if a.len() != b.len() && op.is_equality() {
            return Ok(op == CompareOp::Ne);
        }
        for (x, y) in a.iter().zip(b) {
            if x.is_identical(y) || self.rich_compare(x, y, CompareOp::Eq)? {
                continue;
            }
            return match op {
                CompareOp::Eq => Ok(false),
                CompareOp::Ne => Ok(true),
                _ => self.rich_compare(x, y, op),
            };
        }
        Ok(op.apply(a.len().cmp(&b.len())))
    }

    fn dicts_equal(&mut self, a: &Dict, b: &Dict) -> RunResult<bool> {
        if a.len() != b.len() {
            return Ok(false);
        }
        for (key, value, hash) in a.iter_with_hash() {
            let found = b.get_with_hash(key, hash, &mut |x, y| self.rich_compare(x, y, CompareOp::Eq))?;
            let Some(other) = found else {
                return Ok(false);
            };
            if !value.is_identical(other) && !self.rich_compare(value, other, CompareOp::Eq)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Three-way comparison for same-type operands whose slot only decides equality.
    fn three_way(&mut self, a: &Value, b: &Value) -> RunResult<Option<Ordering>> {
        let heap = self.heap;
        let (Value::Ref(a_id), Value::Ref(b_id)) = (a, b) else {
            return Ok(None);
        };
        match (heap.get(*a_id), heap.get(*b_id)) {
            (HeapData::Dict(x), HeapData::Dict(y)) => self.dict_three_way(x, y).map(Some),
            _ => Ok(None),
        }
    }

    /// Dict order: shorter first, then the smallest differing key of each side
    /// decides, then the values stored under those keys.
    fn dict_three_way(&mut self, a: &Dict, b: &Dict) -> RunResult<Ordering> {
        if a.len() != b.len() {
            return Ok(a.len().cmp(&b.len()));
        }
        let Some((a_key, a_value)) = self.smallest_difference(a, b)? else {
            return Ok(Ordering::Equal);
        };
        let Some((b_key, b_value)) = self.smallest_difference(b, a)? else {
            return Ok(Ordering::Equal);
        };
        match self.three_way_values(a_key, b_key)? {
            Ordering::Equal => self.three_way_values(a_value, b_value),
            ordering => Ok(ordering),
        }
    }

    /// The smallest key of `a` that is missing from `b` or maps to an unequal
    /// value there, with its value in `a`.
    fn smallest_difference<'d>(&mut self, a: &'d Dict, b: &Dict) -> RunResult<Option<(&'d Value, &'d Value)>> {
        let mut smallest: Option<(&'d Value, &'d Value)> = None;
        for (key, value, hash) in a.iter_with_hash() {
            if let Some((current, _)) = smallest
                && !self.rich_compare(key, current, CompareOp::Lt)?
            {
                continue;
            }
            let found = b.get_with_hash(key, hash, &mut |x, y| self.rich_compare(x, y, CompareOp::Eq))?;
            let differs = match found {
                None => true,
                Some(other) => !value.is_identical(other) && !self.rich_compare(value, other, CompareOp::Eq)?,
            };
            if differs {
                smallest = Some((key, value));
            }
        }
        Ok(smallest)
    }

    /// Ordering of two values through `<` and `==`; anything else counts as greater.
    fn three_way_values(&mut self, a: &Value, b: &Value) -> RunResult<Ordering> {
        if a.is_identical(b) {
            return Ok(Ordering::Equal);
        }
        if self.rich_compare(a, b, CompareOp::Lt)? {
            Ok(Ordering::Less)
        } else if self.rich_compare(a, b, CompareOp::Eq)? {
            Ok(Ordering::Equal)
        } else {
            Ok(Ordering::Greater)
        }
    }

    /// Set comparisons are the subset relations.
    fn compare_sets(&mut self, a: &Set, b: &Set, op: CompareOp) -> RunResult<bool> {
        Ok(match op {
            CompareOp::Eq => a.len() == b.len() && self.is_subset(a, b)?,
            CompareOp::Ne => !(a.len() == b.len() && self.is_subset(a, b)?),
            CompareOp::Le => self.is_subset(a, b)?,
            CompareOp::Lt => a.len() < b.len() && self.is_subset(a, b)?,
            CompareOp::Ge => self.is_subset(b, a)?,
            CompareOp::Gt => a.len() > b.len() && self.is_subset(b, a)?,
        })
    }

    fn is_subset(&mut self, a: &Set, b: &Set) -> RunResult<bool> {
        if a.len() > b.len() {
            return Ok(false);
        }
        for (value, hash) in a.iter_with_hash() {
            if !b.contains_hashed(value, hash, &mut |x, y| self.rich_compare(x, y, CompareOp::Eq))? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn enter(&mut self) -> RunResult<()> {
        self.heap.data_depth_enter().map_err(|_| {
            self.tracer.on_depth_exceeded(self.heap.tracker().max_data_depth());
            SimpleException::new_msg(ExcType::RecursionError, "maximum recursion depth exceeded in comparison").into()
        })
    }
}

/// The default object slot: identical operands are equal, nothing else is decided.
fn identity_slot(left: &Value, right: &Value, op: CompareOp) -> Option<bool> {
    match op {
        CompareOp::Eq if left.is_identical(right) => Some(true),
        CompareOp::Ne if left.is_identical(right) => Some(false),
        _ => None,
    }
}

/// A numeric operand borrowed from a value.
#[derive(Debug, Clone, Copy)]
enum Number<'a> {
    Int(i64),
    Big(&'a BigInt),
    Float(f64),
    Complex(f64, f64),
}

impl<'a> Number<'a> {
    fn of(value: &Value, heap: &'a Heap<impl ResourceTracker>) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Int(i64::from(*b))),
            Value::Int(i) => Some(Self::Int(*i)),
            Value::Float(f) => Some(Self::Float(*f)),
            Value::Ref(id) => match heap.get(*id) {
                HeapData::LongInt(li) => Some(Self::Big(li.as_bigint())),
                HeapData::Complex(c) => Some(Self::Complex(c.re, c.im)),
                _ => None,
            },
            _ => None,
        }
    }

    fn is_complex(self) -> bool {
        matches!(self, Self::Complex(..))
    }

    /// The numeric slot. Complex numbers only support `==` and `!=`.
    fn compare(self, other: Self, op: CompareOp) -> Option<bool> {
        if matches!(self, Self::Complex(..)) || matches!(other, Self::Complex(..)) {
            if !op.is_equality() {
                return None;
            }
            let (re_a, im_a) = self.split();
            let (re_b, im_b) = other.split();
            let equal = im_a == im_b && re_a.cmp_real(re_b) == Some(Ordering::Equal);
            return Some(equal == (op == CompareOp::Eq));
        }
        Some(match self.cmp_real(other) {
            Some(ordering) => op.apply(ordering),
            // NaN is unordered: only `!=` holds
            None => op == CompareOp::Ne,
        })
    }

    fn split(self) -> (Self, f64) {
        match self {
            Self::Complex(re, im) => (Self::Float(re), im),
            real => (real, 0.0),
        }
    }

    /// Exact comparison of two real numbers, `None` when a NaN is involved.
    fn cmp_real(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(x), Self::Int(y)) => Some(x.cmp(&y)),
            (Self::Int(x), Self::Big(y)) => Some(BigInt::from(x).cmp(y)),
            (Self::Big(x), Self::Int(y)) => Some(x.cmp(&BigInt::from(y))),
            (Self::Big(x), Self::Big(y)) => Some(x.cmp(y)),
            (Self::Float(x), Self::Float(y)) => x.partial_cmp(&y),
            (Self::Float(x), int) => int_vs_float(int, x).map(Ordering::reverse),
            (int, Self::Float(y)) => int_vs_float(int, y),
            (Self::Complex(..), _) | (_, Self::Complex(..)) => None,
        }
    }
}

/// Compares an integer with a float without rounding either.
fn int_vs_float(int: Number<'_>, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float.is_infinite() {
        return Some(if float > 0.0 { Ordering::Less } else { Ordering::Greater });
    }
    let owned;
    let int = match int {
        Number::Int(i) if i.unsigned_abs() < EXACT_F64_INT => return (i as f64).partial_cmp(&float),
        Number::Int(i) => {
            owned = BigInt::from(i);
            &owned
        }
        Number::Big(big) => big,
        Number::Float(_) | Number::Complex(..) => return None,
    };
    let floor = float.floor();
    let floor_int = BigInt::from_f64(floor)?;
    match int.cmp(&floor_int) {
        Ordering::Equal if floor == float => Some(Ordering::Equal),
        Ordering::Equal => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_float_comparison_is_exact() {
        let big = Number::Int((1 << 53) + 1);
        assert_eq!(int_vs_float(big, 9_007_199_254_740_992.0), Some(Ordering::Greater));
        assert_eq!(int_vs_float(Number::Int(3), 3.5), Some(Ordering::Less));
        assert_eq!(int_vs_float(Number::Int(-3), -3.5), Some(Ordering::Greater));
        assert_eq!(int_vs_float(Number::Int(i64::MAX), f64::INFINITY), Some(Ordering::Less));
        assert_eq!(int_vs_float(Number::Int(0), f64::NAN), None);
    }

    #[test]
    fn nan_is_only_unequal() {
        let nan = Number::Float(f64::NAN);
        assert_eq!(nan.compare(nan, CompareOp::Eq), Some(false));
        assert_eq!(nan.compare(nan, CompareOp::Ne), Some(true));
        assert_eq!(nan.compare(Number::Int(1), CompareOp::Lt), Some(false));
    }

    #[test]
    fn complex_supports_equality_only() {
        let c = Number::Complex(2.0, 0.0);
        assert_eq!(c.compare(Number::Int(2), CompareOp::Eq), Some(true));
        assert_eq!(Number::Int(2).compare(c, CompareOp::Ne), Some(false));
        assert_eq!(c.compare(Number::Int(2), CompareOp::Le), None);
    }
}
