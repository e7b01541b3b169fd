use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use crate::{
    exception::{ExcType, RunResult},
    heap::{Heap, HeapData},
    resource::{ResourceError, ResourceTracker},
    value::Value,
};

/// Arbitrary-precision Python `int` for values outside the `i64` range.
///
/// Values that fit `i64` are always demoted to `Value::Int` by [`LongInt::into_value`],
/// so a heap `LongInt` compares unequal to every immediate int.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongInt(BigInt);

impl LongInt {
    #[must_use]
    pub fn new(value: BigInt) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    /// Converts to a `Value`, demoting to an immediate when the value fits `i64`.
    pub fn into_value(self, heap: &mut Heap<impl ResourceTracker>) -> Result<Value, ResourceError> {
        match self.0.to_i64() {
            Some(small) => Ok(Value::Int(small)),
            None => Ok(Value::Ref(heap.allocate(HeapData::LongInt(self))?)),
        }
    }

    /// Approximate heap footprint in bytes.
    #[must_use]
    pub fn estimate_size(&self) -> usize {
        std::mem::size_of::<Self>() + usize::try_from(self.0.bits().div_ceil(8)).unwrap_or(usize::MAX)
    }
}

/// Canonical decimal text of an integer, honoring the digit limit.
///
/// Mirrors CPython's `int.__str__` guard: numbers with more than `max_digits`
/// digits raise `ValueError` rather than being converted.
pub(crate) fn int_to_decimal(value: &BigInt, max_digits: Option<usize>) -> RunResult<String> {
    if let Some(limit) = max_digits {
        // cheap lower bound on the digit count before paying for the conversion
        let min_digits = (value.bits().saturating_sub(1) as f64 * std::f64::consts::LOG10_2) as usize;
        if min_digits > limit {
            return Err(ExcType::str_digits_exceeded(limit).into());
        }
        let text = value.to_string();
        let digits = if value.is_negative() { text.len() - 1 } else { text.len() };
        if digits > limit {
            return Err(ExcType::str_digits_exceeded(limit).into());
        }
        return Ok(text);
    }
    Ok(value.to_string())
}
