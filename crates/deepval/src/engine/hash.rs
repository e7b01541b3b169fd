//! Deep hash: a structural fingerprint used to detect mutation of values that
//! are expected to stay constant.
//!
//! Every value starts from a header derived from its type. Containers XOR-fold
//! the hashes of their children into the header, so element order does not
//! matter. Text, bytes and floats feed their raw bytes through a rolling
//! multiply-xor, so byte order does.

use num_bigint::BigInt;

use super::Engine;
use crate::{
    exception::{ExcType, RunError, RunResult},
    heap::{Heap, HeapData},
    resource::ResourceTracker,
    tracer::EngineTracer,
    types::{Type, long_int::int_to_decimal},
    value::Value,
};

/// Multiplier of the rolling byte hash.
const ROLLING_MULTIPLIER: i64 = 1_000_003;

/// Seed for the per-type salt.
const KIND_SEED: i64 = 0x345_678;

impl<T: ResourceTracker, Tr: EngineTracer> Engine<'_, T, Tr> {
    /// Structural hash of `value`.
    ///
    /// Equal structures hash equal regardless of where they live on the heap,
    /// so a value and its [`deep_copy`](Self::deep_copy) share a hash, and two
    /// dicts with the same entries in a different order do too.
    ///
    /// An integer too long to convert to text under the digit limit contributes
    /// nothing; the error is reported to the tracer instead of the caller.
    ///
    /// # Errors
    /// - `UnsupportedTypeError` for instances of user classes
    /// - `RecursionError` when nesting exceeds the data depth limit
    pub fn deep_hash(&mut self, value: &Value) -> RunResult<i64> {
        let max_digits = self.heap.tracker().max_str_digits();
        DeepHasher {
            heap: &*self.heap,
            tracer: &mut self.tracer,
            max_digits,
        }
        .hash(value)
    }
}

struct DeepHasher<'a, T: ResourceTracker, Tr: EngineTracer> {
    heap: &'a Heap<T>,
    tracer: &'a mut Tr,
    max_digits: Option<usize>,
}

impl<T: ResourceTracker, Tr: EngineTracer> DeepHasher<'_, T, Tr> {
    fn hash(&mut self, value: &Value) -> RunResult<i64> {
        let heap = self.heap;
        let data = match value {
            Value::None => return Ok(header(Type::NoneType)),
            Value::Ellipsis => return Ok(header(Type::Ellipsis)),
            Value::Bool(_) => return Ok(header(Type::Bool)),
            Value::Int(i) => return Ok(self.hash_int(&BigInt::from(*i))),
            Value::Float(f) => return Ok(rolling(header(Type::Float), &f.to_ne_bytes())),
            Value::Builtin(ty) => return Ok(type_hash(ty.name())),
            Value::Ref(id) => heap.get(*id),
        };

        let hash = match data {
            HeapData::Str(s) => rolling(header(Type::Str), s.as_str().as_bytes()),
            HeapData::Bytes(b) => rolling(header(Type::Bytes), b.as_slice()),
            HeapData::LongInt(li) => self.hash_int(li.as_bigint()),
            HeapData::Complex(c) => rolling(header(Type::Complex), &c.to_ne_bytes()),
            HeapData::Range(_) => header(Type::Range),
            HeapData::Slice(_) => header(Type::Slice),
            HeapData::Class(class) => type_hash(class.name()),
            HeapData::List(list) => self.fold(header(Type::List), list.as_slice())?,
            HeapData::Tuple(tuple) => self.fold(header(Type::Tuple), tuple.as_slice())?,
            HeapData::Set(set) => self.fold(header(Type::Set), set.iter())?,
            HeapData::Dict(dict) => {
                self.enter()?;
                let result = self.fold_pairs(header(Type::Dict), dict.iter());
                self.heap.data_depth_exit();
                result?
            }
            HeapData::Instance(_) => {
                return Err(ExcType::unsupported("deep_hash", value.type_name(heap)).into());
            }
        };
        Ok(hash)
    }

    /// Header XOR the hashes of all items, under one level of data depth.
    fn fold<'v>(&mut self, start: i64, items: impl IntoIterator<Item = &'v Value>) -> RunResult<i64> {
        self.enter()?;
        let mut result = Ok(start);
        for item in items {
            match self.hash(item) {
                Ok(hash) => result = result.map(|acc| acc ^ hash),
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        self.heap.data_depth_exit();
        result
    }

    fn fold_pairs<'v>(
        &mut self,
        start: i64,
        pairs: impl Iterator<Item = (&'v Value, &'v Value)>,
    ) -> RunResult<i64> {
        let mut acc = start;
        for (key, value) in pairs {
            acc ^= self.hash(key)? ^ self.hash(value)?;
        }
        Ok(acc)
    }

    /// Header XOR the hash of the integer's decimal text.
    ///
    /// A conversion refused by the digit limit is absorbed.
    fn hash_int(&mut self, value: &BigInt) -> i64 {
        let start = header(Type::Int);
        match int_to_decimal(value, self.max_digits) {
            Ok(text) => start ^ rolling(header(Type::Str), text.as_bytes()),
            Err(err) => {
                self.absorb(&err);
                start
            }
        }
    }

    fn absorb(&mut self, err: &RunError) {
        self.tracer.on_hash_absorbed(err);
    }

    fn enter(&mut self) -> RunResult<()> {
        self.heap.data_depth_enter().map_err(|err| {
            self.tracer.on_depth_exceeded(self.heap.tracker().max_data_depth());
            err.into()
        })
    }
}

/// `h = 1000003 * h ^ byte` over every byte, bytes taken as signed.
fn rolling(start: i64, bytes: &[u8]) -> i64 {
    bytes.iter().fold(start, |h, &byte| {
        h.wrapping_mul(ROLLING_MULTIPLIER) ^ i64::from(byte as i8)
    })
}

/// Salt distinguishing values of different builtin types with equal payloads.
fn kind_salt(ty: Type) -> i64 {
    rolling(KIND_SEED, ty.name().as_bytes())
}

/// Header of a non-type value: its kind salt mixed with the hash of its type.
fn header(ty: Type) -> i64 {
    kind_salt(ty) ^ type_hash(ty.name())
}

/// Hash of a type descriptor: its own header (the salt of `type`, since a type
/// is not mixed with itself) rolled over the type's name.
fn type_hash(name: &str) -> i64 {
    rolling(kind_salt(Type::Type), name.as_bytes())
}
