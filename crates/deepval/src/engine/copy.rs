//! Deep copy.
//!
//! Mutable containers (dict, list, set) and tuples are rebuilt; every other
//! variant is immutable by identity and shared by taking a new reference.

use super::Engine;
use crate::{
    exception::{ExcType, RunResult},
    heap::{DropWithHeap, HeapData, HeapId},
    resource::ResourceTracker,
    tracer::EngineTracer,
    types::{Dict, List, Set, Tuple, Type},
    value::Value,
};

impl<T: ResourceTracker, Tr: EngineTracer> Engine<'_, T, Tr> {
    /// Returns a structurally equal value sharing no mutable container with `value`.
    ///
    /// Dict keys and set elements are shared with the source (they are hashable,
    /// hence immutable); dict values and list/tuple items are copied recursively.
    ///
    /// # Errors
    /// - `UnsupportedTypeError` for instances of user classes
    /// - `RecursionError` when nesting exceeds the data depth limit
    /// - `MemoryError` when the heap's resource limits refuse an allocation
    ///
    /// Nothing allocated by a failed copy stays alive.
    pub fn deep_copy(&mut self, value: &Value) -> RunResult<Value> {
        let Value::Ref(id) = value else {
            return Ok(value.clone_immediate());
        };
        match self.heap.get(*id) {
            HeapData::Dict(_) | HeapData::List(_) | HeapData::Tuple(_) | HeapData::Set(_) => {}
            HeapData::Instance(_) => {
                return Err(ExcType::unsupported("deep_copy", value.type_name(self.heap)).into());
            }
            HeapData::Str(_)
            | HeapData::Bytes(_)
            | HeapData::LongInt(_)
            | HeapData::Complex(_)
            | HeapData::Range(_)
            | HeapData::Slice(_)
            | HeapData::Class(_) => return Ok(value.clone_with_heap(self.heap)),
        }

        self.enter_data()?;
        let result = self.copy_container(*id);
        self.heap.data_depth_exit();
        result
    }

    fn copy_container(&mut self, id: HeapId) -> RunResult<Value> {
        let (ty, data) = match self.heap.get(id) {
            HeapData::Dict(dict) => {
                let len = dict.len();
                (Type::Dict, self.copy_dict_entries(id, len)?)
            }
            HeapData::List(list) => {
                let items = snapshot(list.as_slice());
                (Type::List, HeapData::List(List::new(self.copy_items(&items)?)))
            }
            HeapData::Tuple(tuple) => {
                let items = snapshot(tuple.as_slice());
                (Type::Tuple, HeapData::Tuple(Tuple::new(self.copy_items(&items)?)))
            }
            HeapData::Set(set) => {
                let mut copy = Set::with_capacity(set.len());
                for (element, hash) in set.iter_with_hash() {
                    copy.push_unique(element.clone_with_heap(self.heap), hash);
                }
                (Type::Set, HeapData::Set(copy))
            }
            other => unreachable!("copy_container called on {}", other.variant_name()),
        };
        let len = match &data {
            HeapData::Dict(dict) => dict.len(),
            HeapData::List(list) => list.len(),
            HeapData::Tuple(tuple) => tuple.len(),
            HeapData::Set(set) => set.len(),
            _ => 0,
        };
        let copy = Value::Ref(self.heap.allocate(data)?);
        self.tracer.on_copy(ty, len, self.heap.data_depth());
        Ok(copy)
    }

    /// Copies every item, releasing the partial result if one fails.
    fn copy_items(&mut self, items: &[Value]) -> RunResult<Vec<Value>> {
        let mut copied = Vec::with_capacity(items.len());
        for item in items {
            match self.deep_copy(item) {
                Ok(copy) => copied.push(copy),
                Err(err) => {
                    copied.drop_with_heap(self.heap);
                    return Err(err);
                }
            }
        }
        Ok(copied)
    }

    /// Builds a dict with shared keys and copied values.
    ///
    /// Keys keep their cached hash, so no key is rehashed or compared.
    fn copy_dict_entries(&mut self, id: HeapId, len: usize) -> RunResult<HeapData> {
        let entries: Vec<(Value, Value, u64)> = match self.heap.get(id) {
            HeapData::Dict(dict) => dict
                .iter_with_hash()
                .map(|(key, value, hash)| (key.copy_for_extend(), value.copy_for_extend(), hash))
                .collect(),
            other => unreachable!("copy_dict_entries called on {}", other.variant_name()),
        };

        let mut copy = Dict::with_capacity(len);
        for (key, value, hash) in &entries {
            match self.deep_copy(value) {
                Ok(value_copy) => copy.push_unique(key.clone_with_heap(self.heap), value_copy, *hash),
                Err(err) => {
                    copy.drop_with_heap(self.heap);
                    return Err(err);
                }
            }
        }
        Ok(HeapData::Dict(copy))
    }
}

/// Snapshot of a container's items that borrows nothing from the heap.
///
/// The snapshot holds no references of its own: the source container keeps
/// the items alive for as long as the copy runs, and copying never frees.
fn snapshot(items: &[Value]) -> Vec<Value> {
    items.iter().map(Value::copy_for_extend).collect()
}
