use std::{cell::Cell, collections::BTreeMap, mem::size_of};

use strum::IntoStaticStr;

use crate::{
    exception::{ExcType, RunResult, SimpleException},
    resource::{ResourceError, ResourceTracker},
    types::{Bytes, Class, Complex, Dict, Instance, List, LongInt, Range, Set, Slice, Str, Tuple, Type, TypeRef},
    value::Value,
};

/// Snapshot of heap state at a point in time.
///
/// The `objects_by_type` map uses `BTreeMap` for deterministic iteration order,
/// making snapshots suitable for display and comparison without sort overhead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Total number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Breakdown of live objects by `HeapData` variant name.
    pub objects_by_type: BTreeMap<&'static str, usize>,
}

/// Unique identifier for values stored inside the heap arena.
///
/// The slot index is the value's identity: it orders same-type values in the
/// comparison fallback and is stable for as long as the value is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeapId(usize);

impl HeapId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Payload of a heap slot.
#[derive(Debug, IntoStaticStr)]
pub enum HeapData {
    Str(Str),
    Bytes(Bytes),
    LongInt(LongInt),
    Complex(Complex),
    List(List),
    Tuple(Tuple),
    Dict(Dict),
    Set(Set),
    Range(Range),
    Slice(Slice),
    Class(Class),
    Instance(Instance),
}

impl HeapData {
    /// The runtime type of the value stored here.
    #[must_use]
    pub fn py_type(&self) -> TypeRef {
        let ty = match self {
            Self::Str(_) => Type::Str,
            Self::Bytes(_) => Type::Bytes,
            Self::LongInt(_) => Type::Int,
            Self::Complex(_) => Type::Complex,
            Self::List(_) => Type::List,
            Self::Tuple(_) => Type::Tuple,
            Self::Dict(_) => Type::Dict,
            Self::Set(_) => Type::Set,
            Self::Range(_) => Type::Range,
            Self::Slice(_) => Type::Slice,
            Self::Class(_) => Type::Type,
            Self::Instance(inst) => return TypeRef::Class(inst.class()),
        };
        TypeRef::Builtin(ty)
    }

    /// Static variant name, used for heap statistics and diagnostics.
    #[must_use]
    pub fn variant_name(&self) -> &'static str {
        self.into()
    }

    /// Approximate heap footprint in bytes, reported to the resource tracker.
    #[must_use]
    pub fn estimate_size(&self) -> usize {
        let payload = match self {
            Self::Str(s) => s.as_str().len(),
            Self::Bytes(b) => b.len(),
            Self::LongInt(li) => li.estimate_size(),
            Self::List(list) => list.len() * size_of::<Value>(),
            Self::Tuple(tuple) => tuple.len() * size_of::<Value>(),
            Self::Dict(dict) => dict.len() * (2 * size_of::<Value>() + 2 * size_of::<u64>()),
            Self::Set(set) => set.len() * (size_of::<Value>() + 2 * size_of::<u64>()),
            Self::Class(class) => class.name().len(),
            Self::Complex(_) | Self::Range(_) | Self::Slice(_) | Self::Instance(_) => 0,
        };
        size_of::<Self>() + payload
    }

    /// Collects the heap ids this value holds references to.
    fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        match self {
            Self::List(list) => list.push_child_ids(out),
            Self::Tuple(tuple) => tuple.push_child_ids(out),
            Self::Dict(dict) => dict.push_child_ids(out),
            Self::Set(set) => set.push_child_ids(out),
            Self::Slice(slice) => slice.push_child_ids(out),
            Self::Class(class) => out.extend(class.base()),
            Self::Instance(inst) => out.push(inst.class()),
            Self::Str(_) | Self::Bytes(_) | Self::LongInt(_) | Self::Complex(_) | Self::Range(_) => {}
        }
    }
}

#[derive(Debug)]
struct HeapValue {
    refcount: Cell<usize>,
    data: HeapData,
}

/// Reference-counted arena that backs all heap-only runtime values.
///
/// Uses a free list to reuse slots from freed values. Generic over
/// `T: ResourceTracker`; with `NoLimitTracker` all resource checks compile away.
///
/// The heap also owns the data depth counter shared by every recursive
/// copy, hash and compare running against it. It lives in a `Cell` so that
/// read-only traversals (`&Heap`) can track depth, which also keeps the heap
/// `!Sync`: the counter is per-thread by construction.
#[derive(Debug)]
pub struct Heap<T: ResourceTracker> {
    entries: Vec<Option<HeapValue>>,
    /// IDs of freed slots available for reuse. Populated by `dec_ref`, consumed by `allocate`.
    free_list: Vec<HeapId>,
    tracker: T,
    /// Current nesting depth of recursive data operations.
    data_depth: Cell<usize>,
}

impl<T: ResourceTracker> Heap<T> {
    #[must_use]
    pub fn new(capacity: usize, tracker: T) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            tracker,
            data_depth: Cell::new(0),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Allocates a new heap entry with a reference count of one.
    ///
    /// `data` owns the references it holds. If allocation would exceed the
    /// configured limits those references are released and `Err(ResourceError)`
    /// is returned, so callers never need to clean up after a failed allocation.
    pub fn allocate(&mut self, data: HeapData) -> Result<HeapId, ResourceError> {
        if let Err(err) = self.tracker.on_allocate(|| data.estimate_size()) {
            let mut child_ids = Vec::new();
            data.push_child_ids(&mut child_ids);
            drop(data);
            for child_id in child_ids {
                self.dec_ref(child_id);
            }
            return Err(err);
        }
        let new_entry = HeapValue {
            refcount: Cell::new(1),
            data,
        };
        let id = if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(new_entry);
            id
        } else {
            self.entries.push(Some(new_entry));
            HeapId(self.entries.len() - 1)
        };
        Ok(id)
    }

    /// Increments the reference count for an existing heap entry.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn inc_ref(&self, id: HeapId) {
        let entry = self.entry(id);
        entry.refcount.set(entry.refcount.get() + 1);
    }

    /// Decrements the reference count and frees the value (plus children) once it hits zero.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn dec_ref(&mut self, id: HeapId) {
        let value = {
            let slot = self.entries.get_mut(id.index()).expect("Heap::dec_ref: slot missing");
            let entry = slot.as_ref().expect("Heap::dec_ref: object already freed");
            let count = entry.refcount.get();
            if count > 1 {
                entry.refcount.set(count - 1);
                return;
            }
            slot.take().expect("Heap::dec_ref: object already freed")
        };

        self.free_list.push(id);
        self.tracker.on_free(|| value.data.estimate_size());

        let mut child_ids = Vec::new();
        value.data.push_child_ids(&mut child_ids);
        drop(value);
        for child_id in child_ids {
            self.dec_ref(child_id);
        }
    }

    /// Returns an immutable reference to the heap data stored at the given ID.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    #[must_use]
    pub fn get(&self, id: HeapId) -> &HeapData {
        &self.entry(id).data
    }

    /// Returns a mutable reference to the heap data stored at the given ID.
    ///
    /// # Panics
    /// Panics if the value ID is invalid or the value has already been freed.
    pub fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self
            .entries
            .get_mut(id.index())
            .expect("Heap::get_mut: slot missing")
            .as_mut()
            .expect("Heap::get_mut: object already freed")
            .data
    }

    /// Returns the heap data if the slot is live, `None` when missing or freed.
    #[must_use]
    pub fn get_if_live(&self, id: HeapId) -> Option<&HeapData> {
        self.entries.get(id.index())?.as_ref().map(|entry| &entry.data)
    }

    /// Returns the current refcount for a live heap value, or 0 when freed.
    #[must_use]
    pub fn refcount(&self, id: HeapId) -> usize {
        self.entries
            .get(id.index())
            .and_then(Option::as_ref)
            .map_or(0, |entry| entry.refcount.get())
    }

    /// Captures object counts by type.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        let mut live_objects = 0;
        for entry in self.entries.iter().flatten() {
            live_objects += 1;
            *objects_by_type.entry(entry.data.variant_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects,
            free_slots: self.free_list.len(),
            objects_by_type,
        }
    }

    /// Enters one level of recursive data traversal.
    ///
    /// Every successful call must be paired with exactly one [`Self::data_depth_exit`]
    /// on every return path. On failure the depth is unchanged and `data_depth_exit`
    /// must not be called.
    pub fn data_depth_enter(&self) -> Result<(), ResourceError> {
        let depth = self.data_depth.get();
        let limit = self.tracker.max_data_depth();
        if depth >= limit {
            return Err(ResourceError::Recursion { limit, depth: depth + 1 });
        }
        self.data_depth.set(depth + 1);
        Ok(())
    }

    /// Leaves one level of recursive data traversal.
    pub fn data_depth_exit(&self) {
        let depth = self.data_depth.get();
        debug_assert!(depth > 0, "data_depth_exit without matching enter");
        self.data_depth.set(depth.saturating_sub(1));
    }

    /// Current nesting depth of recursive data operations (0 when idle).
    #[must_use]
    pub fn data_depth(&self) -> usize {
        self.data_depth.get()
    }

    /// Allocates a user class, returning it as a type-descriptor value.
    ///
    /// `base`, when given, must be another class value; the new class keeps a
    /// reference to it.
    pub fn new_class(&mut self, name: impl Into<String>, base: Option<&Value>) -> RunResult<Value> {
        let base_id = match base {
            None => None,
            Some(Value::Ref(id)) if matches!(self.get(*id), HeapData::Class(_)) => {
                self.inc_ref(*id);
                Some(*id)
            }
            Some(other) => {
                let type_name = other.type_name(self).to_owned();
                return Err(SimpleException::new_msg(
                    ExcType::TypeError,
                    format!("base must be a class, not '{type_name}'"),
                )
                .into());
            }
        };
        let id = self.allocate(HeapData::Class(Class::new(name.into(), base_id)))?;
        Ok(Value::Ref(id))
    }

    /// Allocates an instance of `class`, which must be a class value.
    pub fn new_instance(&mut self, class: &Value) -> RunResult<Value> {
        let Value::Ref(class_id) = class else {
            let type_name = class.type_name(self).to_owned();
            return Err(SimpleException::new_msg(
                ExcType::TypeError,
                format!("'{type_name}' object is not a user class"),
            )
            .into());
        };
        if !matches!(self.get(*class_id), HeapData::Class(_)) {
            let type_name = class.type_name(self).to_owned();
            return Err(SimpleException::new_msg(
                ExcType::TypeError,
                format!("'{type_name}' object is not a user class"),
            )
            .into());
        }
        self.inc_ref(*class_id);
        let id = self.allocate(HeapData::Instance(Instance::new(*class_id)))?;
        Ok(Value::Ref(id))
    }

    fn entry(&self, id: HeapId) -> &HeapValue {
        self.entries
            .get(id.index())
            .expect("Heap: slot missing")
            .as_ref()
            .expect("Heap: object already freed")
    }
}

/// Trait for types that hold heap references and must release them explicitly.
///
/// Every owned `Value::Ref` must be released with `drop_with_heap`; a missing
/// call on any branch leaks reference counts.
pub trait DropWithHeap<T: ResourceTracker> {
    /// Consume `self` and decrement reference counts for any heap-allocated values contained within.
    fn drop_with_heap(self, heap: &mut Heap<T>);
}

impl<T: ResourceTracker> DropWithHeap<T> for Value {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        Self::drop_with_heap(self, heap);
    }
}

impl<T: ResourceTracker, U: DropWithHeap<T>> DropWithHeap<T> for Option<U> {
    #[inline]
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        if let Some(value) = self {
            value.drop_with_heap(heap);
        }
    }
}

impl<T: ResourceTracker, U: DropWithHeap<T>> DropWithHeap<T> for Vec<U> {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        for value in self {
            value.drop_with_heap(heap);
        }
    }
}

impl<T: ResourceTracker> DropWithHeap<T> for (Value, Value) {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        let (key, value) = self;
        key.drop_with_heap(heap);
        value.drop_with_heap(heap);
    }
}
