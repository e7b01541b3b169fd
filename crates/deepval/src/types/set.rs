use hashbrown::HashTable;

use crate::{
    exception::{RunError, RunResult},
    heap::{DropWithHeap, Heap, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Python `set`: a mutable collection of unique hashable values.
///
/// Same storage layout as [`Dict`](super::Dict): a hash index over a dense,
/// insertion-ordered entry vector.
#[derive(Debug, Default)]
pub struct Set {
    indices: HashTable<usize>,
    entries: Vec<SetEntry>,
}

#[derive(Debug)]
struct SetEntry {
    value: Value,
    hash: u64,
}

impl Set {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: HashTable::with_capacity(capacity),
            entries: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|entry| &entry.value)
    }

    pub(crate) fn iter_with_hash(&self) -> impl Iterator<Item = (&Value, u64)> {
        self.entries.iter().map(|entry| (&entry.value, entry.hash))
    }

    /// Returns whether an element equal to `value` is present.
    ///
    /// Identical elements match without calling `eq`.
    pub(crate) fn contains_hashed(
        &self,
        value: &Value,
        hash: u64,
        eq: &mut impl FnMut(&Value, &Value) -> RunResult<bool>,
    ) -> RunResult<bool> {
        let mut error: Option<RunError> = None;
        let found = self.indices.find(hash, |&index| {
            let entry = &self.entries[index];
            if error.is_some() || entry.hash != hash {
                return false;
            }
            if entry.value.is_identical(value) {
                return true;
            }
            match eq(&entry.value, value) {
                Ok(equal) => equal,
                Err(err) => {
                    error = Some(err);
                    false
                }
            }
        });
        match error {
            Some(err) => Err(err),
            None => Ok(found.is_some()),
        }
    }

    /// Appends an element known not to be present, taking ownership of its reference.
    pub(crate) fn push_unique(&mut self, value: Value, hash: u64) {
        let index = self.entries.len();
        self.entries.push(SetEntry { value, hash });
        let entries = &self.entries;
        self.indices.insert_unique(hash, index, |&i| entries[i].hash);
    }

    pub(crate) fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        out.extend(self.entries.iter().filter_map(|entry| entry.value.ref_id()));
    }
}

impl<T: ResourceTracker> DropWithHeap<T> for Set {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        for entry in self.entries {
            entry.value.drop_with_heap(heap);
        }
    }
}
