use hashbrown::HashTable;

use crate::{
    exception::{RunError, RunResult},
    heap::{DropWithHeap, Heap, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Python dict type preserving insertion order.
///
/// # Storage Strategy
/// Uses a `HashTable<usize>` for hash lookups combined with a dense `Vec<DictEntry>`
/// to preserve insertion order. The hash table maps key hashes to indices in the
/// entries vector.
///
/// Key equality is supplied by the caller (`find_index`) because it needs the
/// full rich comparison machinery, which lives above this type.
#[derive(Debug, Default)]
pub struct Dict {
    /// indices mapping from the entry hash to its index.
    indices: HashTable<usize>,
    /// entries is a dense vec maintaining entry order.
    entries: Vec<DictEntry>,
}

#[derive(Debug)]
struct DictEntry {
    key: Value,
    value: Value,
    /// the hash is needed here for correct use of insert_unique
    hash: u64,
}

impl Dict {
    /// Creates a new empty dict.
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

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|entry| (&entry.key, &entry.value))
    }

    /// Iterates `(key, value, hash)` triples in insertion order.
    pub(crate) fn iter_with_hash(&self) -> impl Iterator<Item = (&Value, &Value, u64)> {
        self.entries.iter().map(|entry| (&entry.key, &entry.value, entry.hash))
    }

    /// Finds the entry whose key equals `key`.
    ///
    /// Identical keys match without calling `eq`; otherwise `eq` decides. An
    /// error from `eq` aborts the lookup.
    pub(crate) fn find_index(
        &self,
        key: &Value,
        hash: u64,
        eq: &mut impl FnMut(&Value, &Value) -> RunResult<bool>,
    ) -> RunResult<Option<usize>> {
        let mut error: Option<RunError> = None;
        let found = self.indices.find(hash, |&index| {
            let entry = &self.entries[index];
            if error.is_some() || entry.hash != hash {
                return false;
            }
            if entry.key.is_identical(key) {
                return true;
            }
            match eq(&entry.key, key) {
                Ok(equal) => equal,
                Err(err) => {
                    error = Some(err);
                    false
                }
            }
        });
        match error {
            Some(err) => Err(err),
            None => Ok(found.copied()),
        }
    }

    /// Looks up the value stored under `key`.
    pub(crate) fn get_with_hash(
        &self,
        key: &Value,
        hash: u64,
        eq: &mut impl FnMut(&Value, &Value) -> RunResult<bool>,
    ) -> RunResult<Option<&Value>> {
        Ok(self
            .find_index(key, hash, eq)?
            .map(|index| &self.entries[index].value))
    }

    /// Appends an entry whose key is known not to be present.
    ///
    /// Takes ownership of both references.
    pub(crate) fn push_unique(&mut self, key: Value, value: Value, hash: u64) {
        let index = self.entries.len();
        self.entries.push(DictEntry { key, value, hash });
        let entries = &self.entries;
        self.indices.insert_unique(hash, index, |&i| entries[i].hash);
    }

    /// Replaces the value at `index`, returning the old one for the caller to release.
    pub(crate) fn replace_value(&mut self, index: usize, value: Value) -> Value {
        std::mem::replace(&mut self.entries[index].value, value)
    }

    pub(crate) fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        for entry in &self.entries {
            out.extend(entry.key.ref_id());
            out.extend(entry.value.ref_id());
        }
    }
}

impl<T: ResourceTracker> DropWithHeap<T> for Dict {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        for entry in self.entries {
            entry.key.drop_with_heap(heap);
            entry.value.drop_with_heap(heap);
        }
    }
}
