use crate::{
    heap::{DropWithHeap, Heap, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Python `list`: a mutable sequence.
#[derive(Debug, Default)]
pub struct List(Vec<Value>);

impl List {
    /// Takes ownership of `items`; their references now belong to the list.
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self(items)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends `item`, taking ownership of its reference.
    pub fn push(&mut self, item: Value) {
        self.0.push(item);
    }

    /// Replaces the item at `index`, returning the previous one for the caller to release.
    pub fn replace(&mut self, index: usize, item: Value) -> Option<Value> {
        self.0.get_mut(index).map(|slot| std::mem::replace(slot, item))
    }

    pub(crate) fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        out.extend(self.0.iter().filter_map(Value::ref_id));
    }
}

impl<T: ResourceTracker> DropWithHeap<T> for List {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        self.0.drop_with_heap(heap);
    }
}
