use crate::{
    heap::{DropWithHeap, Heap, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Python `tuple`: an immutable sequence.
#[derive(Debug, Default)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    /// Takes ownership of `items`; their references now belong to the tuple.
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

    pub(crate) fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        out.extend(self.0.iter().filter_map(Value::ref_id));
    }
}

impl<T: ResourceTracker> DropWithHeap<T> for Tuple {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        self.0.drop_with_heap(heap);
    }
}
