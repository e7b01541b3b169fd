use crate::{
    heap::{DropWithHeap, Heap, HeapId},
    resource::ResourceTracker,
    value::Value,
};

/// Python `slice`: an immutable `(start, stop, step)` triple of arbitrary values.
#[derive(Debug)]
pub struct Slice {
    /// start, stop, step
    parts: [Value; 3],
}

impl Slice {
    /// Takes ownership of the three values.
    #[must_use]
    pub fn new(start: Value, stop: Value, step: Value) -> Self {
        Self {
            parts: [start, stop, step],
        }
    }

    #[must_use]
    pub fn start(&self) -> &Value {
        &self.parts[0]
    }

    #[must_use]
    pub fn stop(&self) -> &Value {
        &self.parts[1]
    }

    #[must_use]
    pub fn step(&self) -> &Value {
        &self.parts[2]
    }

    /// The three parts in order; slices compare like this tuple.
    #[must_use]
    pub fn parts(&self) -> &[Value] {
        &self.parts
    }

    pub(crate) fn push_child_ids(&self, out: &mut Vec<HeapId>) {
        out.extend(self.parts.iter().filter_map(Value::ref_id));
    }
}

impl<T: ResourceTracker> DropWithHeap<T> for Slice {
    fn drop_with_heap(self, heap: &mut Heap<T>) {
        let [start, stop, step] = self.parts;
        start.drop_with_heap(heap);
        stop.drop_with_heap(heap);
        step.drop_with_heap(heap);
    }
}
