//! Tests for `Engine::deep_copy`.
//!
//! A copy must be structurally equal to its source while sharing none of its
//! mutable containers, share every immutable leaf, and leave nothing behind on
//! the heap when it fails halfway through.

use deepval::{
    CompareOp, DropWithHeap, Engine, ExcType, Heap, HeapData, LimitedTracker, NoLimitTracker, Object,
    RecordingTracer, ResourceLimits, TraceEvent, Type, Value, types::List,
};
use pretty_assertions::assert_eq;

fn ints(values: &[i64]) -> Object {
    Object::List(values.iter().copied().map(Object::Int).collect())
}

/// First value stored in a dict.
fn first_dict_value(heap: &Heap<NoLimitTracker>, value: &Value) -> Value {
    let HeapData::Dict(dict) = heap.get(value.ref_id().unwrap()) else {
        panic!("expected a dict");
    };
    dict.iter().next().unwrap().1.clone_with_heap(heap)
}

// =============================================================================
// 1. Independence
// =============================================================================

/// Mutating the list inside a copied dict leaves the source untouched.
#[test]
fn copied_dict_of_list_is_independent() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let source = Object::Dict(vec![(Object::str("x"), ints(&[1, 2, 3]))]);
    let original = source.to_value(&mut heap).unwrap();

    let copy = Engine::new(&mut heap).deep_copy(&original).unwrap();
    assert!(!copy.is_identical(&original));

    let copied_list = first_dict_value(&heap, &copy);
    let original_list = first_dict_value(&heap, &original);
    assert!(!copied_list.is_identical(&original_list));

    let HeapData::List(list) = heap.get_mut(copied_list.ref_id().unwrap()) else {
        panic!("expected a list");
    };
    list.push(Value::Int(4));

    assert_eq!(Object::from_value(&original, &heap), source);
    assert_eq!(
        Object::from_value(&copy, &heap),
        Object::Dict(vec![(Object::str("x"), ints(&[1, 2, 3, 4]))])
    );

    for value in [copied_list, original_list, copy, original] {
        value.drop_with_heap(&mut heap);
    }
    assert_eq!(heap.stats().live_objects, 0);
}

/// Dict keys and set elements are hashable and therefore shared, not rebuilt.
#[test]
fn keys_and_set_elements_are_shared() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let original = Object::Dict(vec![(
        Object::str("key"),
        Object::Set(vec![Object::str("member"), Object::Tuple(vec![Object::Int(1)])]),
    )])
    .to_value(&mut heap)
    .unwrap();

    let copy = Engine::new(&mut heap).deep_copy(&original).unwrap();

    let keys = |value: &Value| match heap.get(value.ref_id().unwrap()) {
        HeapData::Dict(dict) => dict.iter().map(|(k, _)| k.identity()).collect::<Vec<_>>(),
        _ => panic!("expected a dict"),
    };
    assert_eq!(keys(&copy), keys(&original));

    let copied_set = first_dict_value(&heap, &copy);
    let original_set = first_dict_value(&heap, &original);
    assert!(!copied_set.is_identical(&original_set));
    let elements = |value: &Value| match heap.get(value.ref_id().unwrap()) {
        HeapData::Set(set) => set.iter().map(Value::identity).collect::<Vec<_>>(),
        _ => panic!("expected a set"),
    };
    assert_eq!(elements(&copied_set), elements(&original_set));

    for value in [copied_set, original_set, copy, original] {
        value.drop_with_heap(&mut heap);
    }
    assert_eq!(heap.stats().live_objects, 0);
}

/// Immutable leaves come back as the very same object.
#[test]
fn leaves_are_shared() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let leaves = [
        Object::str("text"),
        Object::Bytes(b"raw".to_vec()),
        Object::BigInt(num_bigint::BigInt::from(i64::MAX) * 4),
        Object::Complex { re: 1.0, im: 2.0 },
        Object::Range { start: 0, stop: 10, step: 2 },
        Object::slice(Some(1), None, None),
        Object::Type(Type::Dict),
        Object::Float(0.5),
        Object::None,
        Object::Ellipsis,
    ];
    for leaf in leaves {
        let value = leaf.to_value(&mut heap).unwrap();
        let copy = Engine::new(&mut heap).deep_copy(&value).unwrap();
        assert!(copy.is_identical(&value), "{leaf} should be shared");
        (copy, value).drop_with_heap(&mut heap);
    }
    assert_eq!(heap.stats().live_objects, 0);
}

// =============================================================================
// 2. Laws
// =============================================================================

/// A copy is equal to its source, and copying a copy gives an equal value.
#[test]
fn copy_is_equal_and_idempotent() {
    let mut heap = Heap::new(32, NoLimitTracker);
    let source = Object::Tuple(vec![
        ints(&[1, 2]),
        Object::Dict(vec![(Object::Int(1), Object::Tuple(vec![Object::None, ints(&[])]))]),
        Object::Set(vec![Object::Float(2.5)]),
    ]);
    let original = source.to_value(&mut heap).unwrap();

    let mut engine = Engine::new(&mut heap);
    let copy = engine.deep_copy(&original).unwrap();
    let copy_of_copy = engine.deep_copy(&copy).unwrap();
    assert!(engine.rich_compare(&original, &copy, CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&copy, &copy_of_copy, CompareOp::Eq).unwrap());

    assert_eq!(Object::new(copy_of_copy, &mut heap), source);
    assert_eq!(Object::new(copy, &mut heap), source);
    original.drop_with_heap(&mut heap);
    assert_eq!(heap.stats().live_objects, 0);
}

/// Immediates copy to themselves.
#[test]
fn immediates_copy_to_themselves() {
    let mut heap = Heap::new(4, NoLimitTracker);
    let mut engine = Engine::new(&mut heap);
    for value in [Value::Int(-3), Value::Bool(true), Value::Float(f64::NAN), Value::None] {
        let copy = engine.deep_copy(&value).unwrap();
        assert!(copy.is_identical(&value));
    }
}

// =============================================================================
// 3. Failures
// =============================================================================

/// Instances of user classes have no structural copy.
#[test]
fn instance_is_unsupported() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let class = heap.new_class("Widget", None).unwrap();
    let instance = heap.new_instance(&class).unwrap();
    let id = heap
        .allocate(HeapData::List(List::new(vec![Value::Int(1), instance])))
        .unwrap();
    let list = Value::Ref(id);
    let before = heap.stats();

    let err = Engine::new(&mut heap).deep_copy(&list).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::UnsupportedTypeError);
    assert!(err.matches(ExcType::TypeError));
    assert_eq!(err.to_string(), "UnsupportedTypeError: deep_copy does not implement: Widget");
    assert_eq!(heap.stats(), before);

    (list, class).drop_with_heap(&mut heap);
    assert_eq!(heap.stats().live_objects, 0);
}

/// An allocation refused partway through releases every container copied so far.
#[test]
fn refused_allocation_releases_partial_copy() {
    let limits = ResourceLimits::new().max_allocations(6);
    let mut heap = Heap::new(16, LimitedTracker::new(limits));
    let original = Object::List(vec![ints(&[1]), ints(&[2]), ints(&[3])])
        .to_value(&mut heap)
        .unwrap();
    assert_eq!(heap.stats().live_objects, 4);

    // two inner lists fit under the limit, the third does not
    let err = Engine::new(&mut heap).deep_copy(&original).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert_eq!(heap.stats().live_objects, 4);

    original.drop_with_heap(&mut heap);
    assert_eq!(heap.stats().live_objects, 0);
}

// =============================================================================
// 4. Tracing
// =============================================================================

/// Containers are reported innermost first with the depth they were copied at.
#[test]
fn tracer_records_copied_containers() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let original = Object::Dict(vec![(Object::str("a"), ints(&[1, 2]))])
        .to_value(&mut heap)
        .unwrap();

    let mut engine = Engine::new(&mut heap).with_tracer(RecordingTracer::new());
    let copy = engine.deep_copy(&original).unwrap();
    let events = engine.into_tracer().into_events();
    assert_eq!(
        events,
        vec![
            TraceEvent::Copy {
                ty: Type::List,
                len: 2,
                depth: 2,
            },
            TraceEvent::Copy {
                ty: Type::Dict,
                len: 1,
                depth: 1,
            },
        ]
    );

    (copy, original).drop_with_heap(&mut heap);
}
