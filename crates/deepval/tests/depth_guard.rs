/// Tests for the data depth guard.
///
/// Copy, hash and compare recurse once per nested container. The guard turns
/// nesting beyond the configured limit into a `RecursionError` instead of a
/// stack overflow, and leaves the depth counter at zero afterwards.
use deepval::{
    CompareOp, Engine, ExcType, Heap, LimitedTracker, Object, RecordingTracer, ResourceLimits, TraceEvent, Value,
};
use pretty_assertions::assert_eq;

const LIMIT: usize = 10;

fn limited_heap() -> Heap<LimitedTracker> {
    Heap::new(64, LimitedTracker::new(ResourceLimits::new().max_data_depth(LIMIT)))
}

/// `levels` lists wrapped around a single integer.
fn nested_list(levels: usize) -> Object {
    let mut object = Object::Int(42);
    for _ in 0..levels {
        object = Object::List(vec![object]);
    }
    object
}

fn nested_dict(levels: usize) -> Object {
    let mut object = Object::Dict(vec![(Object::str("leaf"), Object::Int(1))]);
    for _ in 1..levels {
        object = Object::Dict(vec![(Object::str("nested"), object)]);
    }
    object
}

fn build(heap: &mut Heap<LimitedTracker>, object: &Object) -> Value {
    object.to_value(heap).unwrap()
}

#[test]
fn copy_within_limit_succeeds() {
    let mut heap = limited_heap();
    let value = build(&mut heap, &nested_list(LIMIT));
    let copy = Engine::new(&mut heap).deep_copy(&value).unwrap();
    assert_eq!(Object::from_value(&copy, &heap), nested_list(LIMIT));
    assert_eq!(heap.data_depth(), 0);
    copy.drop_with_heap(&mut heap);
    value.drop_with_heap(&mut heap);
}

#[test]
fn copy_beyond_limit_raises_recursion_error() {
    let mut heap = limited_heap();
    let value = build(&mut heap, &nested_list(LIMIT * 2));
    let live = heap.stats().live_objects;

    let mut engine = Engine::new(&mut heap).with_tracer(RecordingTracer::new());
    let err = engine.deep_copy(&value).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RecursionError);
    assert_eq!(engine.into_tracer().into_events(), vec![TraceEvent::DepthExceeded { limit: LIMIT }]);

    assert_eq!(heap.data_depth(), 0);
    assert_eq!(heap.stats().live_objects, live);
    value.drop_with_heap(&mut heap);
}

#[test]
fn copy_of_nested_dict_beyond_limit_raises_recursion_error() {
    let mut heap = limited_heap();
    let value = build(&mut heap, &nested_dict(LIMIT + 1));
    let err = Engine::new(&mut heap).deep_copy(&value).unwrap_err();
    assert!(err.matches(ExcType::RecursionError));
    assert_eq!(heap.data_depth(), 0);
    value.drop_with_heap(&mut heap);
}

#[cfg(feature = "deep-hash")]
#[test]
fn hash_beyond_limit_raises_recursion_error() {
    let mut heap = limited_heap();
    let shallow = build(&mut heap, &nested_dict(LIMIT));
    let deep = build(&mut heap, &nested_dict(LIMIT + 1));

    let mut engine = Engine::new(&mut heap);
    assert!(engine.deep_hash(&shallow).is_ok());
    let err = engine.deep_hash(&deep).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RecursionError);

    assert_eq!(heap.data_depth(), 0);
    shallow.drop_with_heap(&mut heap);
    deep.drop_with_heap(&mut heap);
}

#[test]
fn compare_beyond_limit_raises_recursion_error() {
    let mut heap = limited_heap();
    let a = build(&mut heap, &nested_list(LIMIT * 2));
    let b = build(&mut heap, &nested_list(LIMIT * 2));

    let err = Engine::new(&mut heap).rich_compare(&a, &b, CompareOp::Eq).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RecursionError);
    assert_eq!(
        err.to_string(),
        "RecursionError: maximum recursion depth exceeded in comparison"
    );
    assert_eq!(heap.data_depth(), 0);

    a.drop_with_heap(&mut heap);
    b.drop_with_heap(&mut heap);
}

#[test]
fn compare_within_limit_succeeds() {
    let mut heap = limited_heap();
    let a = build(&mut heap, &nested_list(LIMIT - 1));
    let b = build(&mut heap, &nested_list(LIMIT - 1));

    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&a, &b, CompareOp::Eq).unwrap());
    assert!(!engine.rich_compare(&a, &b, CompareOp::Lt).unwrap());
    assert_eq!(heap.data_depth(), 0);

    a.drop_with_heap(&mut heap);
    b.drop_with_heap(&mut heap);
}

/// The guard is a counter, not a flag: after a refusal the heap is usable again.
#[test]
fn guard_recovers_after_refusal() {
    let mut heap = limited_heap();
    let deep = build(&mut heap, &nested_list(LIMIT * 3));
    let shallow = build(&mut heap, &nested_list(2));

    let mut engine = Engine::new(&mut heap);
    assert!(engine.deep_copy(&deep).is_err());
    let copy = engine.deep_copy(&shallow).unwrap();
    assert!(engine.rich_compare(&copy, &shallow, CompareOp::Eq).unwrap());

    for value in [copy, shallow, deep] {
        value.drop_with_heap(&mut heap);
    }
    assert_eq!(heap.stats().live_objects, 0);
}

/// The outermost level of `rich_compare_norecurse` is not counted, so it
/// reaches one level deeper than `rich_compare` under the same limit.
#[test]
fn norecurse_skips_outermost_level() {
    let mut heap = Heap::new(16, LimitedTracker::new(ResourceLimits::new().max_data_depth(1)));
    let a = build(&mut heap, &nested_list(2));
    let b = build(&mut heap, &nested_list(2));

    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare_norecurse(&a, &b, CompareOp::Eq).unwrap());
    let err = engine.rich_compare(&a, &b, CompareOp::Eq).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::RecursionError);
    assert_eq!(heap.data_depth(), 0);

    a.drop_with_heap(&mut heap);
    b.drop_with_heap(&mut heap);
}
