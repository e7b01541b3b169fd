//! Tests for rich comparison and the ordering fallback.

use deepval::{
    CompareMode, CompareOp, Engine, ExcType, FallbackRule, Heap, NoLimitTracker, Object, RecordingTracer, TraceEvent,
    Type, Value,
};
use pretty_assertions::assert_eq;

const ALL_OPS: [CompareOp; 6] = [
    CompareOp::Lt,
    CompareOp::Le,
    CompareOp::Eq,
    CompareOp::Ne,
    CompareOp::Gt,
    CompareOp::Ge,
];

fn values(heap: &mut Heap<NoLimitTracker>, objects: &[Object]) -> Vec<Value> {
    objects.iter().map(|object| object.to_value(heap).unwrap()).collect()
}

fn release(heap: &mut Heap<NoLimitTracker>, values: Vec<Value>) {
    for value in values {
        value.drop_with_heap(heap);
    }
}

// =============================================================================
// 1. Ordering fallback, total mode
// =============================================================================

#[test]
fn int_orders_before_str() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(&mut heap, &[Object::Int(42), Object::str("hello")]);

    let mut engine = Engine::new(&mut heap).with_tracer(RecordingTracer::new());
    assert!(engine.ordering_fallback(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    assert!(!engine.rich_compare(&operands[1], &operands[0], CompareOp::Lt).unwrap());
    let events = engine.into_tracer().into_events();
    assert_eq!(
        events[0],
        TraceEvent::Fallback {
            op: CompareOp::Lt,
            rule: FallbackRule::NumericFirst,
            result: true,
        }
    );

    release(&mut heap, operands);
}

#[test]
fn none_orders_first() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[Object::None, Object::Int(-1_000), Object::Float(f64::NEG_INFINITY), Object::str("")],
    );
    let mut engine = Engine::new(&mut heap);
    for other in &operands[1..] {
        assert!(engine.rich_compare(&operands[0], other, CompareOp::Lt).unwrap());
        assert!(engine.rich_compare(other, &operands[0], CompareOp::Gt).unwrap());
    }
    release(&mut heap, operands);
}

/// Values of unrelated types order by type name: "dict" < "list" < "str" < "tuple".
#[test]
fn unrelated_types_order_by_name() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Dict(vec![]),
            Object::List(vec![]),
            Object::str("z"),
            Object::Tuple(vec![]),
        ],
    );
    let mut engine = Engine::new(&mut heap);
    for pair in operands.windows(2) {
        assert!(engine.rich_compare(&pair[0], &pair[1], CompareOp::Lt).unwrap());
    }
    release(&mut heap, operands);
}

/// Every pair of values is related by exactly one of `<`, `==`, `>`, and the
/// relation is consistent when the operands swap.
#[test]
fn fallback_order_is_total_and_antisymmetric() {
    let mut heap = Heap::new(32, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::None,
            Object::Ellipsis,
            Object::Bool(true),
            Object::Int(7),
            Object::Float(2.5),
            Object::Complex { re: 1.0, im: 1.0 },
            Object::str("s"),
            Object::Bytes(b"b".to_vec()),
            Object::List(vec![]),
            Object::Dict(vec![]),
            Object::Set(vec![]),
            Object::Range { start: 0, stop: 1, step: 1 },
            Object::Type(Type::Float),
        ],
    );
    let mut engine = Engine::new(&mut heap);
    for a in &operands {
        for b in &operands {
            let lt = engine.ordering_fallback(a, b, CompareOp::Lt).unwrap();
            let eq = engine.ordering_fallback(a, b, CompareOp::Eq).unwrap();
            let gt = engine.ordering_fallback(a, b, CompareOp::Gt).unwrap();
            assert_eq!(u8::from(lt) + u8::from(eq) + u8::from(gt), 1);
            assert_eq!(engine.ordering_fallback(b, a, CompareOp::Gt).unwrap(), lt);
            assert_eq!(eq, a.is_identical(b));
        }
    }
    release(&mut heap, operands);
}

/// Distinct objects of one type that define no order are ordered by identity,
/// and the order does not change while they live.
#[test]
fn same_type_orders_by_identity() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let class = heap.new_class("Node", None).unwrap();
    let first = heap.new_instance(&class).unwrap();
    let second = heap.new_instance(&class).unwrap();

    let mut engine = Engine::new(&mut heap);
    let lt = engine.rich_compare(&first, &second, CompareOp::Lt).unwrap();
    assert_eq!(engine.rich_compare(&second, &first, CompareOp::Gt).unwrap(), lt);
    assert_eq!(engine.rich_compare(&first, &second, CompareOp::Lt).unwrap(), lt);
    assert!(!engine.rich_compare(&first, &second, CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&first, &first, CompareOp::Eq).unwrap());

    release(&mut heap, vec![first, second, class]);
}

/// The engine hands out its mode, heap and tracer between operations.
#[test]
fn engine_exposes_mode_heap_and_tracer() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(&mut heap, &[Object::Int(1), Object::List(vec![Object::str("a")])]);

    let mut engine = Engine::new(&mut heap).with_tracer(RecordingTracer::new());
    assert_eq!(engine.mode(), CompareMode::Total);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    assert_eq!(engine.tracer().event_count(), 1);

    let live = engine.heap().stats().live_objects;
    let copy = engine.deep_copy(&operands[1]).unwrap();
    assert_eq!(engine.heap().stats().live_objects, live + 1);
    copy.drop_with_heap(engine.heap_mut());
    assert_eq!(engine.heap().stats().live_objects, live);

    let engine = engine.with_mode(CompareMode::Strict);
    assert_eq!(engine.mode(), CompareMode::Strict);
    assert_eq!(
        engine.into_tracer().events()[0],
        TraceEvent::Fallback {
            op: CompareOp::Lt,
            rule: FallbackRule::NumericFirst,
            result: true,
        }
    );
    release(&mut heap, operands);
}

// =============================================================================
// 2. Strict mode
// =============================================================================

#[test]
fn strict_mode_rejects_cross_type_ordering() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(&mut heap, &[Object::Int(42), Object::str("hello")]);

    let mut engine = Engine::new(&mut heap).with_mode(CompareMode::Strict);
    let err = engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(
        err.to_string(),
        "TypeError: '<' not supported between instances of 'int' and 'str'"
    );
    assert!(!engine.rich_compare(&operands[0], &operands[1], CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Ne).unwrap());

    release(&mut heap, operands);
}

#[test]
fn strict_mode_still_uses_slots() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::List(vec![Object::Int(1), Object::str("a")]),
            Object::List(vec![Object::Int(1), Object::str("b")]),
        ],
    );
    let mut engine = Engine::new(&mut heap).with_mode(CompareMode::Strict);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    assert!(engine.rich_compare(&Value::Int(1), &Value::Float(1.5), CompareOp::Le).unwrap());
    release(&mut heap, operands);
}

/// Dicts only order by content in total mode.
#[test]
fn strict_mode_has_no_dict_order() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Dict(vec![(Object::Int(1), Object::str("a"))]),
            Object::Dict(vec![(Object::Int(1), Object::str("b"))]),
        ],
    );
    let mut engine = Engine::new(&mut heap).with_mode(CompareMode::Strict);
    let err = engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap_err();
    assert_eq!(
        err.to_string(),
        "TypeError: '<' not supported between instances of 'dict' and 'dict'"
    );
    assert!(!engine.rich_compare(&operands[0], &operands[1], CompareOp::Eq).unwrap());
    release(&mut heap, operands);
}

// =============================================================================
// 3. Comparison slots
// =============================================================================

#[test]
fn numbers_compare_exactly_across_types() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let big = Object::BigInt(num_bigint::BigInt::from(2).pow(64));
    let operands = values(&mut heap, &[big]);
    let mut engine = Engine::new(&mut heap);

    assert!(engine.rich_compare(&Value::Int(1), &Value::Float(1.0), CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&Value::Bool(true), &Value::Int(1), CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&Value::Bool(false), &Value::Float(0.5), CompareOp::Lt).unwrap());
    // 2**53 + 1 is not representable as a float
    let odd = Value::Int((1 << 53) + 1);
    assert!(engine.rich_compare(&odd, &Value::Float(9_007_199_254_740_992.0), CompareOp::Gt).unwrap());
    assert!(engine.rich_compare(&operands[0], &Value::Float(1.8446744073709552e19), CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&operands[0], &Value::Int(i64::MAX), CompareOp::Gt).unwrap());

    release(&mut heap, operands);
}

#[test]
fn nan_is_only_unequal() {
    let mut heap = Heap::new(4, NoLimitTracker);
    let mut engine = Engine::new(&mut heap);
    let nan = Value::Float(f64::NAN);
    for op in ALL_OPS {
        let result = engine.rich_compare(&nan, &Value::Int(0), op).unwrap();
        assert_eq!(result, op == CompareOp::Ne, "nan {op} 0");
    }
}

#[test]
fn sequences_compare_lexicographically() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Tuple(vec![Object::Int(1), Object::Int(2)]),
            Object::Tuple(vec![Object::Int(1), Object::Int(2), Object::Int(0)]),
            Object::Tuple(vec![Object::Int(1), Object::Int(3)]),
            Object::str("apple"),
            Object::str("banana"),
        ],
    );
    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    assert!(engine.rich_compare(&operands[1], &operands[2], CompareOp::Lt).unwrap());
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Ne).unwrap());
    assert!(engine.rich_compare(&operands[3], &operands[4], CompareOp::Lt).unwrap());
    release(&mut heap, operands);
}

#[test]
fn dicts_are_equal_regardless_of_order() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Dict(vec![(Object::Int(1), Object::str("a")), (Object::Int(2), Object::str("b"))]),
            Object::Dict(vec![(Object::Float(2.0), Object::str("b")), (Object::Int(1), Object::str("a"))]),
            Object::Dict(vec![(Object::Int(1), Object::str("a")), (Object::Int(2), Object::str("c"))]),
        ],
    );
    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&operands[0], &operands[2], CompareOp::Ne).unwrap());
    release(&mut heap, operands);
}

#[test]
fn sets_compare_by_inclusion() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Set(vec![Object::Int(1)]),
            Object::Set(vec![Object::Int(2), Object::Int(1)]),
            Object::Set(vec![Object::Int(1), Object::Int(2)]),
        ],
    );
    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    assert!(engine.rich_compare(&operands[1], &operands[2], CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&operands[1], &operands[2], CompareOp::Ge).unwrap());
    assert!(!engine.rich_compare(&operands[1], &operands[2], CompareOp::Gt).unwrap());
    release(&mut heap, operands);
}

#[test]
fn ranges_compare_by_sequence() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Range { start: 0, stop: 3, step: 2 },
            Object::Range { start: 0, stop: 4, step: 2 },
            Object::Range { start: 5, stop: 5, step: 1 },
            Object::Range { start: 9, stop: 0, step: 1 },
        ],
    );
    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&operands[2], &operands[3], CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&operands[0], &operands[2], CompareOp::Ne).unwrap());
    for (a, b) in [(0, 1), (2, 3)] {
        assert!(!engine.rich_compare(&operands[a], &operands[b], CompareOp::Lt).unwrap());
        assert!(!engine.rich_compare(&operands[a], &operands[b], CompareOp::Gt).unwrap());
        assert!(engine.rich_compare(&operands[a], &operands[b], CompareOp::Le).unwrap());
    }
    release(&mut heap, operands);
}

#[test]
fn ranges_order_as_their_elements() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Range { start: 5, stop: 5, step: 1 },
            Object::Range { start: -9, stop: 0, step: 1 },
            Object::Range { start: 0, stop: 1, step: 1 },
            Object::Range { start: 0, stop: 3, step: 1 },
            Object::Range { start: 0, stop: 3, step: 2 },
            Object::Range { start: 1, stop: 0, step: -1 },
        ],
    );
    let mut engine = Engine::new(&mut heap);
    // [] < [-9, ...] < [0] < [0, 1, 2] < [0, 2] < [1]
    for pair in operands.windows(2) {
        assert!(engine.rich_compare(&pair[0], &pair[1], CompareOp::Lt).unwrap());
        assert!(!engine.rich_compare(&pair[1], &pair[0], CompareOp::Le).unwrap());
    }
    release(&mut heap, operands);
}

/// Dicts order by size, then by the smallest key on which they differ, then
/// by the values under those keys.
#[test]
fn dicts_order_by_content() {
    let mut heap = Heap::new(32, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Dict(vec![(Object::Int(1), Object::str("a"))]),
            Object::Dict(vec![(Object::Int(2), Object::str("b")), (Object::Int(1), Object::str("a"))]),
            Object::Dict(vec![(Object::Int(1), Object::str("a")), (Object::Int(2), Object::str("c"))]),
            Object::Dict(vec![(Object::Int(1), Object::str("b")), (Object::Int(2), Object::str("a"))]),
            Object::Dict(vec![(Object::Int(1), Object::str("a")), (Object::Int(3), Object::str("a"))]),
        ],
    );
    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap());
    // smallest differing key is 2 on both sides, then "b" < "c"
    assert!(engine.rich_compare(&operands[1], &operands[2], CompareOp::Lt).unwrap());
    // smallest differing key is 1 on both sides, then "a" < "b"
    assert!(engine.rich_compare(&operands[2], &operands[3], CompareOp::Lt).unwrap());
    // 3 against 2
    assert!(engine.rich_compare(&operands[4], &operands[2], CompareOp::Gt).unwrap());
    assert!(engine.rich_compare(&operands[4], &operands[4], CompareOp::Ge).unwrap());
    release(&mut heap, operands);
}

#[test]
fn complex_numbers_have_no_order() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let operands = values(
        &mut heap,
        &[
            Object::Complex { re: 2.0, im: 0.0 },
            Object::Complex { re: 2.0, im: 0.0 },
            Object::str("x"),
        ],
    );
    let two = Value::Int(2);
    let mut engine = Engine::new(&mut heap);
    assert!(engine.rich_compare(&operands[0], &operands[1], CompareOp::Eq).unwrap());
    let err = engine.rich_compare(&operands[0], &operands[1], CompareOp::Lt).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
    assert_eq!(err.to_string(), "TypeError: no ordering relation is defined for complex numbers");

    assert!(engine.rich_compare(&operands[0], &two, CompareOp::Eq).unwrap());
    let err = engine.rich_compare(&two, &operands[0], CompareOp::Ge).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);

    // not both numbers, so the fallback decides: numbers first
    assert!(engine.rich_compare(&operands[0], &operands[2], CompareOp::Lt).unwrap());
    assert_eq!(heap.data_depth(), 0);
    release(&mut heap, operands);
}

/// Every pair of distinct but possibly equal values is related by exactly one
/// of `<`, `==`, `>`, and the answer flips with the operands.
#[test]
fn rich_compare_is_total_over_equal_values() {
    let objects = [
        Object::None,
        Object::Int(7),
        Object::Float(2.5),
        Object::BigInt(num_bigint::BigInt::from(i64::MAX) * 3),
        Object::str("s"),
        Object::Bytes(b"b".to_vec()),
        Object::List(vec![Object::Int(1), Object::str("a")]),
        Object::Tuple(vec![Object::Int(1)]),
        Object::Dict(vec![]),
        Object::Dict(vec![(Object::Int(1), Object::str("a"))]),
        Object::Dict(vec![(Object::Int(1), Object::str("b"))]),
        Object::Dict(vec![(Object::Int(2), Object::str("a"))]),
        Object::Dict(vec![(Object::Int(1), Object::str("a")), (Object::Int(2), Object::str("b"))]),
        Object::Range { start: 5, stop: 5, step: 1 },
        Object::Range { start: 0, stop: 3, step: 1 },
        Object::Range { start: 0, stop: 3, step: 2 },
        Object::Range { start: 1, stop: 3, step: 1 },
        Object::slice(Some(1), None, None),
        Object::slice(Some(1), Some(2), None),
        Object::Set(vec![Object::Int(1)]),
        Object::Type(Type::Float),
    ];
    let mut heap = Heap::new(128, NoLimitTracker);
    let left = values(&mut heap, &objects);
    let right = values(&mut heap, &objects);

    let mut engine = Engine::new(&mut heap);
    for (i, a) in left.iter().enumerate() {
        for (j, b) in right.iter().enumerate() {
            let lt = engine.rich_compare(a, b, CompareOp::Lt).unwrap();
            let eq = engine.rich_compare(a, b, CompareOp::Eq).unwrap();
            let gt = engine.rich_compare(a, b, CompareOp::Gt).unwrap();
            let pair = format!("{} against {}", objects[i], objects[j]);
            assert_eq!(u8::from(lt) + u8::from(eq) + u8::from(gt), 1, "{pair}");
            assert_eq!(eq, i == j, "{pair}");
            assert_eq!(engine.rich_compare(b, a, CompareOp::Gt).unwrap(), lt, "{pair}");
        }
    }
    assert_eq!(heap.data_depth(), 0);
    release(&mut heap, left);
    release(&mut heap, right);
}

/// A subclass operand gets the first chance to decide, with the operator swapped.
#[test]
fn subtype_is_tried_first() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let base = heap.new_class("Base", None).unwrap();
    let derived = heap.new_class("Derived", Some(&base)).unwrap();
    let a = heap.new_instance(&base).unwrap();
    let b = heap.new_instance(&derived).unwrap();

    let mut engine = Engine::new(&mut heap);
    assert!(!engine.rich_compare(&a, &b, CompareOp::Eq).unwrap());
    assert!(engine.rich_compare(&a, &b, CompareOp::Ne).unwrap());
    // "Base" < "Derived" by name
    assert!(engine.rich_compare(&a, &b, CompareOp::Lt).unwrap());

    release(&mut heap, vec![a, b, derived, base]);
}

// =============================================================================
// 4. Errors
// =============================================================================

#[test]
fn unhashable_key_is_rejected() {
    let mut heap = Heap::new(16, NoLimitTracker);
    let err = Object::Set(vec![Object::Dict(vec![])]).to_value(&mut heap).unwrap_err();
    assert!(err.matches(ExcType::TypeError));
    assert_eq!(err.to_string(), "TypeError: unhashable type: 'dict'");
    assert_eq!(heap.stats().live_objects, 0);
}

#[test]
fn repr_is_output_only() {
    let mut heap = Heap::new(4, NoLimitTracker);
    let err = Object::Repr("<object>".to_owned()).to_value(&mut heap).unwrap_err();
    assert_eq!(err.exc_type(), ExcType::TypeError);
}
