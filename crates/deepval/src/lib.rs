#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::cast_possible_wrap, reason = "wrap behavior mirrors CPython")]
// first so every other module can name the heap
mod heap;

mod engine;
mod exception;
mod object;
mod py_hash;
mod resource;
pub mod tracer;
pub mod types;
mod value;

pub use crate::{
    engine::{CompareMode, CompareOp, Engine, FallbackRule},
    exception::{ExcType, RunError, RunResult, SimpleException},
    heap::{DropWithHeap, Heap, HeapData, HeapId, HeapStats},
    object::Object,
    resource::{
        DEFAULT_MAX_DATA_DEPTH, DEFAULT_MAX_STR_DIGITS, LimitedTracker, NoLimitTracker, ResourceError, ResourceLimits,
        ResourceTracker,
    },
    tracer::{EngineTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    types::{Type, TypeRef},
    value::{Identity, Value},
};
