//! Engine tracing infrastructure.
//!
//! Provides a trait-based tracing system for the engine with zero-cost abstraction.
//! When using [`NoopTracer`], all trace methods compile away entirely via monomorphization,
//! the same way [`NoLimitTracker`](crate::resource::NoLimitTracker) eliminates resource
//! checking overhead.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op (default) |
//! | [`StderrTracer`] | Human-readable log to stderr |
//! | [`RecordingTracer`] | Full event recording for tests and post-mortem |
//!
//! # Usage
//!
//! ```
//! use deepval::{Engine, Heap, NoLimitTracker, Object, RecordingTracer};
//!
//! let mut heap = Heap::new(16, NoLimitTracker);
//! let value = Object::List(vec![Object::Int(1)]).to_value(&mut heap).unwrap();
//!
//! let mut engine = Engine::new(&mut heap).with_tracer(RecordingTracer::new());
//! let copy = engine.deep_copy(&value).unwrap();
//! assert_eq!(engine.tracer().event_count(), 1);
//!
//! copy.drop_with_heap(&mut heap);
//! value.drop_with_heap(&mut heap);
//! ```

use crate::{
    engine::{CompareOp, FallbackRule},
    exception::{ExcType, RunError},
    types::Type,
};

/// Trace event emitted by the engine.
///
/// Used by [`RecordingTracer`] to capture what the engine did and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A container was copied.
    Copy {
        ty: Type,
        /// Number of entries in the source container.
        len: usize,
        /// Data depth at which the copy happened (1 for the outermost container).
        depth: usize,
    },
    /// No comparison slot decided; the ordering fallback did.
    Fallback {
        op: CompareOp,
        rule: FallbackRule,
        result: bool,
    },
    /// An error raised while hashing a component was swallowed.
    HashAbsorbed { exc_type: ExcType, message: String },
    /// A recursive operation hit the data depth limit.
    DepthExceeded { limit: usize },
}

/// Trait for engine tracing.
///
/// All methods have default no-op implementations, so [`NoopTracer`] requires
/// zero lines of code and compiles to zero instructions. Implementations only
/// override the hooks they care about.
pub trait EngineTracer: std::fmt::Debug {
    /// Called after a container has been deep-copied.
    ///
    /// # Arguments
    /// * `ty` - Type of the container
    /// * `len` - Number of entries copied
    /// * `depth` - Current data depth, the copied container included
    #[inline(always)]
    fn on_copy(&mut self, _ty: Type, _len: usize, _depth: usize) {}

    /// Called when the ordering fallback decides a comparison.
    #[inline(always)]
    fn on_fallback(&mut self, _op: CompareOp, _rule: FallbackRule, _result: bool) {}

    /// Called when deep hash absorbs an error instead of propagating it.
    #[inline(always)]
    fn on_hash_absorbed(&mut self, _error: &RunError) {}

    /// Called when a recursive operation is refused by the depth guard.
    #[inline(always)]
    fn on_depth_exceeded(&mut self, _limit: usize) {}
}

/// Lets callers keep ownership of a tracer and lend it to an engine.
impl<Tr: EngineTracer + ?Sized> EngineTracer for &mut Tr {
    #[inline]
    fn on_copy(&mut self, ty: Type, len: usize, depth: usize) {
        (**self).on_copy(ty, len, depth);
    }

    #[inline]
    fn on_fallback(&mut self, op: CompareOp, rule: FallbackRule, result: bool) {
        (**self).on_fallback(op, rule, result);
    }

    #[inline]
    fn on_hash_absorbed(&mut self, error: &RunError) {
        (**self).on_hash_absorbed(error);
    }

    #[inline]
    fn on_depth_exceeded(&mut self, limit: usize) {
        (**self).on_depth_exceeded(limit);
    }
}

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EngineTracer for NoopTracer {}

/// Tracer that prints a human-readable log to stderr.
///
/// Output format:
/// ```text
///   +++ COPY list          len=3  depth=2
///   ??? FALLBACK <         rule=TypeName  -> true
///   !!! ABSORBED ValueError: Exceeds the limit (4300 digits) for integer string conversion
///   ### DEPTH LIMIT 200
/// ```
#[derive(Debug)]
pub struct StderrTracer {
    /// Maximum number of events to print before stopping. None = unlimited.
    limit: Option<usize>,
    count: usize,
    stopped: bool,
}

impl StderrTracer {
    /// Creates a new stderr tracer with no event limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            count: 0,
            stopped: false,
        }
    }

    /// Creates a new stderr tracer that stops after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
            stopped: false,
        }
    }

    /// Returns false once the limit has been reached.
    fn tick(&mut self) -> bool {
        if self.stopped {
            return false;
        }
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count > limit
        {
            eprintln!("--- trace limit reached ({limit} events) ---");
            self.stopped = true;
            return false;
        }
        true
    }
}

impl Default for StderrTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineTracer for StderrTracer {
    fn on_copy(&mut self, ty: Type, len: usize, depth: usize) {
        if self.tick() {
            eprintln!("  +++ COPY {ty:<12} len={len}  depth={depth}");
        }
    }

    fn on_fallback(&mut self, op: CompareOp, rule: FallbackRule, result: bool) {
        if self.tick() {
            eprintln!("  ??? FALLBACK {op:<8} rule={rule}  -> {result}");
        }
    }

    fn on_hash_absorbed(&mut self, error: &RunError) {
        if self.tick() {
            eprintln!("  !!! ABSORBED {error}");
        }
    }

    fn on_depth_exceeded(&mut self, limit: usize) {
        if self.tick() {
            eprintln!("  ### DEPTH LIMIT {limit}");
        }
    }
}

/// Tracer that records every event.
#[derive(Debug)]
pub struct RecordingTracer {
    /// All recorded events in chronological order.
    events: Vec<TraceEvent>,
    /// Optional limit on number of events recorded.
    limit: Option<usize>,
}

impl RecordingTracer {
    /// Creates a new recording tracer with no event limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            limit: None,
        }
    }

    /// Creates a new recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_none_or(|limit| self.events.len() < limit) {
            self.events.push(event);
        }
    }
}

impl Default for RecordingTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineTracer for RecordingTracer {
    fn on_copy(&mut self, ty: Type, len: usize, depth: usize) {
        self.record(TraceEvent::Copy { ty, len, depth });
    }

    fn on_fallback(&mut self, op: CompareOp, rule: FallbackRule, result: bool) {
        self.record(TraceEvent::Fallback { op, rule, result });
    }

    fn on_hash_absorbed(&mut self, error: &RunError) {
        self.record(TraceEvent::HashAbsorbed {
            exc_type: error.exc_type(),
            message: error.to_string(),
        });
    }

    fn on_depth_exceeded(&mut self, limit: usize) {
        self.record(TraceEvent::DepthExceeded { limit });
    }
}
