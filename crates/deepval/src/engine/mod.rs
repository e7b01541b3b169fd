//! The structural operations: deep copy, deep hash and rich comparison.
//!
//! [`Engine`] borrows a heap for the duration of a batch of operations and
//! carries the tracer and comparison mode. It holds no other state, so a fresh
//! engine can be built for every call.

mod compare;
mod copy;
#[cfg(feature = "deep-hash")]
mod hash;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

pub(crate) use compare::Comparator;

use crate::{
    exception::RunResult,
    heap::Heap,
    resource::ResourceTracker,
    tracer::{EngineTracer, NoopTracer},
    value::Value,
};

/// A rich comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum CompareOp {
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

impl CompareOp {
    /// The operator to use when the operands are exchanged: `a < b` is `b > a`.
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Eq | Self::Ne => self,
        }
    }

    /// Whether a three-way result satisfies this operator.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Ge => ordering.is_ge(),
        }
    }

    /// `==` or `!=`.
    #[must_use]
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

/// What happens when no comparison slot can decide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareMode {
    /// Every pair of values is ordered: by identity within a type, otherwise
    /// None first, numbers next, then by type name.
    #[default]
    Total,
    /// `==`/`!=` fall back to identity, orderings raise `TypeError`.
    Strict,
}

/// Which step of the ordering fallback produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum FallbackRule {
    /// Both operands are the same object.
    Identical,
    /// Same type, ordered by identity.
    SameTypeIdentity,
    /// `None` orders before everything else.
    NoneFirst,
    /// A number orders before a non-number.
    NumericFirst,
    /// Two numbers of different types, ordered by type identity.
    NumericTypeIdentity,
    /// Ordered by type name.
    TypeName,
    /// Equal type names, ordered by type identity.
    TypeIdentity,
    /// Strict mode equality by identity.
    Strict,
}

/// Entry point for the structural operations over one heap.
///
/// Generic over the heap's resource tracker `T` and the tracer `Tr`; with
/// [`NoopTracer`] all tracing compiles away.
#[derive(Debug)]
pub struct Engine<'h, T: ResourceTracker, Tr: EngineTracer = NoopTracer> {
    heap: &'h mut Heap<T>,
    tracer: Tr,
    mode: CompareMode,
}

impl<'h, T: ResourceTracker> Engine<'h, T> {
    /// Creates an engine in [`CompareMode::Total`] without tracing.
    pub fn new(heap: &'h mut Heap<T>) -> Self {
        Self {
            heap,
            tracer: NoopTracer,
            mode: CompareMode::default(),
        }
    }
}

impl<'h, T: ResourceTracker, Tr: EngineTracer> Engine<'h, T, Tr> {
    /// Replaces the tracer. Pass `&mut tracer` to keep ownership of it.
    pub fn with_tracer<Tr2: EngineTracer>(self, tracer: Tr2) -> Engine<'h, T, Tr2> {
        Engine {
            heap: self.heap,
            tracer,
            mode: self.mode,
        }
    }

    /// Sets what happens when no comparison slot decides.
    #[must_use]
    pub fn with_mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    /// The comparison mode in effect.
    #[must_use]
    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    /// The heap every operation reads from and allocates on.
    #[must_use]
    pub fn heap(&self) -> &Heap<T> {
        &*self.heap
    }

    /// Mutable access to the heap, e.g. to release results between operations.
    pub fn heap_mut(&mut self) -> &mut Heap<T> {
        &mut *self.heap
    }

    /// The tracer receiving copy, fallback, hash and depth events.
    #[must_use]
    pub fn tracer(&self) -> &Tr {
        &self.tracer
    }

    /// Mutable access to the tracer.
    pub fn tracer_mut(&mut self) -> &mut Tr {
        &mut self.tracer
    }

    /// Consumes the engine, returning the tracer with what it recorded.
    pub fn into_tracer(self) -> Tr {
        self.tracer
    }

    /// Evaluates `a <op> b` through the comparison slots of both operands,
    /// falling back to [`Self::ordering_fallback`] when neither decides.
    ///
    /// Consumes one level of data depth; nested container comparisons recurse
    /// through this method.
    pub fn rich_compare(&mut self, a: &Value, b: &Value, op: CompareOp) -> RunResult<bool> {
        self.comparator().rich_compare(a, b, op)
    }

    /// [`Self::rich_compare`] without the integer fast path or depth accounting
    /// for the outermost call.
    pub fn rich_compare_norecurse(&mut self, a: &Value, b: &Value, op: CompareOp) -> RunResult<bool> {
        self.comparator().rich_compare_norecurse(a, b, op)
    }

    /// Orders two values that define no comparison between them.
    ///
    /// In [`CompareMode::Total`] this never fails and the order is total and
    /// stable for the life of the values. In [`CompareMode::Strict`] ordering
    /// operators raise `TypeError`.
    pub fn ordering_fallback(&mut self, a: &Value, b: &Value, op: CompareOp) -> RunResult<bool> {
        self.comparator().ordering_fallback(a, b, op)
    }

    fn comparator(&mut self) -> Comparator<'_, T, Tr> {
        Comparator::new(&*self.heap, &mut self.tracer, self.mode)
    }

    /// Enters one level of data depth, reporting refusals to the tracer.
    fn enter_data(&mut self) -> RunResult<()> {
        self.heap.data_depth_enter().map_err(|err| {
            self.tracer.on_depth_exceeded(self.heap.tracker().max_data_depth());
            err.into()
        })
    }
}
