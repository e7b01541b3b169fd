use std::fmt;

use crate::exception::{ExcType, RunError, SimpleException};

/// Error returned when a resource limit is exceeded while building or traversing values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of allocations exceeded.
    Allocation { limit: usize, count: usize },
    /// Maximum memory usage exceeded.
    Memory { limit: usize, used: usize },
    /// Maximum data nesting depth exceeded.
    Recursion { limit: usize, depth: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::Memory { limit, used } => {
                write!(f, "memory limit exceeded: {used} bytes > {limit} bytes")
            }
            Self::Recursion { .. } => {
                write!(f, "maximum recursion depth exceeded")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

impl ResourceError {
    /// Converts this resource error to the exception a Python caller would observe.
    ///
    /// - `Allocation` → `MemoryError`
    /// - `Memory` → `MemoryError`
    /// - `Recursion` → `RecursionError`
    #[must_use]
    pub fn into_exception(self) -> SimpleException {
        let exc_type = match self {
            Self::Allocation { .. } | Self::Memory { .. } => ExcType::MemoryError,
            Self::Recursion { .. } => ExcType::RecursionError,
        };
        SimpleException::new_msg(exc_type, self.to_string())
    }
}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Resource(err)
    }
}

/// Trait for tracking resource usage of a [`Heap`](crate::Heap).
///
/// Implementations can enforce limits on allocations and memory, and supply
/// the data depth and integer digit limits the engine runs under.
pub trait ResourceTracker: fmt::Debug {
    /// Called before each heap allocation.
    ///
    /// Returns `Ok(())` if the allocation should proceed, or `Err(ResourceError)`
    /// if a limit would be exceeded.
    ///
    /// # Arguments
    /// * `get_size` - Lazily computes the approximate size in bytes of the allocation
    fn on_allocate(&mut self, get_size: impl FnOnce() -> usize) -> Result<(), ResourceError>;

    /// Called when a heap value is freed.
    fn on_free(&mut self, get_size: impl FnOnce() -> usize);

    /// Maximum nesting depth for recursive copy, hash and compare.
    fn max_data_depth(&self) -> usize {
        DEFAULT_MAX_DATA_DEPTH
    }

    /// Maximum number of decimal digits when converting an integer to text.
    ///
    /// `None` disables the limit.
    fn max_str_digits(&self) -> Option<usize> {
        Some(DEFAULT_MAX_STR_DIGITS)
    }

    /// Returns the total number of allocations tracked, if this tracker records them.
    fn allocation_count(&self) -> Option<usize> {
        None
    }
}

/// Maximum nesting depth for data structure operations (copy, hash, compare).
///
/// Lower in debug mode to avoid stack overflow (debug builds use more stack space
/// per call frame).
#[cfg(debug_assertions)]
pub const DEFAULT_MAX_DATA_DEPTH: usize = 200;

/// Maximum nesting depth for data structure operations (copy, hash, compare).
#[cfg(not(debug_assertions))]
pub const DEFAULT_MAX_DATA_DEPTH: usize = 1000;

/// Default limit on integer-to-text conversion, matching CPython's `sys.int_info.default_max_str_digits`.
pub const DEFAULT_MAX_STR_DIGITS: usize = 4300;

/// A tracker that enforces nothing beyond the default depth and digit limits.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct NoLimitTracker;

impl ResourceTracker for NoLimitTracker {
    #[inline]
    fn on_allocate(&mut self, _get_size: impl FnOnce() -> usize) -> Result<(), ResourceError> {
        Ok(())
    }

    #[inline]
    fn on_free(&mut self, _get_size: impl FnOnce() -> usize) {}
}

/// Configuration for resource limits.
///
/// All limits are optional - set to `None` to fall back to the defaults (or to
/// disable the limit where no default exists). Build custom limits with the
/// builder methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of heap allocations allowed.
    pub max_allocations: Option<usize>,
    /// Maximum heap memory in bytes (approximate).
    pub max_memory: Option<usize>,
    /// Maximum nesting depth for copy, hash and compare.
    pub max_data_depth: Option<usize>,
    /// Maximum decimal digits for integer-to-text conversion.
    pub max_str_digits: Option<usize>,
}

impl ResourceLimits {
    /// Creates limits with allocation and memory unrestricted and the default depth and digit limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_data_depth: Some(DEFAULT_MAX_DATA_DEPTH),
            max_str_digits: Some(DEFAULT_MAX_STR_DIGITS),
            ..Default::default()
        }
    }

    /// Sets the maximum number of allocations.
    #[must_use]
    pub fn max_allocations(mut self, limit: usize) -> Self {
        self.max_allocations = Some(limit);
        self
    }

    /// Sets the maximum memory usage in bytes.
    #[must_use]
    pub fn max_memory(mut self, limit: usize) -> Self {
        self.max_memory = Some(limit);
        self
    }

    /// Sets the maximum nesting depth for recursive operations.
    #[must_use]
    pub fn max_data_depth(mut self, limit: usize) -> Self {
        self.max_data_depth = Some(limit);
        self
    }

    /// Sets the integer-to-text digit limit, `None` disables it.
    #[must_use]
    pub fn max_str_digits(mut self, limit: Option<usize>) -> Self {
        self.max_str_digits = limit;
        self
    }
}

/// A resource tracker that enforces configurable limits.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    /// Total number of allocations made.
    allocation_count: usize,
    /// Current approximate memory usage in bytes.
    current_memory: usize,
}

impl LimitedTracker {
    /// Creates a new LimitedTracker with the given limits.
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            allocation_count: 0,
            current_memory: 0,
        }
    }

    /// Returns the current approximate memory usage.
    #[must_use]
    pub fn current_memory(&self) -> usize {
        self.current_memory
    }

    /// Returns the configured limits.
    #[must_use]
    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

impl ResourceTracker for LimitedTracker {
    fn on_allocate(&mut self, get_size: impl FnOnce() -> usize) -> Result<(), ResourceError> {
        if let Some(max) = self.limits.max_allocations
            && self.allocation_count >= max
        {
            return Err(ResourceError::Allocation {
                limit: max,
                count: self.allocation_count + 1,
            });
        }

        let size = get_size();
        if let Some(max) = self.limits.max_memory {
            let new_memory = self.current_memory + size;
            if new_memory > max {
                return Err(ResourceError::Memory {
                    limit: max,
                    used: new_memory,
                });
            }
        }

        self.allocation_count += 1;
        self.current_memory += size;
        Ok(())
    }

    fn on_free(&mut self, get_size: impl FnOnce() -> usize) {
        self.current_memory = self.current_memory.saturating_sub(get_size());
    }

    fn max_data_depth(&self) -> usize {
        self.limits.max_data_depth.unwrap_or(DEFAULT_MAX_DATA_DEPTH)
    }

    fn max_str_digits(&self) -> Option<usize> {
        self.limits.max_str_digits
    }

    fn allocation_count(&self) -> Option<usize> {
        Some(self.allocation_count)
    }
}
