use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::{engine::CompareOp, resource::ResourceError};

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Exception types the engine can raise.
///
/// The string representation matches the variant name exactly (e.g., `TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    TypeError,
    /// Subclass of TypeError - deep copy or deep hash met a variant it does not implement.
    UnsupportedTypeError,
    ValueError,
    /// Data nesting exceeded the configured depth.
    RecursionError,
    MemoryError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        self == handler_type || matches!((self, handler_type), (Self::UnsupportedTypeError, Self::TypeError))
    }

    /// `TypeError` for an ordering between values that define none.
    pub(crate) fn not_supported_between(op: CompareOp, left: &str, right: &str) -> SimpleException {
        SimpleException::new_msg(
            Self::TypeError,
            format!("'{op}' not supported between instances of '{left}' and '{right}'"),
        )
    }

    /// `TypeError` for an unhashable dict key or set element.
    pub(crate) fn unhashable(type_name: &str) -> SimpleException {
        SimpleException::new_msg(Self::TypeError, format!("unhashable type: '{type_name}'"))
    }

    /// `UnsupportedTypeError` naming the operation and the offending type.
    pub(crate) fn unsupported(operation: &str, type_name: &str) -> SimpleException {
        SimpleException::new_msg(
            Self::UnsupportedTypeError,
            format!("{operation} does not implement: {type_name}"),
        )
    }

    /// `ValueError` for a range built with a zero step.
    pub(crate) fn range_step_zero() -> SimpleException {
        SimpleException::new_msg(Self::ValueError, "range() arg 3 must not be zero")
    }

    /// `TypeError` for `<`, `<=`, `>` or `>=` with a complex operand.
    pub(crate) fn complex_ordering() -> SimpleException {
        SimpleException::new_msg(Self::TypeError, "no ordering relation is defined for complex numbers")
    }

    /// `TypeError` for an output-only object passed back in as input.
    pub(crate) fn repr_not_convertible() -> SimpleException {
        SimpleException::new_msg(Self::TypeError, "Repr objects cannot be converted to values")
    }

    /// `ValueError` raised when an integer has too many digits to convert to text.
    pub(crate) fn str_digits_exceeded(limit: usize) -> SimpleException {
        SimpleException::new_msg(
            Self::ValueError,
            format!("Exceeds the limit ({limit} digits) for integer string conversion"),
        )
    }
}

/// An exception with an optional message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    arg: Option<String>,
}

impl SimpleException {
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self { exc_type, arg }
    }

    #[must_use]
    pub fn new_msg(exc_type: ExcType, msg: impl Into<String>) -> Self {
        Self::new(exc_type, Some(msg.into()))
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}: {arg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

/// Error produced by an engine operation.
///
/// Resource errors are kept distinct so callers can tell a limit from a
/// type error without matching on messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    Exc(Box<SimpleException>),
    Resource(ResourceError),
}

impl RunError {
    /// The exception type a Python caller would see for this error.
    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        match self {
            Self::Exc(exc) => exc.exc_type(),
            Self::Resource(ResourceError::Recursion { .. }) => ExcType::RecursionError,
            Self::Resource(_) => ExcType::MemoryError,
        }
    }

    /// Converts the error into the exception a Python caller would observe.
    #[must_use]
    pub fn into_exception(self) -> SimpleException {
        match self {
            Self::Exc(exc) => *exc,
            Self::Resource(err) => err.into_exception(),
        }
    }

    /// Returns true if this error would be caught by `except exc_type:`.
    #[must_use]
    pub fn matches(&self, exc_type: ExcType) -> bool {
        self.exc_type().is_subclass_of(exc_type)
    }
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(Box::new(exc))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exc(exc) => write!(f, "{exc}"),
            Self::Resource(err) => write!(f, "{}: {err}", self.exc_type()),
        }
    }
}

impl std::error::Error for RunError {}
