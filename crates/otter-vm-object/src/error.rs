//! Object model error types

use std::fmt;

use thiserror::Error;

use crate::property::PropertyKey;
use crate::value::Value;

/// Errors raised by property operations
#[derive(Debug, Error)]
pub enum VmError {
    /// Type error (e.g., writing a non-writable property in strict mode)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Range error
    #[error("RangeError: {0}")]
    RangeError(String),

    /// Byte access outside the bounds of a buffer
    #[error("RangeError: offset {offset} with width {width} is out of bounds for length {length}")]
    OutOfBounds {
        /// Byte offset of the access
        offset: usize,
        /// Element width in bytes
        width: usize,
        /// Buffer length in bytes
        length: usize,
    },

    /// Value thrown by user code (a getter, setter or proxy trap)
    #[error("Uncaught exception: {0}")]
    Exception(Box<ThrownValue>),
}

/// A value thrown by user code
#[derive(Debug)]
pub struct ThrownValue {
    /// The thrown value
    pub value: Value,
}

impl fmt::Display for ThrownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.value)
    }
}

impl VmError {
    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a range error
    pub fn range_error(msg: impl Into<String>) -> Self {
        Self::RangeError(msg.into())
    }

    /// `RangeError` for proxy dispatch nested past the configured limit
    pub fn stack_overflow() -> Self {
        Self::range_error("Maximum call stack size exceeded")
    }

    /// Wrap a value thrown by user code
    pub fn exception(value: Value) -> Self {
        Self::Exception(Box::new(ThrownValue { value }))
    }

    /// `TypeError` for assigning to a non-writable property
    pub fn not_writable(key: &PropertyKey) -> Self {
        Self::type_error(format!(
            "Cannot assign to read only property '{key}' of object"
        ))
    }

    /// `TypeError` for deleting or redefining a non-configurable property
    pub fn not_configurable(key: &PropertyKey) -> Self {
        Self::type_error(format!("Cannot delete property '{key}' of object"))
    }

    /// `TypeError` for adding a property to a non-extensible object
    pub fn not_extensible(key: &PropertyKey) -> Self {
        Self::type_error(format!(
            "Cannot add property {key}, object is not extensible"
        ))
    }

    /// `TypeError` for a set whose receiver is a primitive
    pub fn non_object_receiver(key: &PropertyKey) -> Self {
        Self::type_error(format!(
            "Cannot create property '{key}' on a non-object receiver"
        ))
    }

    /// `TypeError` for an incompatible property redefinition
    pub fn cannot_redefine(key: &PropertyKey) -> Self {
        Self::type_error(format!("Cannot redefine property: {key}"))
    }

    /// `TypeError` for assigning to an accessor without a setter
    pub fn no_setter(key: &PropertyKey) -> Self {
        Self::type_error(format!(
            "Cannot set property {key} of object which has only a getter"
        ))
    }

    /// Returns the thrown value when this error came from user code
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Exception(thrown) => Some(&thrown.value),
            _ => None,
        }
    }
}

/// Result type for object model operations
pub type VmResult<T> = std::result::Result<T, VmError>;

/// Report a failed operation: a `TypeError` in strict mode, `false` otherwise.
pub(crate) fn fail(strict: bool, error: impl FnOnce() -> VmError) -> VmResult<bool> {
    if strict { Err(error()) } else { Ok(false) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_reporting_channel() {
        let key = PropertyKey::string("x");
        assert!(!fail(false, || VmError::not_writable(&key)).unwrap());
        let err = fail(true, || VmError::not_writable(&key)).unwrap_err();
        assert!(matches!(err, VmError::TypeError(ref msg) if msg.contains("'x'")));
    }

    #[test]
    fn test_exception_carries_value() {
        let err = VmError::exception(Value::number(7.0));
        assert_eq!(err.thrown_value(), Some(&Value::number(7.0)));
        assert!(VmError::stack_overflow().thrown_value().is_none());
    }
}
