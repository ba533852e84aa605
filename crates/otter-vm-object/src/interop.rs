//! Member access for embedders
//!
//! Host code that drives objects by member name (rather than through the
//! interpreter) needs "no such member" and "member is not callable" as
//! separate failures. These helpers provide that on top of `[[Get]]`.

use thiserror::Error;

use crate::error::VmError;
use crate::object::ObjectRef;
use crate::property::PropertyKey;
use crate::value::Value;

/// Interop failures
#[derive(Debug, Error)]
pub enum InteropError {
    /// No property of that name on the receiver or its prototypes
    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// The member exists but cannot be invoked
    #[error("Unsupported message: '{0}' is not invocable")]
    UnsupportedMessage(String),

    /// Error raised while reading or calling the member
    #[error(transparent)]
    Vm(#[from] VmError),
}

/// Interop result type
pub type InteropResult<T> = std::result::Result<T, InteropError>;

/// Read `name` from `receiver`; a missing member is `UnknownIdentifier`
pub fn read_member(receiver: &ObjectRef, name: &str) -> InteropResult<Value> {
    let key = PropertyKey::string(name);
    receiver
        .get_helper(&key, &Value::Object(receiver.clone()))?
        .ok_or_else(|| InteropError::UnknownIdentifier(name.to_string()))
}

/// Whether `name` resolves on `receiver` or its prototype chain
pub fn has_member(receiver: &ObjectRef, name: &str) -> InteropResult<bool> {
    Ok(receiver.has_property(&PropertyKey::string(name))?)
}

/// Look up `name` and call it with `receiver` as `this`
pub fn invoke_member(receiver: &ObjectRef, name: &str, args: &[Value]) -> InteropResult<Value> {
    match read_member(receiver, name)? {
        Value::Object(function) if function.is_callable() => {
            Ok(function.call(&Value::Object(receiver.clone()), args)?)
        }
        _ => Err(InteropError::UnsupportedMessage(name.to_string())),
    }
}
