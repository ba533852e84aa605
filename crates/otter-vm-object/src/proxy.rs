//! JavaScript Proxy objects
//!
//! A proxy forwards every internal method to a handler trap, or to its target
//! when the handler has no such trap. The trap calls themselves live in
//! `proxy_operations.rs`.

use std::cell::Cell;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::ObjectRef;
use crate::property::PropertyKey;
use crate::shape::ShapeStore;
use crate::value::Value;

/// Proxy internal slots
pub struct JsProxy {
    target: ObjectRef,
    handler: ObjectRef,
    revoked: Cell<bool>,
}

impl std::fmt::Debug for JsProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_revoked() {
            write!(f, "Proxy {{ <revoked> }}")
        } else {
            write!(f, "Proxy {{ target: {:?} }}", self.target)
        }
    }
}

/// Result of creating a revocable proxy
pub struct RevocableProxy {
    /// The proxy object
    pub proxy: ObjectRef,
    /// Function object that revokes the proxy when called
    pub revoke: ObjectRef,
}

impl JsProxy {
    pub(crate) fn new(target: ObjectRef, handler: ObjectRef) -> Self {
        Self {
            target,
            handler,
            revoked: Cell::new(false),
        }
    }

    /// Create a proxy together with its revoke function
    pub fn revocable(
        store: &Arc<ShapeStore>,
        target: ObjectRef,
        handler: ObjectRef,
    ) -> RevocableProxy {
        let proxy = ObjectRef::new_proxy(store, target, handler);
        let weak = proxy.downgrade();
        let revoke = ObjectRef::new_function(store, None, "revoke", move |_, _| {
            if let Some(proxy) = weak.upgrade() {
                if let Some(data) = proxy.as_proxy() {
                    data.revoke();
                }
            }
            Ok(Value::Undefined)
        });
        RevocableProxy { proxy, revoke }
    }

    /// The target, `None` once revoked
    pub fn target(&self) -> Option<ObjectRef> {
        (!self.is_revoked()).then(|| self.target.clone())
    }

    /// The handler, `None` once revoked
    pub fn handler(&self) -> Option<ObjectRef> {
        (!self.is_revoked()).then(|| self.handler.clone())
    }

    /// Get the raw target without revocation checks.
    pub fn target_raw(&self) -> &ObjectRef {
        &self.target
    }

    /// Check if this proxy has been revoked
    pub fn is_revoked(&self) -> bool {
        self.revoked.get()
    }

    /// Revoke this proxy
    ///
    /// After revocation, every trap operation throws a TypeError.
    pub fn revoke(&self) {
        self.revoked.set(true);
    }

    /// Target, handler and the named trap (if the handler defines one).
    ///
    /// Errors if the proxy is revoked or the trap is neither callable nor
    /// undefined/null.
    pub(crate) fn trap(&self, name: &str) -> VmResult<(ObjectRef, ObjectRef, Option<ObjectRef>)> {
        let (Some(target), Some(handler)) = (self.target(), self.handler()) else {
            return Err(VmError::type_error(format!(
                "Cannot perform '{name}' on a proxy that has been revoked"
            )));
        };
        let receiver = Value::Object(handler.clone());
        let trap = match handler.get(&PropertyKey::string(name), &receiver)? {
            Value::Undefined | Value::Null => None,
            Value::Object(f) if f.is_callable() => Some(f),
            other => {
                return Err(VmError::type_error(format!(
                    "proxy trap '{name}' is not a function: {other:?}"
                )));
            }
        };
        Ok((target, handler, trap))
    }
}
