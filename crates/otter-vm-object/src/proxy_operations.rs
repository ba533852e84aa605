//! Proxy trap operations (ES2026 §10.5)
//!
//! Each function looks up its trap on the handler, falls back to the target
//! when the trap is undefined, and otherwise calls the trap and checks the
//! result against the invariants the target enforces.

use rustc_hash::FxHashSet;

use crate::descriptor::{PropertyDescriptor, from_property_descriptor, to_property_descriptor};
use crate::error::{VmError, VmResult};
use crate::object::ObjectRef;
use crate::ordinary::is_compatible_property_descriptor;
use crate::property::PropertyKey;
use crate::proxy::JsProxy;
use crate::value::{Value, same_value};

fn invoke_trap(trap: &ObjectRef, handler: &ObjectRef, args: &[Value]) -> VmResult<Value> {
    trap.call(&Value::Object(handler.clone()), args)
}

fn invariant(trap: &str, message: &str) -> VmError {
    VmError::type_error(format!("proxy '{trap}' trap {message}"))
}

/// `[[GetPrototypeOf]]`
pub fn proxy_get_prototype_of(proxy: &JsProxy) -> VmResult<Option<ObjectRef>> {
    let (target, handler, trap) = proxy.trap("getPrototypeOf")?;
    let Some(trap) = trap else {
        return target.get_prototype_of();
    };

    let prototype = match invoke_trap(&trap, &handler, &[Value::Object(target.clone())])? {
        Value::Object(obj) => Some(obj),
        Value::Null => None,
        _ => return Err(invariant("getPrototypeOf", "returned neither object nor null")),
    };
    if target.is_extensible()? {
        return Ok(prototype);
    }
    if target.get_prototype_of()? != prototype {
        return Err(invariant(
            "getPrototypeOf",
            "did not return the prototype of a non-extensible target",
        ));
    }
    Ok(prototype)
}

/// `[[SetPrototypeOf]]`
pub fn proxy_set_prototype_of(proxy: &JsProxy, prototype: Option<ObjectRef>) -> VmResult<bool> {
    let (target, handler, trap) = proxy.trap("setPrototypeOf")?;
    let Some(trap) = trap else {
        return target.set_prototype_of(prototype);
    };

    let proto_value = prototype.clone().map(Value::Object).unwrap_or(Value::Null);
    let args = [Value::Object(target.clone()), proto_value];
    if !invoke_trap(&trap, &handler, &args)?.to_boolean() {
        return Ok(false);
    }
    if target.is_extensible()? {
        return Ok(true);
    }
    if target.get_prototype_of()? != prototype {
        return Err(invariant(
            "setPrototypeOf",
            "returned true for a non-extensible target with a different prototype",
        ));
    }
    Ok(true)
}

/// `[[IsExtensible]]`
pub fn proxy_is_extensible(proxy: &JsProxy) -> VmResult<bool> {
    let (target, handler, trap) = proxy.trap("isExtensible")?;
    let Some(trap) = trap else {
        return target.is_extensible();
    };

    let result = invoke_trap(&trap, &handler, &[Value::Object(target.clone())])?.to_boolean();
    if result != target.is_extensible()? {
        return Err(invariant("isExtensible", "result does not match the target"));
    }
    Ok(result)
}

/// `[[PreventExtensions]]`
pub fn proxy_prevent_extensions(proxy: &JsProxy) -> VmResult<bool> {
    let (target, handler, trap) = proxy.trap("preventExtensions")?;
    let Some(trap) = trap else {
        return target.prevent_extensions(false);
    };

    let result = invoke_trap(&trap, &handler, &[Value::Object(target.clone())])?.to_boolean();
    if result && target.is_extensible()? {
        return Err(invariant("preventExtensions", "returned true but the target is extensible"));
    }
    Ok(result)
}

/// `[[GetOwnProperty]]`
pub fn proxy_get_own_property(
    proxy: &JsProxy,
    key: &PropertyKey,
) -> VmResult<Option<PropertyDescriptor>> {
    const TRAP: &str = "getOwnPropertyDescriptor";
    let (target, handler, trap) = proxy.trap(TRAP)?;
    let Some(trap) = trap else {
        return target.get_own_property(key);
    };

    let result = invoke_trap(&trap, &handler, &[Value::Object(target.clone()), key.to_value()])?;
    if !result.is_object() && !result.is_undefined() {
        return Err(invariant(TRAP, "must return an object or undefined"));
    }
    let target_desc = target.get_own_property(key)?;

    if result.is_undefined() {
        let Some(target_desc) = target_desc else {
            return Ok(None);
        };
        if !target_desc.is_configurable() {
            return Err(invariant(TRAP, "reported a non-configurable property as absent"));
        }
        if !target.is_extensible()? {
            return Err(invariant(
                TRAP,
                "reported an existing property of a non-extensible target as absent",
            ));
        }
        return Ok(None);
    }

    let extensible = target.is_extensible()?;
    let mut result_desc = to_property_descriptor(&result)?;
    result_desc.complete();
    if !is_compatible_property_descriptor(key, extensible, &result_desc, target_desc.as_ref()) {
        return Err(invariant(
            TRAP,
            "returned a descriptor incompatible with the target property",
        ));
    }
    if !result_desc.is_configurable() {
        match &target_desc {
            Some(td) if !td.is_configurable() => {
                if result_desc.writable == Some(false) && td.is_writable() {
                    return Err(invariant(TRAP, "reported a writable property as non-writable"));
                }
            }
            _ => {
                return Err(invariant(
                    TRAP,
                    "reported a property as non-configurable that is configurable or absent on the target",
                ));
            }
        }
    }
    Ok(Some(result_desc))
}

/// `[[DefineOwnProperty]]`
pub fn proxy_define_own_property(
    proxy: &JsProxy,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
) -> VmResult<bool> {
    const TRAP: &str = "defineProperty";
    let (target, handler, trap) = proxy.trap(TRAP)?;
    let Some(trap) = trap else {
        return target.define_own_property(key, desc, false);
    };

    let desc_obj = from_property_descriptor(target.store(), desc)?;
    let args = [Value::Object(target.clone()), key.to_value(), Value::Object(desc_obj)];
    if !invoke_trap(&trap, &handler, &args)?.to_boolean() {
        return Ok(false);
    }

    let target_desc = target.get_own_property(key)?;
    let extensible = target.is_extensible()?;
    let setting_non_configurable = desc.configurable == Some(false);
    match target_desc {
        None => {
            if !extensible {
                return Err(invariant(TRAP, "added a property to a non-extensible target"));
            }
            if setting_non_configurable {
                return Err(invariant(
                    TRAP,
                    "defined a non-configurable property that is absent on the target",
                ));
            }
        }
        Some(td) => {
            if !is_compatible_property_descriptor(key, extensible, desc, Some(&td)) {
                return Err(invariant(
                    TRAP,
                    "accepted a descriptor incompatible with the target property",
                ));
            }
            if setting_non_configurable && td.is_configurable() {
                return Err(invariant(
                    TRAP,
                    "defined a non-configurable property that is configurable on the target",
                ));
            }
            if td.is_data_descriptor()
                && !td.is_configurable()
                && td.is_writable()
                && desc.writable == Some(false)
            {
                return Err(invariant(
                    TRAP,
                    "made a non-configurable writable property non-writable",
                ));
            }
        }
    }
    Ok(true)
}

/// `[[HasProperty]]`
pub fn proxy_has(proxy: &JsProxy, key: &PropertyKey) -> VmResult<bool> {
    let (target, handler, trap) = proxy.trap("has")?;
    let Some(trap) = trap else {
        return target.has_property(key);
    };

    let args = [Value::Object(target.clone()), key.to_value()];
    let result = invoke_trap(&trap, &handler, &args)?.to_boolean();
    if !result {
        if let Some(td) = target.get_own_property(key)? {
            if !td.is_configurable() {
                return Err(invariant("has", "hid a non-configurable property"));
            }
            if !target.is_extensible()? {
                return Err(invariant("has", "hid a property of a non-extensible target"));
            }
        }
    }
    Ok(result)
}

/// `[[Get]]`
pub fn proxy_get(proxy: &JsProxy, key: &PropertyKey, receiver: &Value) -> VmResult<Value> {
    let (target, handler, trap) = proxy.trap("get")?;
    let Some(trap) = trap else {
        return target.get(key, receiver);
    };

    let args = [Value::Object(target.clone()), key.to_value(), receiver.clone()];
    let result = invoke_trap(&trap, &handler, &args)?;
    if let Some(td) = target.get_own_property(key)? {
        if !td.is_configurable() {
            if td.is_data_descriptor()
                && !td.is_writable()
                && !same_value(&result, td.value.as_ref().unwrap_or(&Value::Undefined))
            {
                return Err(invariant(
                    "get",
                    "returned a different value for a non-writable, non-configurable property",
                ));
            }
            if td.is_accessor_descriptor()
                && td.get.as_ref().is_none_or(Value::is_undefined)
                && !result.is_undefined()
            {
                return Err(invariant(
                    "get",
                    "returned a value for a non-configurable accessor without a getter",
                ));
            }
        }
    }
    Ok(result)
}

/// `[[Set]]`
pub fn proxy_set(
    proxy: &JsProxy,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
) -> VmResult<bool> {
    let (target, handler, trap) = proxy.trap("set")?;
    let Some(trap) = trap else {
        return target.set(key, value, receiver, false);
    };

    let args = [
        Value::Object(target.clone()),
        key.to_value(),
        value.clone(),
        receiver.clone(),
    ];
    if !invoke_trap(&trap, &handler, &args)?.to_boolean() {
        return Ok(false);
    }
    if let Some(td) = target.get_own_property(key)? {
        if !td.is_configurable() {
            if td.is_data_descriptor()
                && !td.is_writable()
                && !same_value(&value, td.value.as_ref().unwrap_or(&Value::Undefined))
            {
                return Err(invariant("set", "changed a non-writable, non-configurable property"));
            }
            if td.is_accessor_descriptor() && td.setter().is_none() {
                return Err(invariant(
                    "set",
                    "succeeded on a non-configurable accessor without a setter",
                ));
            }
        }
    }
    Ok(true)
}

/// `[[Delete]]`
pub fn proxy_delete(proxy: &JsProxy, key: &PropertyKey) -> VmResult<bool> {
    let (target, handler, trap) = proxy.trap("deleteProperty")?;
    let Some(trap) = trap else {
        return target.delete(key, false);
    };

    let args = [Value::Object(target.clone()), key.to_value()];
    if !invoke_trap(&trap, &handler, &args)?.to_boolean() {
        return Ok(false);
    }
    let Some(td) = target.get_own_property(key)? else {
        return Ok(true);
    };
    if !td.is_configurable() {
        return Err(invariant("deleteProperty", "deleted a non-configurable property"));
    }
    if !target.is_extensible()? {
        return Err(invariant("deleteProperty", "deleted a property of a non-extensible target"));
    }
    Ok(true)
}

/// Upper bound on the key list reserved up front from a trap result's length
const MAX_PRESIZED_KEYS: u32 = 1024;

/// CreateListFromArrayLike restricted to property keys
fn keys_from_array_like(value: &Value) -> VmResult<Vec<PropertyKey>> {
    let obj = value
        .as_object()
        .ok_or_else(|| invariant("ownKeys", "must return an object"))?;
    let length = match obj.get(&PropertyKey::string("length"), value)? {
        Value::Undefined => 0,
        Value::Number(n) if n.is_nan() || n <= 0.0 => 0,
        Value::Number(n) => n.min(u32::MAX as f64) as u32,
        _ => return Err(invariant("ownKeys", "result has a non-numeric length")),
    };

    // `length` comes from user code; the elements have to exist before the
    // list may grow to match it
    let mut keys = Vec::with_capacity(length.min(MAX_PRESIZED_KEYS) as usize);
    for index in 0..length {
        let element = obj.get(&PropertyKey::index(index), value)?;
        let key = PropertyKey::from_value(&element).ok_or_else(|| {
            invariant("ownKeys", "result contains a value that is not a string or symbol")
        })?;
        keys.push(key);
    }
    Ok(keys)
}

/// `[[OwnPropertyKeys]]`
pub fn proxy_own_keys(proxy: &JsProxy) -> VmResult<Vec<PropertyKey>> {
    const TRAP: &str = "ownKeys";
    let (target, handler, trap) = proxy.trap(TRAP)?;
    let Some(trap) = trap else {
        return target.own_property_keys(true, true);
    };

    let result = invoke_trap(&trap, &handler, &[Value::Object(target.clone())])?;
    let trap_keys = keys_from_array_like(&result)?;
    let mut unchecked: FxHashSet<PropertyKey> = FxHashSet::default();
    for key in &trap_keys {
        if !unchecked.insert(key.clone()) {
            return Err(invariant(TRAP, "result contains duplicate entries"));
        }
    }

    let extensible = target.is_extensible()?;
    let mut configurable = Vec::new();
    let mut non_configurable = Vec::new();
    for key in target.own_property_keys(true, true)? {
        match target.get_own_property(&key)? {
            Some(desc) if !desc.is_configurable() => non_configurable.push(key),
            _ => configurable.push(key),
        }
    }
    if extensible && non_configurable.is_empty() {
        return Ok(trap_keys);
    }

    for key in &non_configurable {
        if !unchecked.remove(key) {
            return Err(invariant(TRAP, "result is missing a non-configurable key"));
        }
    }
    if extensible {
        return Ok(trap_keys);
    }
    for key in &configurable {
        if !unchecked.remove(key) {
            return Err(invariant(TRAP, "result is missing a key of a non-extensible target"));
        }
    }
    if !unchecked.is_empty() {
        return Err(invariant(TRAP, "result lists a key a non-extensible target does not have"));
    }
    Ok(trap_keys)
}
