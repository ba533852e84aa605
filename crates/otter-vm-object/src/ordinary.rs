//! Ordinary object internal methods (ES2026 §10.1)
//!
//! Free functions implementing the ordinary algorithms on top of the raw
//! instance store in `object.rs`. Every object kind reuses them; the dispatch
//! in `internal_methods.rs` decides when they apply.
//!
//! None of these functions holds a storage borrow while user code runs.
//! After a getter, setter or proxy trap returns, state is looked up again.

use crate::descriptor::PropertyDescriptor;
use crate::error::{VmError, VmResult, fail};
use crate::object::{JsObject, ObjectRef};
use crate::property::{Accessor, PropertyAttributes, PropertyKey, Slot, compare_property_keys};
use crate::prototype_chain::{ChainStep, PrototypeWalker, check_proto_cycle};
use crate::value::{Value, same_value};

/// OrdinaryGetOwnProperty
pub fn ordinary_get_own_property(o: &JsObject, key: &PropertyKey) -> Option<PropertyDescriptor> {
    let (attributes, slot) = o.lookup_own(key)?;
    Some(match slot {
        Slot::Data(value) => PropertyDescriptor::data(value, attributes),
        Slot::Accessor(accessor) => PropertyDescriptor::accessor(
            accessor.getter,
            accessor.setter,
            attributes.enumerable,
            attributes.configurable,
        ),
    })
}

/// Value of a data property, or the result of calling the getter with
/// `receiver` as `this`
fn read_slot(slot: Slot, receiver: &Value) -> VmResult<Value> {
    match slot {
        Slot::Data(value) => Ok(value),
        Slot::Accessor(Accessor {
            getter: Some(getter),
            ..
        }) => getter.call(receiver, &[]),
        Slot::Accessor(_) => Ok(Value::Undefined),
    }
}

/// OrdinaryGet, with "not found" kept apart from `undefined`
pub fn ordinary_get(o: &ObjectRef, key: &PropertyKey, receiver: &Value) -> VmResult<Option<Value>> {
    for step in PrototypeWalker::new(Some(o.clone())) {
        match step {
            ChainStep::Ordinary(obj) => {
                if let Some((_, slot)) = obj.lookup_own(key) {
                    return read_slot(slot, receiver).map(Some);
                }
            }
            ChainStep::Exotic(obj) => return obj.get_helper(key, receiver),
        }
    }
    Ok(None)
}

/// OrdinaryHasProperty
pub fn ordinary_has(o: &ObjectRef, key: &PropertyKey) -> VmResult<bool> {
    for step in PrototypeWalker::new(Some(o.clone())) {
        match step {
            ChainStep::Ordinary(obj) => {
                if obj.lookup_own(key).is_some() {
                    return Ok(true);
                }
            }
            ChainStep::Exotic(obj) => return obj.has_property(key),
        }
    }
    Ok(false)
}

/// OrdinarySet
///
/// Looks the property up on `o` and its prototypes (dispatching at the first
/// proxy), then writes to `receiver`. When the key is found nowhere, it is
/// created on `receiver` as a plain data property.
pub fn ordinary_set(
    o: &ObjectRef,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
    strict: bool,
) -> VmResult<bool> {
    for step in PrototypeWalker::new(Some(o.clone())) {
        match step {
            ChainStep::Ordinary(obj) => {
                if let Some(own) = ordinary_get_own_property(&obj, key) {
                    return perform_set_with_own_descriptor(&own, key, value, receiver, strict);
                }
            }
            ChainStep::Exotic(obj) => return obj.set(key, value, receiver, strict),
        }
    }
    let implicit = PropertyDescriptor::data(Value::Undefined, PropertyAttributes::data());
    perform_set_with_own_descriptor(&implicit, key, value, receiver, strict)
}

/// OrdinarySetWithOwnDescriptor, steps 2 and later
pub fn perform_set_with_own_descriptor(
    own: &PropertyDescriptor,
    key: &PropertyKey,
    value: Value,
    receiver: &Value,
    strict: bool,
) -> VmResult<bool> {
    if own.is_accessor_descriptor() {
        return match own.setter() {
            Some(setter) => invoke_setter(setter, receiver, value),
            None => fail(strict, || VmError::no_setter(key)),
        };
    }

    if !own.is_writable() {
        return fail(strict, || VmError::not_writable(key));
    }
    let Value::Object(target) = receiver else {
        return fail(strict, || VmError::non_object_receiver(key));
    };

    match target.get_own_property(key)? {
        Some(existing) => {
            if existing.is_accessor_descriptor() {
                return fail(strict, || VmError::cannot_redefine(key));
            }
            if !existing.is_writable() {
                return fail(strict, || VmError::not_writable(key));
            }
            if !target.is_exotic() && target.write_data(key, value.clone()) {
                return Ok(true);
            }
            target.define_own_property(key, &PropertyDescriptor::value_only(value), strict)
        }
        None => target.define_own_property(key, &PropertyDescriptor::data_default(value), strict),
    }
}

/// Call `setter` with `receiver` as `this`
pub fn invoke_setter(setter: &ObjectRef, receiver: &Value, value: Value) -> VmResult<bool> {
    setter.call(receiver, &[value])?;
    Ok(true)
}

/// OrdinaryDefineOwnProperty
pub fn ordinary_define_own_property(
    o: &JsObject,
    key: &PropertyKey,
    desc: &PropertyDescriptor,
    throw: bool,
) -> VmResult<bool> {
    let current = ordinary_get_own_property(o, key);
    validate_and_apply(Some(o), key, o.is_extensible_raw(), desc, current.as_ref(), throw)
}

/// IsCompatiblePropertyDescriptor
pub fn is_compatible_property_descriptor(
    key: &PropertyKey,
    extensible: bool,
    desc: &PropertyDescriptor,
    current: Option<&PropertyDescriptor>,
) -> bool {
    validate_and_apply(None, key, extensible, desc, current, false).unwrap_or(false)
}

fn current_accessor(current: &PropertyDescriptor) -> Accessor {
    Accessor::new(
        current.get.as_ref().and_then(Value::as_object).cloned(),
        current.set.as_ref().and_then(Value::as_object).cloned(),
    )
}

fn same_field(new: &Option<Value>, current: &Option<Value>) -> bool {
    match (new, current) {
        (None, _) => true,
        (Some(new), Some(current)) => same_value(new, current),
        (Some(new), None) => new.is_undefined(),
    }
}

/// ValidateAndApplyPropertyDescriptor
///
/// With `o == None` only the validation runs.
pub fn validate_and_apply(
    o: Option<&JsObject>,
    key: &PropertyKey,
    extensible: bool,
    desc: &PropertyDescriptor,
    current: Option<&PropertyDescriptor>,
    throw: bool,
) -> VmResult<bool> {
    let Some(current) = current else {
        if !extensible {
            return fail(throw, || VmError::not_extensible(key));
        }
        if let Some(o) = o {
            let attributes = PropertyAttributes::new(
                desc.writable.unwrap_or(false),
                desc.is_enumerable(),
                desc.is_configurable(),
            );
            let slot = if desc.is_accessor_descriptor() {
                Slot::Accessor(desc.to_accessor(None)?)
            } else {
                Slot::Data(desc.value.clone().unwrap_or_default())
            };
            o.add_property(key.clone(), attributes, slot);
        }
        return Ok(true);
    };

    if desc.is_empty() {
        return Ok(true);
    }

    if !current.is_configurable() {
        if desc.configurable == Some(true) {
            return fail(throw, || VmError::cannot_redefine(key));
        }
        if desc.enumerable.is_some_and(|e| e != current.is_enumerable()) {
            return fail(throw, || VmError::cannot_redefine(key));
        }
        if !desc.is_generic_descriptor()
            && desc.is_accessor_descriptor() != current.is_accessor_descriptor()
        {
            return fail(throw, || VmError::cannot_redefine(key));
        }
        if current.is_accessor_descriptor() {
            if !same_field(&desc.get, &current.get) || !same_field(&desc.set, &current.set) {
                return fail(throw, || VmError::cannot_redefine(key));
            }
        } else if !current.is_writable() {
            if desc.writable == Some(true) {
                return fail(throw, || VmError::cannot_redefine(key));
            }
            if !same_field(&desc.value, &current.value) {
                return fail(throw, || VmError::cannot_redefine(key));
            }
        }
    }

    let Some(o) = o else {
        return Ok(true);
    };

    let enumerable = desc.enumerable.unwrap_or(current.is_enumerable());
    let configurable = desc.configurable.unwrap_or(current.is_configurable());

    if current.is_data_descriptor() && desc.is_accessor_descriptor() {
        let attributes = PropertyAttributes::new(false, enumerable, configurable);
        o.replace_property(key, attributes, Slot::Accessor(desc.to_accessor(None)?));
    } else if current.is_accessor_descriptor() && desc.is_data_descriptor() {
        let attributes = PropertyAttributes::new(desc.is_writable(), enumerable, configurable);
        let value = desc.value.clone().unwrap_or_default();
        o.replace_property(key, attributes, Slot::Data(value));
    } else if current.is_accessor_descriptor() {
        let accessor = desc.to_accessor(Some(&current_accessor(current)))?;
        let attributes = PropertyAttributes::new(false, enumerable, configurable);
        o.replace_property(key, attributes, Slot::Accessor(accessor));
    } else {
        let attributes = PropertyAttributes::new(
            desc.writable.unwrap_or(current.is_writable()),
            enumerable,
            configurable,
        );
        let value = desc
            .value
            .clone()
            .or_else(|| current.value.clone())
            .unwrap_or_default();
        let unchanged = attributes.writable == current.is_writable()
            && enumerable == current.is_enumerable()
            && configurable == current.is_configurable();
        if !(unchanged && o.write_data(key, value.clone())) {
            o.replace_property(key, attributes, Slot::Data(value));
        }
    }
    Ok(true)
}

/// OrdinaryDelete
pub fn ordinary_delete(o: &JsObject, key: &PropertyKey, strict: bool) -> VmResult<bool> {
    match o.lookup_own(key) {
        None => Ok(true),
        Some((attributes, _)) if !attributes.configurable => {
            fail(strict, || VmError::not_configurable(key))
        }
        Some(_) => {
            o.remove_property(key);
            Ok(true)
        }
    }
}

/// OrdinaryOwnPropertyKeys, filtered by kind
pub fn ordinary_own_property_keys(o: &JsObject, strings: bool, symbols: bool) -> Vec<PropertyKey> {
    let (mut keys, ordered) = o.raw_keys();
    if !(ordered && o.store().config().fast_own_keys) {
        // stable: strings and symbols keep creation order
        keys.sort_by(compare_property_keys);
    }
    if !(strings && symbols) {
        keys.retain(|k| if k.is_symbol() { symbols } else { strings });
    }
    keys
}

/// OrdinaryPreventExtensions. Always succeeds.
pub fn ordinary_prevent_extensions(o: &JsObject) -> bool {
    o.prevent_extensions_raw();
    true
}

/// SetIntegrityLevel for ordinary objects
pub fn ordinary_set_integrity_level(o: &JsObject, freeze: bool) -> bool {
    o.apply_integrity(freeze);
    ordinary_prevent_extensions(o)
}

/// TestIntegrityLevel for ordinary objects
pub fn ordinary_test_integrity_level(o: &JsObject, frozen: bool) -> bool {
    if o.is_extensible_raw() {
        return false;
    }
    if let Some((sealed, is_frozen)) = o.shape_integrity() {
        if is_frozen || (sealed && !frozen) {
            return true;
        }
    }
    let (keys, _) = o.raw_keys();
    keys.iter().all(|key| match o.lookup_own(key) {
        Some((attributes, slot)) => {
            !attributes.configurable
                && !(frozen && matches!(slot, Slot::Data(_)) && attributes.writable)
        }
        None => true,
    })
}

/// OrdinarySetPrototypeOf. Never throws.
pub fn ordinary_set_prototype_of(o: &ObjectRef, prototype: Option<ObjectRef>) -> bool {
    if o.prototype() == prototype {
        return true;
    }
    if !o.is_extensible_raw() {
        return false;
    }
    if !check_proto_cycle(o, prototype.as_ref()) {
        return false;
    }
    o.set_prototype_raw(prototype);
    true
}
