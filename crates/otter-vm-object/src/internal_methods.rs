//! Internal method dispatch
//!
//! Every `[[...]]` internal method is an inherent method on `ObjectRef`.
//! Proxies route to `proxy_operations`; all other kinds use the ordinary
//! algorithms.
//!
//! Proxy dispatch is counted per thread. A prototype chain may close through
//! a proxy target, so lookups can re-enter the same proxy without end; past
//! `ObjectModelConfig::max_proxy_depth` they fail with a `RangeError`.

use std::cell::Cell;

use crate::descriptor::PropertyDescriptor;
use crate::error::{VmError, VmResult, fail};
use crate::object::ObjectRef;
use crate::ordinary::{
    ordinary_define_own_property, ordinary_delete, ordinary_get, ordinary_get_own_property,
    ordinary_has, ordinary_own_property_keys, ordinary_prevent_extensions, ordinary_set,
    ordinary_set_integrity_level, ordinary_set_prototype_of, ordinary_test_integrity_level,
};
use crate::property::PropertyKey;
use crate::proxy::JsProxy;
use crate::proxy_operations as proxy;
use crate::value::Value;

thread_local! {
    static PROXY_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One level of proxy dispatch on this thread, released on drop
struct ProxyFrame;

impl ProxyFrame {
    fn enter(limit: usize) -> VmResult<Self> {
        PROXY_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                return Err(VmError::stack_overflow());
            }
            depth.set(current + 1);
            Ok(ProxyFrame)
        })
    }
}

impl Drop for ProxyFrame {
    fn drop(&mut self) {
        PROXY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

impl ObjectRef {
    /// Proxy slots of this object together with a dispatch frame
    fn enter_proxy(&self) -> VmResult<Option<(&JsProxy, ProxyFrame)>> {
        match self.as_proxy() {
            Some(p) => {
                let frame = ProxyFrame::enter(self.store().config().max_proxy_depth)?;
                Ok(Some((p, frame)))
            }
            None => Ok(None),
        }
    }

    /// `[[GetPrototypeOf]]`
    pub fn get_prototype_of(&self) -> VmResult<Option<ObjectRef>> {
        match self.enter_proxy()? {
            Some((p, _frame)) => proxy::proxy_get_prototype_of(p),
            None => Ok(self.prototype()),
        }
    }

    /// `[[SetPrototypeOf]]`
    pub fn set_prototype_of(&self, prototype: Option<ObjectRef>) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => proxy::proxy_set_prototype_of(p, prototype),
            None => Ok(ordinary_set_prototype_of(self, prototype)),
        }
    }

    /// `[[IsExtensible]]`
    pub fn is_extensible(&self) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => proxy::proxy_is_extensible(p),
            None => Ok(self.is_extensible_raw()),
        }
    }

    /// `[[PreventExtensions]]`; a refusal throws when `throw` is set
    pub fn prevent_extensions(&self, throw: bool) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => {
                if proxy::proxy_prevent_extensions(p)? {
                    Ok(true)
                } else {
                    fail(throw, || {
                        VmError::type_error("proxy preventExtensions handler returned false")
                    })
                }
            }
            None => Ok(ordinary_prevent_extensions(self)),
        }
    }

    /// `[[GetOwnProperty]]`
    pub fn get_own_property(&self, key: &PropertyKey) -> VmResult<Option<PropertyDescriptor>> {
        match self.enter_proxy()? {
            Some((p, _frame)) => proxy::proxy_get_own_property(p, key),
            None => Ok(ordinary_get_own_property(self, key)),
        }
    }

    /// `[[DefineOwnProperty]]`; a rejection throws when `throw` is set
    pub fn define_own_property(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
        throw: bool,
    ) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => {
                if proxy::proxy_define_own_property(p, key, desc)? {
                    Ok(true)
                } else {
                    fail(throw, || VmError::cannot_redefine(key))
                }
            }
            None => ordinary_define_own_property(self, key, desc, throw),
        }
    }

    /// `[[HasProperty]]`
    pub fn has_property(&self, key: &PropertyKey) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => proxy::proxy_has(p, key),
            None => ordinary_has(self, key),
        }
    }

    /// HasOwnProperty
    pub fn has_own_property(&self, key: &PropertyKey) -> VmResult<bool> {
        Ok(self.get_own_property(key)?.is_some())
    }

    /// `[[Get]]` that reports a missing property as `None`.
    ///
    /// Proxies always produce a value.
    pub fn get_helper(&self, key: &PropertyKey, receiver: &Value) -> VmResult<Option<Value>> {
        match self.enter_proxy()? {
            Some((p, _frame)) => proxy::proxy_get(p, key, receiver).map(Some),
            None => ordinary_get(self, key, receiver),
        }
    }

    /// `[[Get]]`
    pub fn get(&self, key: &PropertyKey, receiver: &Value) -> VmResult<Value> {
        Ok(self.get_helper(key, receiver)?.unwrap_or_default())
    }

    /// `[[Get]]` with this object as the receiver
    pub fn get_value(&self, key: &PropertyKey) -> VmResult<Value> {
        self.get(key, &Value::Object(self.clone()))
    }

    /// `[[Set]]`; in strict mode a failed write throws
    pub fn set(
        &self,
        key: &PropertyKey,
        value: Value,
        receiver: &Value,
        strict: bool,
    ) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => {
                if proxy::proxy_set(p, key, value, receiver)? {
                    Ok(true)
                } else {
                    fail(strict, || {
                        VmError::type_error(format!(
                            "proxy set handler returned false for property '{key}'"
                        ))
                    })
                }
            }
            None => ordinary_set(self, key, value, receiver, strict),
        }
    }

    /// `[[Set]]` with this object as the receiver
    pub fn put(&self, key: &PropertyKey, value: Value, strict: bool) -> VmResult<bool> {
        self.set(key, value, &Value::Object(self.clone()), strict)
    }

    /// `[[Delete]]`; in strict mode a failed delete throws
    pub fn delete(&self, key: &PropertyKey, strict: bool) -> VmResult<bool> {
        match self.enter_proxy()? {
            Some((p, _frame)) => {
                if proxy::proxy_delete(p, key)? {
                    Ok(true)
                } else {
                    fail(strict, || {
                        VmError::type_error(format!(
                            "proxy deleteProperty handler returned false for property '{key}'"
                        ))
                    })
                }
            }
            None => ordinary_delete(self, key, strict),
        }
    }

    /// `[[OwnPropertyKeys]]`, filtered to string and/or symbol keys
    pub fn own_property_keys(&self, strings: bool, symbols: bool) -> VmResult<Vec<PropertyKey>> {
        match self.enter_proxy()? {
            Some((p, _frame)) => {
                let mut keys = proxy::proxy_own_keys(p)?;
                if !(strings && symbols) {
                    keys.retain(|k| if k.is_symbol() { symbols } else { strings });
                }
                Ok(keys)
            }
            None => Ok(ordinary_own_property_keys(self, strings, symbols)),
        }
    }

    /// DefinePropertyOrThrow
    pub fn define_property_or_throw(
        &self,
        key: &PropertyKey,
        desc: &PropertyDescriptor,
    ) -> VmResult<()> {
        self.define_own_property(key, desc, true)?;
        Ok(())
    }

    /// CreateDataProperty
    pub fn create_data_property(&self, key: PropertyKey, value: Value) -> VmResult<bool> {
        self.define_own_property(&key, &PropertyDescriptor::data_default(value), false)
    }

    /// CreateDataPropertyOrThrow
    pub fn create_data_property_or_throw(&self, key: PropertyKey, value: Value) -> VmResult<()> {
        self.define_property_or_throw(&key, &PropertyDescriptor::data_default(value))
    }

    /// SetIntegrityLevel (`Object.seal` / `Object.freeze` without the throw)
    pub fn set_integrity_level(&self, freeze: bool, throw: bool) -> VmResult<bool> {
        if !self.is_exotic() {
            return Ok(ordinary_set_integrity_level(self, freeze));
        }

        if !self.prevent_extensions(false)? {
            return fail(throw, || VmError::type_error("Cannot prevent extensions"));
        }
        let keys = self.own_property_keys(true, true)?;
        for key in keys {
            let desc = if freeze {
                match self.get_own_property(&key)? {
                    Some(current) if current.is_accessor_descriptor() => {
                        PropertyDescriptor::empty().with_configurable(false)
                    }
                    Some(_) => PropertyDescriptor::empty()
                        .with_configurable(false)
                        .with_writable(false),
                    None => continue,
                }
            } else {
                PropertyDescriptor::empty().with_configurable(false)
            };
            self.define_property_or_throw(&key, &desc)?;
        }
        Ok(true)
    }

    /// TestIntegrityLevel (`Object.isSealed` / `Object.isFrozen`)
    pub fn test_integrity_level(&self, frozen: bool) -> VmResult<bool> {
        if !self.is_exotic() {
            return Ok(ordinary_test_integrity_level(self, frozen));
        }

        if self.is_extensible()? {
            return Ok(false);
        }
        for key in self.own_property_keys(true, true)? {
            if let Some(desc) = self.get_own_property(&key)? {
                if desc.is_configurable() {
                    return Ok(false);
                }
                if frozen && desc.is_data_descriptor() && desc.is_writable() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyAttributes;
    use crate::config::ObjectModelConfig;
    use crate::shape::ShapeStore;

    #[test]
    fn test_put_and_get_value() {
        let store = ShapeStore::new();
        let obj = ObjectRef::new_ordinary(&store, None);
        let key = PropertyKey::string("answer");
        assert!(obj.put(&key, Value::int32(42), true).unwrap());
        assert_eq!(obj.get_value(&key).unwrap(), Value::int32(42));
        assert!(obj.has_own_property(&key).unwrap());
        assert_eq!(
            obj.get_value(&PropertyKey::string("missing")).unwrap(),
            Value::Undefined
        );
    }

    #[test]
    fn test_create_data_property_on_frozen() {
        let store = ShapeStore::new();
        let obj = ObjectRef::new_ordinary(&store, None);
        assert!(obj.set_integrity_level(true, true).unwrap());
        assert!(
            !obj.create_data_property(PropertyKey::string("x"), Value::Null)
                .unwrap()
        );
        assert!(matches!(
            obj.create_data_property_or_throw(PropertyKey::string("x"), Value::Null),
            Err(VmError::TypeError(_))
        ));
    }

    #[test]
    fn test_freeze_twice_is_idempotent() {
        let store = ShapeStore::new();
        let obj = ObjectRef::new_ordinary(&store, None);
        obj.create_data_property_or_throw(PropertyKey::string("a"), Value::int32(1))
            .unwrap();
        obj.set_integrity_level(true, true).unwrap();
        let shape = obj.shape().unwrap();
        obj.set_integrity_level(true, true).unwrap();
        assert!(std::sync::Arc::ptr_eq(&shape, &obj.shape().unwrap()));
        assert!(obj.test_integrity_level(true).unwrap());
        assert_eq!(
            obj.get_own_property(&PropertyKey::string("a")).unwrap(),
            Some(PropertyDescriptor::data(
                Value::int32(1),
                PropertyAttributes::new(false, true, false)
            ))
        );
    }

    #[test]
    fn test_strict_delete_throws() {
        let store = ShapeStore::new();
        let obj = ObjectRef::new_ordinary(&store, None);
        let key = PropertyKey::string("fixed");
        obj.define_property_or_throw(
            &key,
            &PropertyDescriptor::data(Value::Null, PropertyAttributes::frozen()),
        )
        .unwrap();
        assert!(!obj.delete(&key, false).unwrap());
        assert!(matches!(obj.delete(&key, true), Err(VmError::TypeError(_))));
    }

    #[test]
    fn test_proxy_target_cycle_is_a_range_error() {
        let store = ShapeStore::new();
        let obj = ObjectRef::new_ordinary(&store, None);
        let handler = ObjectRef::new_ordinary(&store, None);
        let proxy = ObjectRef::new_proxy(&store, obj.clone(), handler);
        assert!(obj.set_prototype_of(Some(proxy)).unwrap());

        let key = PropertyKey::string("missing");
        let overflow = |r: VmResult<()>| {
            matches!(
                r,
                Err(VmError::RangeError(ref msg)) if msg == "Maximum call stack size exceeded"
            )
        };
        assert!(overflow(obj.get_value(&key).map(|_| ())));
        assert!(overflow(obj.has_property(&key).map(|_| ())));
        assert!(overflow(obj.put(&key, Value::Null, false).map(|_| ())));

        // Own lookups never reach the cycle and the depth counter unwinds
        obj.create_data_property_or_throw(PropertyKey::string("own"), Value::int32(1))
            .unwrap();
        assert_eq!(
            obj.get_value(&PropertyKey::string("own")).unwrap(),
            Value::int32(1)
        );
        PROXY_DEPTH.with(|depth| assert_eq!(depth.get(), 0));
    }

    #[test]
    fn test_proxy_nesting_limit() {
        let store = ShapeStore::with_config(ObjectModelConfig::default().with_max_proxy_depth(2));
        let base = ObjectRef::new_ordinary(&store, None);
        base.put(&PropertyKey::string("x"), Value::int32(5), true)
            .unwrap();
        let handler = || ObjectRef::new_ordinary(&store, None);
        let inner = ObjectRef::new_proxy(&store, base, handler());
        let outer = ObjectRef::new_proxy(&store, inner, handler());
        let outermost = ObjectRef::new_proxy(&store, outer.clone(), handler());

        assert_eq!(
            outer.get_value(&PropertyKey::string("x")).unwrap(),
            Value::int32(5)
        );
        assert!(matches!(
            outermost.get_value(&PropertyKey::string("x")),
            Err(VmError::RangeError(_))
        ));
    }
}
