//! Property descriptors as exchanged with the rest of the engine
//!
//! A `PropertyDescriptor` is the partial record used by
//! `[[DefineOwnProperty]]` and returned by `[[GetOwnProperty]]`. Every field
//! is optional and absence is meaningful: defining `{ enumerable: false }` on
//! an existing property only touches that one attribute. Descriptors are
//! transient; committing one stores a compact `Property` in a shape instead.

use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::object::ObjectRef;
use crate::property::{Accessor, PropertyAttributes, PropertyKey};
use crate::shape::ShapeStore;
use crate::value::Value;

/// Partial property descriptor
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyDescriptor {
    /// `[[Value]]`
    pub value: Option<Value>,
    /// `[[Writable]]`
    pub writable: Option<bool>,
    /// `[[Get]]`: a callable object or `undefined`
    pub get: Option<Value>,
    /// `[[Set]]`: a callable object or `undefined`
    pub set: Option<Value>,
    /// `[[Enumerable]]`
    pub enumerable: Option<bool>,
    /// `[[Configurable]]`
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    /// Descriptor with every field absent
    pub fn empty() -> Self {
        Self::default()
    }

    /// Complete data descriptor
    pub fn data(value: Value, attributes: PropertyAttributes) -> Self {
        Self {
            value: Some(value),
            writable: Some(attributes.writable),
            enumerable: Some(attributes.enumerable),
            configurable: Some(attributes.configurable),
            ..Self::default()
        }
    }

    /// Writable, enumerable, configurable data descriptor
    pub fn data_default(value: Value) -> Self {
        Self::data(value, PropertyAttributes::data())
    }

    /// Descriptor carrying only a value
    pub fn value_only(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    /// Complete accessor descriptor
    pub fn accessor(
        getter: Option<ObjectRef>,
        setter: Option<ObjectRef>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            get: Some(getter.map(Value::Object).unwrap_or_default()),
            set: Some(setter.map(Value::Object).unwrap_or_default()),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Self::default()
        }
    }

    /// Set `[[Writable]]`
    pub fn with_writable(mut self, writable: bool) -> Self {
        self.writable = Some(writable);
        self
    }

    /// Set `[[Enumerable]]`
    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = Some(enumerable);
        self
    }

    /// Set `[[Configurable]]`
    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = Some(configurable);
        self
    }

    /// IsDataDescriptor
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// IsAccessorDescriptor
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// IsGenericDescriptor
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_data_descriptor() && !self.is_accessor_descriptor()
    }

    /// Every field absent
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `[[Writable]]`, absent meaning false
    pub fn is_writable(&self) -> bool {
        self.writable.unwrap_or(false)
    }

    /// `[[Enumerable]]`, absent meaning false
    pub fn is_enumerable(&self) -> bool {
        self.enumerable.unwrap_or(false)
    }

    /// `[[Configurable]]`, absent meaning false
    pub fn is_configurable(&self) -> bool {
        self.configurable.unwrap_or(false)
    }

    /// The setter, if present and callable
    pub fn setter(&self) -> Option<&ObjectRef> {
        self.set.as_ref().and_then(Value::as_object)
    }

    /// CompletePropertyDescriptor
    pub fn complete(&mut self) {
        if self.is_generic_descriptor() || self.is_data_descriptor() {
            self.value.get_or_insert(Value::Undefined);
            self.writable.get_or_insert(false);
        } else {
            self.get.get_or_insert(Value::Undefined);
            self.set.get_or_insert(Value::Undefined);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
    }

    /// Accessor pair described by this descriptor, falling back to
    /// `current` for absent fields
    pub(crate) fn to_accessor(&self, current: Option<&Accessor>) -> VmResult<Accessor> {
        Ok(Accessor {
            getter: match &self.get {
                Some(value) => accessor_function(value, "Getter")?,
                None => current.and_then(|a| a.getter.clone()),
            },
            setter: match &self.set {
                Some(value) => accessor_function(value, "Setter")?,
                None => current.and_then(|a| a.setter.clone()),
            },
        })
    }
}

fn accessor_function(value: &Value, what: &str) -> VmResult<Option<ObjectRef>> {
    match value {
        Value::Undefined => Ok(None),
        Value::Object(obj) if obj.is_callable() => Ok(Some(obj.clone())),
        other => Err(VmError::type_error(format!(
            "{what} must be a function: {other:?}"
        ))),
    }
}

const FIELD_NAMES: [&str; 6] = ["value", "writable", "get", "set", "enumerable", "configurable"];

/// FromPropertyDescriptor: expose a descriptor as a plain object.
///
/// The result has a null prototype; realm intrinsics are not available at
/// this layer.
pub fn from_property_descriptor(
    store: &Arc<ShapeStore>,
    desc: &PropertyDescriptor,
) -> VmResult<ObjectRef> {
    let obj = ObjectRef::new_ordinary(store, None);
    let fields = [
        desc.value.clone(),
        desc.writable.map(Value::Boolean),
        desc.get.clone(),
        desc.set.clone(),
        desc.enumerable.map(Value::Boolean),
        desc.configurable.map(Value::Boolean),
    ];
    for (name, field) in FIELD_NAMES.into_iter().zip(fields) {
        if let Some(value) = field {
            obj.create_data_property_or_throw(PropertyKey::string(name), value)?;
        }
    }
    Ok(obj)
}

/// ToPropertyDescriptor: read a descriptor back from an object.
pub fn to_property_descriptor(value: &Value) -> VmResult<PropertyDescriptor> {
    let obj = value
        .as_object()
        .ok_or_else(|| VmError::type_error("Property description must be an object"))?;

    let mut fields: [Option<Value>; 6] = Default::default();
    for (name, field) in FIELD_NAMES.into_iter().zip(fields.iter_mut()) {
        let key = PropertyKey::string(name);
        if obj.has_property(&key)? {
            *field = Some(obj.get(&key, value)?);
        }
    }
    let [value_field, writable, get, set, enumerable, configurable] = fields;

    for (accessor, what) in [(&get, "Getter"), (&set, "Setter")] {
        if let Some(f) = accessor {
            if !f.is_undefined() && !f.is_callable() {
                return Err(VmError::type_error(format!("{what} must be a function: {f:?}")));
            }
        }
    }

    let desc = PropertyDescriptor {
        value: value_field,
        writable: writable.map(|v| v.to_boolean()),
        get,
        set,
        enumerable: enumerable.map(|v| v.to_boolean()),
        configurable: configurable.map(|v| v.to_boolean()),
    };
    if desc.is_data_descriptor() && desc.is_accessor_descriptor() {
        return Err(VmError::type_error(
            "Invalid property descriptor. Cannot both specify accessors and a value or writable attribute",
        ));
    }
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_classification() {
        assert!(PropertyDescriptor::empty().is_generic_descriptor());
        assert!(PropertyDescriptor::empty().is_empty());
        assert!(PropertyDescriptor::value_only(Value::Null).is_data_descriptor());
        let acc = PropertyDescriptor::accessor(None, None, true, false);
        assert!(acc.is_accessor_descriptor());
        assert_eq!(acc.get, Some(Value::Undefined));
        let generic = PropertyDescriptor::empty().with_enumerable(true);
        assert!(generic.is_generic_descriptor() && !generic.is_empty());
    }

    #[test]
    fn test_complete_generic_as_data() {
        let mut desc = PropertyDescriptor::empty().with_configurable(true);
        desc.complete();
        assert_eq!(desc.value, Some(Value::Undefined));
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(true));
    }

    #[test]
    fn test_descriptor_object_round_trip() {
        let store = ShapeStore::new();
        let attributes = PropertyAttributes::new(true, false, true);
        let desc = PropertyDescriptor::data(Value::number(3.0), attributes);
        let obj = from_property_descriptor(&store, &desc).unwrap();
        assert_eq!(to_property_descriptor(&Value::Object(obj)).unwrap(), desc);
    }

    #[test]
    fn test_to_descriptor_rejects_mixed_fields() {
        let store = ShapeStore::new();
        let obj = ObjectRef::new_ordinary(&store, None);
        obj.create_data_property_or_throw(PropertyKey::string("value"), Value::number(1.0))
            .unwrap();
        obj.create_data_property_or_throw(PropertyKey::string("get"), Value::Undefined)
            .unwrap();
        assert!(matches!(
            to_property_descriptor(&Value::Object(obj)),
            Err(VmError::TypeError(_))
        ));
    }

    #[test]
    fn test_non_callable_getter_rejected() {
        let desc = PropertyDescriptor {
            get: Some(Value::number(1.0)),
            ..PropertyDescriptor::default()
        };
        assert!(desc.to_accessor(None).is_err());
    }
}
