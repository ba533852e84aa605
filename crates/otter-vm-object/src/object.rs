//! JavaScript objects with hidden classes (shapes)
//!
//! A `JsObject` is the per-instance half of the object model: an object
//! kind, a prototype link, and property storage. Shape-backed storage keeps
//! one value slot per property of the current shape; dictionary storage keeps
//! a private hash map instead (see `dictionary.rs`).
//!
//! The methods here are the raw instance store. They never run user code and
//! never look at the prototype chain; the language-level algorithms in `ordinary.rs`
//! are built on top of them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::dictionary::{DictionaryEntry, DictionaryMap};
use crate::error::{VmError, VmResult};
use crate::object_cell::ObjectCell;
use crate::property::{PropertyAttributes, PropertyKey, PropertyKind, Slot};
use crate::proxy::JsProxy;
use crate::shape::{Shape, ShapeStore, Transition};
use crate::value::Value;

/// Signature of a native function: `(this, arguments) -> result`
pub type NativeFn = dyn Fn(&Value, &[Value]) -> VmResult<Value>;

/// A callable backed by a Rust closure
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Rc<NativeFn>,
}

impl NativeFunction {
    /// Function name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The closed set of object kinds
pub enum ObjectKind {
    /// Plain object
    Ordinary,
    /// Ordinary object with a `[[Call]]` behavior
    Function(NativeFunction),
    /// Proxy exotic object
    Proxy(JsProxy),
}

impl ObjectKind {
    fn name(&self) -> &'static str {
        match self {
            Self::Ordinary => "Object",
            Self::Function(_) => "Function",
            Self::Proxy(_) => "Proxy",
        }
    }
}

/// Property storage of one object
#[derive(Debug)]
pub(crate) enum PropertyStorage {
    /// Layout described by a shared shape; `slots[p.slot]` holds property `p`
    Shaped {
        shape: Arc<Shape>,
        slots: SmallVec<[Slot; 4]>,
    },
    /// Private hash map (dictionary mode)
    Dictionary(DictionaryMap),
}

/// A JavaScript object
pub struct JsObject {
    store: Arc<ShapeStore>,
    kind: ObjectKind,
    /// Created through the object-literal path; only these objects may
    /// switch to dictionary mode.
    user_object: bool,
    prototype: ObjectCell<Option<ObjectRef>>,
    storage: ObjectCell<PropertyStorage>,
}

/// Shared handle to a `JsObject`
///
/// Equality and hashing are by identity.
#[derive(Clone)]
pub struct ObjectRef(Rc<JsObject>);

impl ObjectRef {
    fn allocate(
        store: &Arc<ShapeStore>,
        kind: ObjectKind,
        prototype: Option<ObjectRef>,
        user_object: bool,
    ) -> Self {
        Self(Rc::new(JsObject {
            storage: ObjectCell::new(PropertyStorage::Shaped {
                shape: Arc::clone(store.root()),
                slots: SmallVec::new(),
            }),
            store: Arc::clone(store),
            kind,
            user_object,
            prototype: ObjectCell::new(prototype),
        }))
    }

    /// Create a plain object (engine-internal objects, prototypes)
    pub fn new_ordinary(store: &Arc<ShapeStore>, prototype: Option<ObjectRef>) -> Self {
        Self::allocate(store, ObjectKind::Ordinary, prototype, false)
    }

    /// Create an object the way an object literal does. Such objects may
    /// switch to dictionary mode when their property set grows.
    pub fn new_user_object(store: &Arc<ShapeStore>, prototype: Option<ObjectRef>) -> Self {
        Self::allocate(store, ObjectKind::Ordinary, prototype, true)
    }

    /// Create a native function object
    pub fn new_function(
        store: &Arc<ShapeStore>,
        prototype: Option<ObjectRef>,
        name: &str,
        func: impl Fn(&Value, &[Value]) -> VmResult<Value> + 'static,
    ) -> Self {
        let kind = ObjectKind::Function(NativeFunction {
            name: Arc::from(name),
            func: Rc::new(func),
        });
        Self::allocate(store, kind, prototype, false)
    }

    /// Create a proxy object
    pub fn new_proxy(store: &Arc<ShapeStore>, target: ObjectRef, handler: ObjectRef) -> Self {
        Self::allocate(store, ObjectKind::Proxy(JsProxy::new(target, handler)), None, false)
    }

    /// Non-owning handle
    pub(crate) fn downgrade(&self) -> Weak<JsObject> {
        Rc::downgrade(&self.0)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// `[[Call]]`
    pub fn call(&self, this: &Value, args: &[Value]) -> VmResult<Value> {
        match &self.kind {
            ObjectKind::Function(f) => {
                let func = Rc::clone(&f.func);
                func(this, args)
            }
            ObjectKind::Proxy(proxy) => {
                let target = proxy
                    .target()
                    .ok_or_else(|| VmError::type_error("Cannot call a revoked proxy"))?;
                target.call(this, args)
            }
            ObjectKind::Ordinary => Err(VmError::type_error("object is not a function")),
        }
    }
}

impl Deref for ObjectRef {
    type Target = JsObject;

    fn deref(&self) -> &JsObject {
        &self.0
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {:p}]", self.kind.name(), Rc::as_ptr(&self.0))
    }
}

/// Accessor properties carry no writable bit; keep it cleared so that
/// equivalent layouts share shapes.
fn normalize(attributes: PropertyAttributes, kind: PropertyKind) -> PropertyAttributes {
    match kind {
        PropertyKind::Data => attributes,
        PropertyKind::Accessor => PropertyAttributes {
            writable: false,
            ..attributes
        },
    }
}

impl JsObject {
    /// The store this object takes its shapes and configuration from
    pub fn store(&self) -> &Arc<ShapeStore> {
        &self.store
    }

    /// Object kind
    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    /// Has a `[[Call]]` behavior
    pub fn is_callable(&self) -> bool {
        match &self.kind {
            ObjectKind::Function(_) => true,
            ObjectKind::Proxy(proxy) => proxy.target_raw().is_callable(),
            ObjectKind::Ordinary => false,
        }
    }

    /// Internal methods are not the ordinary ones
    pub fn is_exotic(&self) -> bool {
        matches!(self.kind, ObjectKind::Proxy(_))
    }

    /// Proxy data, if this is a proxy
    pub fn as_proxy(&self) -> Option<&JsProxy> {
        match &self.kind {
            ObjectKind::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Created through the object-literal path
    pub fn is_user_object(&self) -> bool {
        self.user_object
    }

    /// Stored prototype link
    pub fn prototype(&self) -> Option<ObjectRef> {
        self.prototype.get()
    }

    pub(crate) fn set_prototype_raw(&self, prototype: Option<ObjectRef>) {
        self.prototype.replace(prototype);
    }

    /// Current shape, `None` in dictionary mode
    pub fn shape(&self) -> Option<Arc<Shape>> {
        self.storage.read(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } => Some(Arc::clone(shape)),
            PropertyStorage::Dictionary(_) => None,
        })
    }

    /// Properties live in a private hash map
    pub fn is_dictionary_mode(&self) -> bool {
        self.storage
            .read(|storage| matches!(storage, PropertyStorage::Dictionary(_)))
    }

    /// Number of own properties
    pub fn property_count(&self) -> usize {
        self.storage.read(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } => shape.property_count(),
            PropertyStorage::Dictionary(map) => map.len(),
        })
    }

    /// Stored extensibility
    pub(crate) fn is_extensible_raw(&self) -> bool {
        self.storage.read(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } => shape.is_extensible(),
            PropertyStorage::Dictionary(map) => map.is_extensible(),
        })
    }

    /// Attributes and a copy of the slot of an own property
    pub(crate) fn lookup_own(&self, key: &PropertyKey) -> Option<(PropertyAttributes, Slot)> {
        self.storage.read(|storage| match storage {
            PropertyStorage::Shaped { shape, slots } => shape
                .lookup(key)
                .map(|p| (p.attributes, slots[p.slot].clone())),
            PropertyStorage::Dictionary(map) => {
                map.get(key).map(|e| (e.attributes, e.slot.clone()))
            }
        })
    }

    /// Overwrite the value of an existing data property. Attributes are not
    /// checked. Returns false if there is no such data property.
    pub(crate) fn write_data(&self, key: &PropertyKey, value: Value) -> bool {
        self.storage.write(|storage| match storage {
            PropertyStorage::Shaped { shape, slots } => match shape.lookup(key) {
                Some(p) if p.kind == PropertyKind::Data => {
                    slots[p.slot] = Slot::Data(value);
                    true
                }
                _ => false,
            },
            PropertyStorage::Dictionary(map) => match map.get_mut(key) {
                Some(entry) if matches!(entry.slot, Slot::Data(_)) => {
                    entry.slot = Slot::Data(value);
                    true
                }
                _ => false,
            },
        })
    }

    fn should_become_dictionary(&self, shape: &Shape, key: &PropertyKey) -> bool {
        let config = self.store.config();
        if !config.dictionary_objects || !self.user_object {
            return false;
        }
        let count = shape.property_count();
        (count == 0 && key.is_index()) || count >= config.dictionary_transition_threshold
    }

    /// Add a property that is not present yet
    pub(crate) fn add_property(
        &self,
        key: PropertyKey,
        attributes: PropertyAttributes,
        slot: Slot,
    ) {
        let kind = slot.kind();
        let attributes = normalize(attributes, kind);
        self.storage.write(|storage| {
            if let PropertyStorage::Shaped { shape, slots } = storage {
                debug_assert!(shape.lookup(&key).is_none(), "property {key} already present");
                if !self.should_become_dictionary(shape, &key) {
                    let next = self.store.transition(
                        shape,
                        Transition::AddProperty {
                            key,
                            attributes,
                            kind,
                        },
                    );
                    *shape = next;
                    slots.push(slot);
                    return;
                }
                tracing::debug!(
                    target: "otter::object",
                    properties = shape.property_count(),
                    index_key = key.is_index(),
                    "switching object to dictionary mode"
                );
                let map = DictionaryMap::from_shape(shape, slots);
                *storage = PropertyStorage::Dictionary(map);
            }
            if let PropertyStorage::Dictionary(map) = storage {
                map.insert(key, DictionaryEntry { attributes, slot });
            }
        });
    }

    /// Replace attributes and slot of an existing property.
    /// Returns false if the property is absent.
    pub(crate) fn replace_property(
        &self,
        key: &PropertyKey,
        attributes: PropertyAttributes,
        slot: Slot,
    ) -> bool {
        let kind = slot.kind();
        let attributes = normalize(attributes, kind);
        self.storage.write(|storage| match storage {
            PropertyStorage::Shaped { shape, slots } => {
                let Some(index) = shape.lookup(key).map(|p| p.slot) else {
                    return false;
                };
                let next = self.store.transition(
                    shape,
                    Transition::Reconfigure {
                        key: key.clone(),
                        attributes,
                        kind,
                    },
                );
                *shape = next;
                slots[index] = slot;
                true
            }
            PropertyStorage::Dictionary(map) => match map.get_mut(key) {
                Some(entry) => {
                    *entry = DictionaryEntry { attributes, slot };
                    true
                }
                None => false,
            },
        })
    }

    /// Remove a property. Returns false if it was absent.
    pub(crate) fn remove_property(&self, key: &PropertyKey) -> bool {
        self.storage.write(|storage| match storage {
            PropertyStorage::Shaped { shape, slots } => {
                let Some(index) = shape.lookup(key).map(|p| p.slot) else {
                    return false;
                };
                let next = self
                    .store
                    .transition(shape, Transition::RemoveProperty(key.clone()));
                *shape = next;
                slots.remove(index);
                debug_assert_eq!(shape.slot_count(), slots.len());
                true
            }
            PropertyStorage::Dictionary(map) => map.remove(key).is_some(),
        })
    }

    pub(crate) fn prevent_extensions_raw(&self) {
        self.storage.write(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } => {
                let next = self.store.transition(shape, Transition::PreventExtensions);
                *shape = next;
            }
            PropertyStorage::Dictionary(map) => map.prevent_extensions(),
        });
    }

    /// Seal or freeze every own property (extensibility is untouched)
    pub(crate) fn apply_integrity(&self, freeze: bool) {
        self.storage.write(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } => {
                let op = if freeze {
                    Transition::Freeze
                } else {
                    Transition::Seal
                };
                let next = self.store.transition(shape, op);
                *shape = next;
            }
            PropertyStorage::Dictionary(map) => map.seal(freeze),
        });
    }

    /// Stored integrity flags `(sealed, frozen)` when the shape records them
    pub(crate) fn shape_integrity(&self) -> Option<(bool, bool)> {
        self.storage.read(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } if !shape.is_extensible() => {
                Some((shape.is_sealed(), shape.is_frozen()))
            }
            _ => None,
        })
    }

    /// Own keys in creation order, and whether that order is already the
    /// enumeration order
    pub(crate) fn raw_keys(&self) -> (Vec<PropertyKey>, bool) {
        self.storage.read(|storage| match storage {
            PropertyStorage::Shaped { shape, .. } => (
                shape.keys().cloned().collect(),
                shape.keys_in_enumeration_order(),
            ),
            PropertyStorage::Dictionary(map) => (map.keys().cloned().collect(), false),
        })
    }
}
