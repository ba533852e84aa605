//! Hidden Classes (Shapes) for property storage.
//!
//! A Shape describes the structure of an object: which properties it has, in
//! what order, with which attributes, and at what slot each value lives.
//! Shapes are immutable and shared between objects with the same structure
//! using a transition graph: applying the same operation to the same base
//! shape always yields the same child shape, so shape identity can be used as
//! a layout check.
//!
//! ```text
//!        root
//!       /    \
//!    +"x"    +"y"
//!     |        |
//!   {x}      {y}
//!     |  \
//!  +"y"  freeze
//!     |     \
//!  {x,y}   {x} (frozen)
//! ```
//!
//! Child shapes keep their parent alive (`Arc`), parents only remember their
//! children weakly, so unused branches are reclaimed with the last object
//! that uses them.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::config::ObjectModelConfig;
use crate::property::{
    Property, PropertyAttributes, PropertyKey, PropertyKind, keeps_enumeration_order,
};

/// Unique identifier of a shape, for logging and debugging
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

/// An edge in the transition graph
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Append a new property
    AddProperty {
        /// Property key (must not already be present)
        key: PropertyKey,
        /// Attributes of the new property
        attributes: PropertyAttributes,
        /// Data or accessor
        kind: PropertyKind,
    },
    /// Remove a property
    RemoveProperty(PropertyKey),
    /// Change the attributes or kind of an existing property
    Reconfigure {
        /// Property key (must be present)
        key: PropertyKey,
        /// New attributes
        attributes: PropertyAttributes,
        /// New kind
        kind: PropertyKind,
    },
    /// Mark the layout non-extensible
    PreventExtensions,
    /// Mark every property non-configurable
    Seal,
    /// Seal, and mark every data property non-writable
    Freeze,
}

type PropertyTable = IndexMap<PropertyKey, Property, FxBuildHasher>;

/// A Shape defines the layout of properties in an object.
pub struct Shape {
    id: ShapeId,

    /// The shape this one was transitioned from. None for the root shape.
    parent: Option<Arc<Shape>>,

    /// Properties in creation order.
    properties: PropertyTable,

    /// Number of instance slots used by this layout.
    slot_count: usize,

    extensible: bool,

    /// Set by the seal/freeze transitions while it still holds for every
    /// property. Object-level sealed/frozen also requires non-extensibility.
    sealed: bool,
    frozen: bool,

    /// Creation order already equals enumeration order (indices ascending,
    /// then strings, then symbols).
    ordered: bool,

    /// Memoized children. Locked while a missing child is created so that
    /// concurrent transitions from the same base agree on one child.
    transitions: Mutex<FxHashMap<Transition, Weak<Shape>>>,
}

impl Shape {
    fn root(id: ShapeId) -> Self {
        Self {
            id,
            parent: None,
            properties: PropertyTable::default(),
            slot_count: 0,
            extensible: true,
            sealed: false,
            frozen: false,
            ordered: true,
            transitions: Mutex::new(FxHashMap::default()),
        }
    }

    /// Shape identifier
    pub fn id(&self) -> ShapeId {
        self.id
    }

    /// The shape this one was derived from
    pub fn parent(&self) -> Option<&Arc<Shape>> {
        self.parent.as_ref()
    }

    /// Look up a property by key
    pub fn lookup(&self, key: &PropertyKey) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Properties in creation order
    pub fn properties(&self) -> impl Iterator<Item = &Property> + '_ {
        self.properties.values()
    }

    /// Keys in creation order
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> + '_ {
        self.properties.keys()
    }

    /// Get the number of properties defined in this shape.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Number of instance slots this layout uses
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Can properties be added
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// Went through a seal (or freeze) transition
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Went through a freeze transition
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Whether `keys()` is already in OwnPropertyKeys order
    pub fn keys_in_enumeration_order(&self) -> bool {
        self.ordered
    }

    /// Applying `op` would not change this layout.
    fn is_noop(&self, op: &Transition) -> bool {
        match op {
            Transition::PreventExtensions => !self.extensible,
            Transition::Seal => self.sealed,
            Transition::Freeze => self.frozen,
            Transition::Reconfigure {
                key,
                attributes,
                kind,
            } => self
                .lookup(key)
                .is_some_and(|p| p.attributes == *attributes && p.kind == *kind),
            Transition::AddProperty { .. } | Transition::RemoveProperty(_) => false,
        }
    }

    fn derive(self: &Arc<Self>, id: ShapeId, op: &Transition) -> Self {
        let mut child = Self {
            id,
            parent: Some(Arc::clone(self)),
            properties: self.properties.clone(),
            slot_count: self.slot_count,
            extensible: self.extensible,
            sealed: self.sealed,
            frozen: self.frozen,
            ordered: self.ordered,
            transitions: Mutex::new(FxHashMap::default()),
        };

        match op {
            Transition::AddProperty {
                key,
                attributes,
                kind,
            } => {
                debug_assert!(!self.properties.contains_key(key), "duplicate property {key}");
                child.ordered =
                    self.ordered && keeps_enumeration_order(self.properties.keys().last(), key);
                child.properties.insert(
                    key.clone(),
                    Property {
                        key: key.clone(),
                        attributes: *attributes,
                        kind: *kind,
                        slot: self.slot_count,
                    },
                );
                child.slot_count += 1;
                child.sealed = false;
                child.frozen = false;
            }
            Transition::RemoveProperty(key) => {
                child.properties = self
                    .properties
                    .values()
                    .filter(|p| &p.key != key)
                    .enumerate()
                    .map(|(slot, p)| (p.key.clone(), Property { slot, ..p.clone() }))
                    .collect();
                child.slot_count = child.properties.len();
                let mut last: Option<&PropertyKey> = None;
                child.ordered = child.properties.keys().all(|k| {
                    let ok = keeps_enumeration_order(last, k);
                    last = Some(k);
                    ok
                });
            }
            Transition::Reconfigure {
                key,
                attributes,
                kind,
            } => {
                if let Some(property) = child.properties.get_mut(key) {
                    property.attributes = *attributes;
                    property.kind = *kind;
                }
                child.sealed = self.sealed && !attributes.configurable;
                child.frozen = child.sealed
                    && (*kind == PropertyKind::Accessor || !attributes.writable);
            }
            Transition::PreventExtensions => child.extensible = false,
            Transition::Seal => {
                for property in child.properties.values_mut() {
                    property.attributes = property.attributes.sealed();
                }
                child.sealed = true;
            }
            Transition::Freeze => {
                for property in child.properties.values_mut() {
                    property.attributes = property.attributes.freeze(property.kind);
                }
                child.sealed = true;
                child.frozen = true;
            }
        }
        child
    }
}

impl std::fmt::Debug for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shape")
            .field("id", &self.id.0)
            .field("keys", &self.properties.keys().collect::<Vec<_>>())
            .field("extensible", &self.extensible)
            .field("sealed", &self.sealed)
            .field("frozen", &self.frozen)
            .finish()
    }
}

/// Transition table size at which dead edges start being swept
const MIN_PRUNE_EDGES: usize = 16;

/// Owner of the root shape and the object model configuration.
///
/// `Send + Sync`: one store can back objects on any number of threads, each
/// thread mutating only its own objects.
pub struct ShapeStore {
    root: Arc<Shape>,
    config: ObjectModelConfig,
    next_id: AtomicU32,
    shapes_created: AtomicUsize,
}

impl ShapeStore {
    /// Create a store with the default configuration
    pub fn new() -> Arc<Self> {
        Self::with_config(ObjectModelConfig::default())
    }

    /// Create a store with a custom configuration
    pub fn with_config(config: ObjectModelConfig) -> Arc<Self> {
        Arc::new(Self {
            root: Arc::new(Shape::root(ShapeId(0))),
            config,
            next_id: AtomicU32::new(1),
            shapes_created: AtomicUsize::new(1),
        })
    }

    /// The empty, extensible shape every new object starts from
    pub fn root(&self) -> &Arc<Shape> {
        &self.root
    }

    /// Configuration
    pub fn config(&self) -> &ObjectModelConfig {
        &self.config
    }

    /// Number of shapes allocated so far (including the root)
    pub fn shapes_created(&self) -> usize {
        self.shapes_created.load(Ordering::Relaxed)
    }

    /// Find the transition for `op` from `shape`, or create it.
    ///
    /// Operations that would not change the layout (sealing a sealed shape,
    /// reconfiguring to the same attributes, ...) return `shape` itself.
    pub fn transition(&self, shape: &Arc<Shape>, op: Transition) -> Arc<Shape> {
        if shape.is_noop(&op) {
            return Arc::clone(shape);
        }

        let mut transitions = shape.transitions.lock();
        if let Some(existing) = transitions.get(&op).and_then(Weak::upgrade) {
            return existing;
        }

        let id = ShapeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let child = Arc::new(shape.derive(id, &op));
        self.shapes_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(
            target: "otter::shape",
            parent = shape.id.0,
            child = id.0,
            properties = child.property_count(),
            ?op,
            "shape transition"
        );

        // Children die with the objects using them. Sweep their edges each
        // time the table reaches a new power of two.
        let edges = transitions.len();
        if edges >= MIN_PRUNE_EDGES && edges.is_power_of_two() {
            transitions.retain(|_, child| child.strong_count() > 0);
        }
        transitions.insert(op, Arc::downgrade(&child));
        child
    }
}
