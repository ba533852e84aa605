//! Dictionary-mode property storage.
//!
//! Objects whose property set keeps growing (or that start out as index
//! bags) stop using shapes and keep their properties in a private hash map
//! instead. Each mutation is then O(1) amortized and never allocates shared
//! shapes. The switch is one-way.
//!
//! Creation order still matters for OwnPropertyKeys, so deletions leave
//! tombstones that are compacted in bulk rather than shifting every later key.

use rustc_hash::FxHashMap;

use crate::property::{PropertyAttributes, PropertyKey, Slot};
use crate::shape::Shape;

/// Removed keys tolerated in the order list before it is compacted
const MIN_TOMBSTONES: usize = 8;

/// One dictionary-mode property
#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryEntry {
    /// Attribute bits
    pub attributes: PropertyAttributes,
    /// Value or accessor pair
    pub slot: Slot,
}

/// Hashed property map, kept in creation order.
///
/// Removal leaves a hole in `order` instead of shifting the keys behind it.
/// Holes are squeezed out once they outnumber the live keys.
#[derive(Debug)]
pub struct DictionaryMap {
    /// Key to (position in `order`, entry)
    entries: FxHashMap<PropertyKey, (usize, DictionaryEntry)>,
    order: Vec<Option<PropertyKey>>,
    extensible: bool,
}

impl DictionaryMap {
    /// Empty extensible map
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
            order: Vec::new(),
            extensible: true,
        }
    }

    /// Build a map holding the same properties as a shaped object
    pub fn from_shape(shape: &Shape, slots: &[Slot]) -> Self {
        let mut map = Self::new();
        for p in shape.properties() {
            let entry = DictionaryEntry {
                attributes: p.attributes,
                slot: slots[p.slot].clone(),
            };
            map.insert(p.key.clone(), entry);
        }
        map.extensible = shape.is_extensible();
        map
    }

    /// Look up a property
    pub fn get(&self, key: &PropertyKey) -> Option<&DictionaryEntry> {
        self.entries.get(key).map(|(_, entry)| entry)
    }

    /// Look up a property mutably
    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut DictionaryEntry> {
        self.entries.get_mut(key).map(|(_, entry)| entry)
    }

    /// Insert or replace a property. New keys go last.
    pub fn insert(&mut self, key: PropertyKey, entry: DictionaryEntry) {
        if let Some((_, existing)) = self.entries.get_mut(&key) {
            *existing = entry;
            return;
        }
        self.order.push(Some(key.clone()));
        self.entries.insert(key, (self.order.len() - 1, entry));
    }

    /// Remove a property, keeping the order of the rest
    pub fn remove(&mut self, key: &PropertyKey) -> Option<DictionaryEntry> {
        let (position, entry) = self.entries.remove(key)?;
        self.order[position] = None;
        let holes = self.order.len() - self.entries.len();
        if holes >= MIN_TOMBSTONES && holes > self.entries.len() {
            self.compact();
        }
        Some(entry)
    }

    fn compact(&mut self) {
        self.order.retain(Option::is_some);
        for (position, key) in self.order.iter().flatten().enumerate() {
            if let Some((slot, _)) = self.entries.get_mut(key) {
                *slot = position;
            }
        }
    }

    /// Keys in creation order
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> + '_ {
        self.order.iter().flatten()
    }

    /// Number of properties
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Can properties be added
    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    /// Forbid new properties
    pub fn prevent_extensions(&mut self) {
        self.extensible = false;
    }

    /// Mark every property non-configurable, and data properties
    /// non-writable when `freeze` is set
    pub fn seal(&mut self, freeze: bool) {
        for (_, entry) in self.entries.values_mut() {
            entry.attributes = if freeze {
                entry.attributes.freeze(entry.slot.kind())
            } else {
                entry.attributes.sealed()
            };
        }
    }
}

impl Default for DictionaryMap {
    fn default() -> Self {
        Self::new()
    }
}
