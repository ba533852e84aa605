//! Property keys and the compact property record stored in shapes

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::object::ObjectRef;
use crate::value::{Symbol, Value};

/// Property key (string, array index or symbol)
///
/// Strings that are canonical array indices are always stored as `Index`, so
/// `"2"` and `2` name the same property.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// String property key
    String(Arc<str>),
    /// Canonical array index (0 ..= 2^32 - 2)
    Index(u32),
    /// Symbol property key
    Symbol(Symbol),
}

impl PropertyKey {
    /// Create a string property key, canonicalizing array indices
    pub fn string(s: &str) -> Self {
        match parse_array_index(s) {
            Some(index) => Self::Index(index),
            None => Self::String(Arc::from(s)),
        }
    }

    /// Create a key for the integer `i`.
    ///
    /// 2^32 - 1 is not an array index and becomes the string key
    /// `"4294967295"`, as it does through [`PropertyKey::string`].
    pub fn index(i: u32) -> Self {
        if i == u32::MAX {
            Self::String(Arc::from(i.to_string()))
        } else {
            Self::Index(i)
        }
    }

    /// Create a symbol property key
    pub fn symbol(sym: Symbol) -> Self {
        Self::Symbol(sym)
    }

    /// ToPropertyKey restricted to values that already are keys
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::string(s)),
            Value::Symbol(sym) => Some(Self::Symbol(sym.clone())),
            _ => None,
        }
    }

    /// Convert back to a value (indices become strings)
    pub fn to_value(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Index(i) => Value::string(&i.to_string()),
            Self::Symbol(sym) => Value::Symbol(sym.clone()),
        }
    }

    /// Is this an array index key
    pub fn is_index(&self) -> bool {
        matches!(self, Self::Index(_))
    }

    /// Is this a symbol key
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Symbol(_))
    }

    /// Enumeration class: indices, then strings, then symbols.
    fn order_class(&self) -> u8 {
        match self {
            Self::Index(_) => 0,
            Self::String(_) => 1,
            Self::Symbol(_) => 2,
        }
    }
}

fn parse_array_index(s: &str) -> Option<u32> {
    let bytes = s.as_bytes();
    if bytes.is_empty() || bytes.len() > 10 {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    if !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let value: u64 = s.parse().ok()?;
    if value < u32::MAX as u64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Key ordering for OwnPropertyKeys
///
/// Array indices sort ascending before every other key; strings and symbols
/// compare equal within their class so a stable sort keeps creation order.
pub fn compare_property_keys(a: &PropertyKey, b: &PropertyKey) -> Ordering {
    match (a, b) {
        (PropertyKey::Index(x), PropertyKey::Index(y)) => x.cmp(y),
        _ => a.order_class().cmp(&b.order_class()),
    }
}

/// Whether appending `next` after `last` keeps a key list in enumeration order
pub(crate) fn keeps_enumeration_order(last: Option<&PropertyKey>, next: &PropertyKey) -> bool {
    match last {
        None => true,
        Some(last) => compare_property_keys(last, next) != Ordering::Greater,
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<u32> for PropertyKey {
    fn from(i: u32) -> Self {
        Self::index(i)
    }
}

impl From<Symbol> for PropertyKey {
    fn from(sym: Symbol) -> Self {
        Self::Symbol(sym)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Index(i) => write!(f, "{i}"),
            Self::Symbol(sym) => write!(f, "Symbol({})", sym.description().unwrap_or("")),
        }
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Index(i) => write!(f, "{i}"),
            Self::Symbol(sym) => write!(f, "{sym:?}"),
        }
    }
}

/// Property attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyAttributes {
    /// Property is writable (ignored for accessors)
    pub writable: bool,
    /// Property is enumerable
    pub enumerable: bool,
    /// Property is configurable
    pub configurable: bool,
}

impl PropertyAttributes {
    /// Create attributes
    pub const fn new(writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            writable,
            enumerable,
            configurable,
        }
    }

    /// Default attributes of a property created by assignment
    pub const fn data() -> Self {
        Self::new(true, true, true)
    }

    /// Non-writable, non-enumerable, non-configurable
    pub const fn frozen() -> Self {
        Self::new(false, false, false)
    }

    /// These attributes after sealing
    pub const fn sealed(self) -> Self {
        Self {
            configurable: false,
            ..self
        }
    }

    /// These attributes after freezing a property of `kind`
    pub const fn freeze(self, kind: PropertyKind) -> Self {
        Self {
            writable: match kind {
                PropertyKind::Data => false,
                PropertyKind::Accessor => self.writable,
            },
            configurable: false,
            ..self
        }
    }
}

impl Default for PropertyAttributes {
    fn default() -> Self {
        Self::data()
    }
}

/// Whether a property holds a value or an accessor pair
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// Data property
    Data,
    /// Accessor property
    Accessor,
}

/// Internal property record, owned by exactly one shape
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    /// Property key
    pub key: PropertyKey,
    /// Attribute bits
    pub attributes: PropertyAttributes,
    /// Data or accessor
    pub kind: PropertyKind,
    /// Index into the instance slot vector
    pub slot: usize,
}

/// Getter/setter pair; `None` marks an absent function
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Accessor {
    /// Getter function
    pub getter: Option<ObjectRef>,
    /// Setter function
    pub setter: Option<ObjectRef>,
}

impl Accessor {
    /// Create an accessor pair
    pub fn new(getter: Option<ObjectRef>, setter: Option<ObjectRef>) -> Self {
        Self { getter, setter }
    }
}

/// Per-instance storage cell of one property
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    /// Stored value of a data property
    Data(Value),
    /// Accessor pair of an accessor property
    Accessor(Accessor),
}

impl Slot {
    /// The property kind this slot holds
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Data(_) => PropertyKind::Data,
            Self::Accessor(_) => PropertyKind::Accessor,
        }
    }
}
