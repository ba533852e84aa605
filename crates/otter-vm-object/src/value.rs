//! JavaScript values as seen by the object model
//!
//! The object model only needs to store, compare and pass values around, so
//! `Value` is a plain tagged enum. Objects are reference handles; every other
//! variant is immutable.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::object::ObjectRef;

/// A JavaScript value
#[derive(Clone, Default, PartialEq)]
pub enum Value {
    /// `undefined`
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Boolean(bool),
    /// IEEE-754 number
    Number(f64),
    /// String
    String(Arc<str>),
    /// Symbol
    Symbol(Symbol),
    /// Object handle
    Object(ObjectRef),
}

impl Value {
    /// `undefined`
    pub const fn undefined() -> Self {
        Self::Undefined
    }

    /// `null`
    pub const fn null() -> Self {
        Self::Null
    }

    /// Boolean value
    pub const fn boolean(b: bool) -> Self {
        Self::Boolean(b)
    }

    /// Number value
    pub const fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Number value from an int32
    pub fn int32(n: i32) -> Self {
        Self::Number(n as f64)
    }

    /// String value
    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    /// Symbol value
    pub fn symbol(sym: Symbol) -> Self {
        Self::Symbol(sym)
    }

    /// Object value
    pub fn object(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }

    /// Is this `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Is this an object
    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Is this a callable object
    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(|obj| obj.is_callable())
    }

    /// Get the object handle
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Get the number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// ToBoolean (ES2026 §7.1.2)
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => !(*n == 0.0 || n.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::Symbol(_) | Self::Object(_) => true,
        }
    }
}

/// SameValue (ES2026 §7.2.10): `NaN` equals itself, `+0` and `-0` differ.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x.is_nan() && y.is_nan() {
                true
            } else {
                x == y && x.is_sign_negative() == y.is_sign_negative()
            }
        }
        _ => a == b,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Symbol(sym) => write!(f, "{sym:?}"),
            Self::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Self::Object(obj)
    }
}

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// A unique, non-string property key token
///
/// Two symbols are equal only if they are clones of the same `Symbol::new`
/// result, whatever their descriptions.
#[derive(Clone)]
pub struct Symbol(Arc<SymbolData>);

struct SymbolData {
    id: u64,
    description: Option<Arc<str>>,
}

impl Symbol {
    /// Create a fresh symbol
    pub fn new(description: Option<&str>) -> Self {
        Self(Arc::new(SymbolData {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            description: description.map(Arc::from),
        }))
    }

    /// Unique identifier
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Description passed at creation
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or(""))
    }
}
