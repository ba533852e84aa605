//! # Otter VM Object
//!
//! Object model for the Otter JavaScript runtime: shape-based property
//! storage and the ordinary object internal methods.
//!
//! ## Design Principles
//!
//! - **Hidden classes**: objects with the same property layout share one
//!   immutable `Shape`, reached through a memoized transition graph
//! - **Dictionary fallback**: object literals with churning property sets
//!   switch to a private hash map instead of growing the graph
//! - **Exact language semantics**: strict-mode failures throw, sloppy ones return
//!   `false`; receivers, inherited accessors and proxies anywhere on the chain
//!   behave as ES2026 §10.1 and §10.5 require
//! - **Re-entrancy safe**: no object state is borrowed while a getter, setter
//!   or trap runs
//!
//! ## Example
//!
//! ```ignore
//! use otter_vm_object::{ObjectRef, PropertyKey, ShapeStore, Value};
//!
//! let store = ShapeStore::new();
//! let obj = ObjectRef::new_user_object(&store, None);
//! obj.put(&PropertyKey::string("x"), Value::int32(1), true)?;
//! obj.set_integrity_level(true, true)?;
//! assert!(!obj.put(&PropertyKey::string("x"), Value::int32(2), false)?);
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod byte_access;
pub mod config;
pub mod descriptor;
pub mod dictionary;
pub mod error;
pub mod interop;
mod internal_methods;
pub mod object;
pub mod object_cell;
pub mod ordinary;
pub mod property;
pub mod prototype_chain;
pub mod proxy;
pub mod proxy_operations;
pub mod shape;
pub mod value;

pub use byte_access::{
    BIG_ENDIAN_ORDER, ByteArrayAccess, ByteOrder, LITTLE_ENDIAN_ORDER, NATIVE_ORDER,
};
pub use config::ObjectModelConfig;
pub use descriptor::{PropertyDescriptor, from_property_descriptor, to_property_descriptor};
pub use error::{VmError, VmResult};
pub use interop::{InteropError, InteropResult, has_member, invoke_member, read_member};
pub use object::{JsObject, NativeFunction, ObjectKind, ObjectRef};
pub use property::{Accessor, PropertyAttributes, PropertyKey, PropertyKind};
pub use prototype_chain::{ChainStep, PrototypeWalker};
pub use proxy::{JsProxy, RevocableProxy};
pub use shape::{Shape, ShapeId, ShapeStore, Transition};
pub use value::{Symbol, Value, same_value};
