//! Thread-confined interior mutability for object state.
//!
//! `ObjectCell<T>` wraps a `RefCell<T>` but only hands out access through
//! closures. A borrow therefore cannot outlive the closure, and in particular
//! cannot be held across a call into a getter, setter or proxy trap that may
//! re-enter the same object. Code that needs state after such a call has to
//! read it again.

use std::cell::RefCell;

/// Closure-scoped interior mutability wrapper.
pub struct ObjectCell<T> {
    value: RefCell<T>,
}

impl<T> ObjectCell<T> {
    /// Create a new `ObjectCell` with the given value.
    #[inline]
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
        }
    }

    /// Run `f` with shared access to the value.
    ///
    /// Panics if called from inside `write` on the same cell.
    #[inline]
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Run `f` with exclusive access to the value.
    ///
    /// Panics if called from inside `read` or `write` on the same cell.
    #[inline]
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.value.borrow_mut())
    }

    /// Replace the value, returning the old one.
    #[inline]
    pub fn replace(&self, value: T) -> T {
        self.value.replace(value)
    }
}

impl<T: Clone> ObjectCell<T> {
    /// Clone the value out of the cell.
    #[inline]
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ObjectCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value.try_borrow() {
            Ok(value) => f.debug_struct("ObjectCell").field("value", &*value).finish(),
            Err(_) => f
                .debug_struct("ObjectCell")
                .field("value", &"<borrowed>")
                .finish(),
        }
    }
}
