//! Prototype chain traversal
//!
//! Lookups walk the chain using the raw own-property store of ordinary
//! objects and hand control back to the caller at the first exotic object,
//! whose internal methods must be dispatched instead.

use tracing::debug;

use crate::object::ObjectRef;

/// One step of a prototype chain walk
#[derive(Clone, Debug, PartialEq)]
pub enum ChainStep {
    /// Ordinary object; its stored prototype link is followed next
    Ordinary(ObjectRef),
    /// Exotic object; the walk ends here
    Exotic(ObjectRef),
}

/// Iterator over a prototype chain.
///
/// Ends after a null prototype or after yielding an exotic object. An
/// all-ordinary chain is finite because `check_proto_cycle` guards every
/// prototype mutation.
pub struct PrototypeWalker {
    next: Option<ObjectRef>,
}

impl PrototypeWalker {
    /// Walk starting with `start` itself
    pub fn new(start: Option<ObjectRef>) -> Self {
        Self { next: start }
    }
}

impl Iterator for PrototypeWalker {
    type Item = ChainStep;

    fn next(&mut self) -> Option<ChainStep> {
        let current = self.next.take()?;
        if current.is_exotic() {
            return Some(ChainStep::Exotic(current));
        }
        self.next = current.prototype();
        Some(ChainStep::Ordinary(current))
    }
}

/// Whether `o` may take `new_proto` as its prototype without closing a
/// cycle through ordinary links.
///
/// A proxy anywhere on the walk ends it with "no cycle".
pub fn check_proto_cycle(o: &ObjectRef, new_proto: Option<&ObjectRef>) -> bool {
    for step in PrototypeWalker::new(new_proto.cloned()) {
        match step {
            ChainStep::Ordinary(p) if p.ptr_eq(o) => {
                debug!(target: "otter::object", object = ?o, "prototype cycle rejected");
                return false;
            }
            ChainStep::Ordinary(_) => {}
            ChainStep::Exotic(_) => return true,
        }
    }
    true
}
