#![forbid(unsafe_code)]

//! Synchronous listener lists.
//!
//! Single-threaded publish/subscribe: listeners are invoked inline, in
//! registration order, before the mutating call that triggered the
//! notification returns. Emission iterates a snapshot of the list, so a
//! listener may subscribe or unsubscribe re-entrantly without disturbing
//! the delivery in flight.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Opaque handle identifying one subscription on a [`Listeners`] list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// An ordered list of shared callbacks.
///
/// `F` is the unsized callable type, e.g. `dyn Fn(ChangeReason)`.
pub struct Listeners<F: ?Sized> {
    entries: RefCell<Vec<(SubscriberId, Rc<F>)>>,
    next_id: Cell<u64>,
}

impl<F: ?Sized> Listeners<F> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    /// Append a listener and return its subscription handle.
    pub fn subscribe(&self, listener: Rc<F>) -> SubscriberId {
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        self.entries.borrow_mut().push((id, listener));
        id
    }

    /// Remove a listener. Returns `false` if the handle is unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut entries = self.entries.borrow_mut();
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Clone out the current listeners in registration order.
    ///
    /// Emit by iterating the snapshot; list mutations made by invoked
    /// listeners take effect from the next emission.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.entries
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl<F: ?Sized> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}
