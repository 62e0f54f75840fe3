// Change notification for store commits

use crate::models::Document;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

type Callback = Rc<RefCell<dyn FnMut(&Document)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Set of callbacks invoked after every commit
///
/// Single-threaded by construction: the store is driven from one event loop.
#[derive(Default)]
pub(crate) struct Subscribers {
    registry: Rc<RefCell<Registry>>,
}

impl Subscribers {
    pub(crate) fn add<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&Document) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let callback: Callback = Rc::new(RefCell::new(callback));
        registry.entries.push((id, callback));

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.registry.borrow().entries.len()
    }

    /// Call every registered callback once with `document`
    ///
    /// Callbacks are snapshotted first, so a callback may unsubscribe itself
    /// (or others) without invalidating the iteration. A callback removed
    /// earlier in the same round is skipped.
    pub(crate) fn notify(&self, document: &Document) {
        let callbacks: Vec<(u64, Callback)> = self
            .registry
            .borrow()
            .entries
            .iter()
            .map(|(id, callback)| (*id, Rc::clone(callback)))
            .collect();

        for (id, callback) in callbacks {
            if !self.is_registered(id) {
                continue;
            }
            (&mut *callback.borrow_mut())(document);
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.registry.borrow().entries.iter().any(|(entry, _)| *entry == id)
    }
}

/// Handle returned by `Store::subscribe`
///
/// Dropping the handle keeps the callback registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    /// Deregister the callback; a no-op once the store is gone
    ///
    /// Takes effect immediately, including for a notification already in
    /// progress that has not reached this callback yet.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().entries.retain(|(id, _)| *id != self.id);
        }
    }
}
