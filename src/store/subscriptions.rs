//! Subscriptions

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use crate::cart::CartState;

new_key_type! {
    /// Subscription Key
    pub struct SubscriptionKey;
}

/// Callback invoked with the new cart state after each change.
pub(crate) type Listener = Arc<dyn Fn(&CartState) + Send + Sync>;

type Registry = Mutex<SlotMap<SubscriptionKey, Listener>>;

fn lock(registry: &Registry) -> MutexGuard<'_, SlotMap<SubscriptionKey, Listener>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Listener registry owned by a store.
#[derive(Default)]
pub(crate) struct Subscribers {
    registry: Arc<Registry>,
}

impl Subscribers {
    pub(crate) fn subscribe(&self, listener: Listener) -> Subscription {
        let key = lock(&self.registry).insert(listener);

        Subscription {
            registry: Arc::downgrade(&self.registry),
            key,
        }
    }

    /// Call every listener with `state`.
    ///
    /// Listeners are collected first and called with the registry unlocked, so a listener may
    /// subscribe or unsubscribe without deadlocking.
    pub(crate) fn notify(&self, state: &CartState) {
        let listeners: SmallVec<[Listener; 4]> = lock(&self.registry).values().cloned().collect();

        for listener in listeners {
            listener(state);
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.registry).len()
    }
}

impl Debug for Subscribers {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish()
    }
}

/// Handle for a registered listener. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener immediately"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<Registry>,
    key: SubscriptionKey,
}

impl Subscription {
    /// Stop receiving notifications.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Whether the listener is still registered with a live store.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| lock(&registry).contains_key(self.key))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(self.key);
        }
    }
}
