//! Cart Store
//!
//! The shared, persisted cart. Construct one per application and hand it to consumers behind an
//! [`std::sync::Arc`]; every mutation writes through to storage and then notifies subscribers.

use std::{
    convert::Infallible,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use rusty_money::{Money, iso::Currency};
use tracing::{debug, info, warn};

use crate::{
    cart::{CartError, CartState},
    items::CartLineItem,
    persistence::{
        CartPersistence, PersistError,
        storage::{KeyValueStorage, MemoryStorage},
    },
    pricing::{CartTotals, PricingError},
    products::{Product, ProductId},
};

mod subscriptions;

pub use subscriptions::{Subscription, SubscriptionKey};

use subscriptions::Subscribers;

/// Shared cart with write-through persistence and change notification.
#[derive(Debug)]
pub struct CartStore<S: KeyValueStorage = MemoryStorage> {
    state: Mutex<CartState>,
    persistence: CartPersistence<S>,
    subscribers: Subscribers,
    persist_error: Mutex<Option<PersistError>>,

    /// Held from the start of a mutation until its listeners return, so notifications are
    /// delivered in mutation order. Always taken before `state`.
    mutation: Mutex<()>,
}

impl CartStore<MemoryStorage> {
    /// A store backed by fresh in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open(CartPersistence::new(MemoryStorage::new()))
    }
}

impl<S: KeyValueStorage> CartStore<S> {
    /// Open a store, restoring whatever cart was last persisted.
    ///
    /// A record that can't be read or decoded is logged and the store starts empty; the record is
    /// left in place until the next mutation overwrites it.
    pub fn open(persistence: CartPersistence<S>) -> Self {
        let state = match persistence.rehydrate() {
            Ok(state) => {
                info!(
                    key = persistence.key(),
                    lines = state.len(),
                    items = state.item_count(),
                    "rehydrated cart"
                );

                state
            }
            Err(error) => {
                warn!(
                    key = persistence.key(),
                    %error,
                    "failed to rehydrate cart, starting empty"
                );

                CartState::default()
            }
        };

        Self::with_state(state, persistence)
    }

    /// Create a store from an explicit state. Nothing is written until the first mutation.
    pub fn with_state(state: CartState, persistence: CartPersistence<S>) -> Self {
        Self {
            state: Mutex::new(state),
            persistence,
            subscribers: Subscribers::default(),
            persist_error: Mutex::new(None),
            mutation: Mutex::new(()),
        }
    }

    /// Register a listener called with the new state after every change.
    ///
    /// Listeners run one mutation at a time, in the order the mutations were applied. A listener
    /// may read the store but must not mutate it; doing so deadlocks.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CartState) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(Arc::new(listener))
    }

    /// Number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the merged quantity would overflow.
    pub fn add_one(&self, product: Product) -> Result<(), CartError> {
        self.add_item(product, 1)
    }

    /// Add a product, merging into its existing line if there is one.
    ///
    /// # Errors
    ///
    /// - [`CartError::ZeroQuantity`]: `quantity` was zero.
    /// - [`CartError::QuantityOverflow`]: the merged quantity would overflow.
    pub fn add_item(&self, product: Product, quantity: u32) -> Result<(), CartError> {
        let product_id = product.id.clone();

        self.apply("add_item", |state| {
            state.add_item(product, quantity).map(|()| true)
        })?;

        debug!(product = %product_id, quantity, "added item");

        Ok(())
    }

    /// Remove a product's line. Returns whether a line was removed.
    pub fn remove_item(&self, product_id: &ProductId) -> bool {
        let Ok(removed) = self.apply("remove_item", |state| {
            Ok::<_, Infallible>(state.remove_item(product_id))
        });

        debug!(product = %product_id, removed, "removed item");

        removed
    }

    /// Set a product's quantity; zero or below removes the line. Returns whether the cart changed.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if `quantity` does not fit in a `u32`.
    pub fn update_quantity(&self, product_id: &ProductId, quantity: i64) -> Result<bool, CartError> {
        let changed = self.apply("update_quantity", |state| {
            state.update_quantity(product_id, quantity)
        })?;

        debug!(product = %product_id, quantity, changed, "updated quantity");

        Ok(changed)
    }

    /// Remove every line, leaving drawer visibility alone. Returns whether anything was removed.
    pub fn clear_cart(&self) -> bool {
        let Ok(cleared) = self.apply("clear_cart", |state| {
            Ok::<_, Infallible>(state.clear_cart())
        });

        cleared
    }

    /// Flip drawer visibility, returning the new value.
    pub fn toggle_cart(&self) -> bool {
        let mut open = false;

        let Ok(_) = self.apply("toggle_cart", |state| {
            open = state.toggle_cart();

            Ok::<_, Infallible>(true)
        });

        open
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CartState {
        self.lock_state().clone()
    }

    /// Copy of the current lines, in insertion order.
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock_state().items().to_vec()
    }

    /// Copy of a product's line, if present.
    pub fn item(&self, product_id: &ProductId) -> Option<CartLineItem> {
        self.lock_state().item(product_id).cloned()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lock_state().is_empty()
    }

    /// Whether the cart drawer is visible.
    pub fn is_drawer_open(&self) -> bool {
        self.lock_state().is_drawer_open()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.lock_state().item_count()
    }

    /// Sum of each line's effective price times quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn subtotal(&self) -> Result<Money<'static, Currency>, PricingError> {
        self.lock_state().subtotal()
    }

    /// Flat-rate tax on the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn tax(&self) -> Result<Money<'static, Currency>, PricingError> {
        self.lock_state().tax()
    }

    /// Shipping fee for the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn shipping(&self) -> Result<Money<'static, Currency>, PricingError> {
        self.lock_state().shipping()
    }

    /// Subtotal plus tax plus shipping.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn total(&self) -> Result<Money<'static, Currency>, PricingError> {
        self.lock_state().total()
    }

    /// All derived figures from a single snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn totals(&self) -> Result<CartTotals, PricingError> {
        self.lock_state().totals()
    }

    /// The persistence adapter.
    pub fn persistence(&self) -> &CartPersistence<S> {
        &self.persistence
    }

    /// Take the most recent persistence failure, if any, clearing it.
    ///
    /// A failed write never rolls back the in-memory cart; callers can use this to surface a
    /// warning that changes may not survive a restart.
    pub fn take_persist_error(&self) -> Option<PersistError> {
        self.persist_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn lock_state(&self) -> MutexGuard<'_, CartState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a mutation; if it reports a change, persist and notify subscribers.
    ///
    /// The state lock is released before listeners run so they can read the store; the mutation
    /// lock stays held until they return.
    fn apply<E>(
        &self,
        action: &'static str,
        mutation: impl FnOnce(&mut CartState) -> Result<bool, E>,
    ) -> Result<bool, E> {
        let _serial = self.mutation.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot = {
            let mut state = self.lock_state();

            if !mutation(&mut *state)? {
                return Ok(false);
            }

            self.write_through(action, &*state);

            state.clone()
        };

        self.subscribers.notify(&snapshot);

        Ok(true)
    }

    fn write_through(&self, action: &'static str, state: &CartState) {
        if let Err(error) = self.persistence.persist(state) {
            warn!(
                action,
                key = self.persistence.key(),
                %error,
                "failed to persist cart, keeping in-memory state"
            );

            *self
                .persist_error
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicU64, AtomicUsize, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };

    use testresult::TestResult;

    use crate::{
        persistence::{
            CART_STORAGE_KEY,
            storage::{MockKeyValueStorage, StorageError},
        },
        pricing::money,
    };

    use super::*;

    fn mug() -> Product {
        Product::new("a", "Ceramic Mug", 10_00)
    }

    fn headphones() -> Product {
        Product::new("b", "Headphones", 100_00).with_discount_price(80_00)
    }

    #[test]
    fn mutations_write_through_to_storage() -> TestResult {
        let store = CartStore::in_memory();

        store.add_item(mug(), 2)?;

        let restored = store.persistence().rehydrate()?;

        assert_eq!(restored, store.snapshot());

        Ok(())
    }

    #[test]
    fn reopening_restores_persisted_cart() -> TestResult {
        let store = CartStore::in_memory();
        store.add_item(mug(), 2)?;
        store.toggle_cart();

        let raw = store
            .persistence()
            .storage()
            .get_item(CART_STORAGE_KEY)?
            .unwrap_or_default();

        let storage = MemoryStorage::new();
        storage.set_item(CART_STORAGE_KEY, &raw)?;
        let reopened = CartStore::open(CartPersistence::new(storage));

        assert_eq!(reopened.snapshot(), store.snapshot());
        assert!(reopened.is_drawer_open());

        Ok(())
    }

    #[test]
    fn subscribers_see_each_change_once() -> TestResult {
        let store = CartStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let last_count = Arc::new(AtomicU64::new(0));

        let _subscription = {
            let calls = Arc::clone(&calls);
            let last_count = Arc::clone(&last_count);

            store.subscribe(move |state| {
                calls.fetch_add(1, Ordering::SeqCst);
                last_count.store(state.item_count(), Ordering::SeqCst);
            })
        };

        store.add_item(mug(), 2)?;
        store.add_one(headphones())?;
        store.update_quantity(&"a".into(), 5)?;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(last_count.load(Ordering::SeqCst), 6);

        Ok(())
    }

    #[test]
    fn unchanged_state_does_not_notify() -> TestResult {
        let store = CartStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let calls = Arc::clone(&calls);

            store.subscribe(move |_state| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(!store.remove_item(&"missing".into()));
        assert!(!store.clear_cart());
        assert!(!store.update_quantity(&"missing".into(), 3)?);
        assert!(store.add_item(mug(), 0).is_err());

        assert_eq!(calls.load(Ordering::SeqCst), 0);

        Ok(())
    }

    #[test]
    fn unsubscribed_listener_is_not_called() -> TestResult {
        let store = CartStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        let subscription = {
            let calls = Arc::clone(&calls);

            store.subscribe(move |_state| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        store.add_one(mug())?;
        subscription.unsubscribe();
        store.add_one(mug())?;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);

        Ok(())
    }

    #[test]
    fn listener_can_read_the_store() -> TestResult {
        let store = Arc::new(CartStore::in_memory());
        let seen_total = Arc::new(AtomicU64::new(0));

        let _subscription = {
            let reader = Arc::downgrade(&store);
            let seen_total = Arc::clone(&seen_total);

            store.subscribe(move |_state| {
                if let Some(store) = reader.upgrade() {
                    let total = store.total().map(|total| total.to_minor_units());

                    seen_total.store(total.unwrap_or_default().unsigned_abs(), Ordering::SeqCst);
                }
            })
        };

        store.add_item(mug(), 2)?;

        assert_eq!(seen_total.load(Ordering::SeqCst), 27_59);

        Ok(())
    }

    #[test]
    fn concurrent_mutations_notify_in_mutation_order() -> TestResult {
        let store = Arc::new(CartStore::in_memory());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (entered_tx, entered_rx) = mpsc::channel();

        let _subscription = {
            let seen = Arc::clone(&seen);

            store.subscribe(move |state| {
                let count = state.item_count();

                if count == 1 {
                    let _sent = entered_tx.send(());
                    thread::sleep(Duration::from_millis(100));
                }

                seen.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(count);
            })
        };

        let first = {
            let store = Arc::clone(&store);

            thread::spawn(move || store.add_one(mug()))
        };

        entered_rx.recv_timeout(Duration::from_secs(5))?;
        store.add_one(mug())?;

        assert!(matches!(first.join(), Ok(Ok(()))), "first add_one failed");

        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner).clone();

        assert_eq!(seen, [1, 2]);
        assert_eq!(seen.last().copied(), Some(store.item_count()));

        Ok(())
    }

    #[test]
    fn toggle_cart_returns_new_state_and_notifies() {
        let store = CartStore::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let calls = Arc::clone(&calls);

            store.subscribe(move |_state| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert!(store.toggle_cart());
        assert!(store.is_drawer_open());
        assert!(!store.toggle_cart());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn accessors_derive_from_current_state() -> TestResult {
        let store = CartStore::in_memory();

        store.add_item(mug(), 2)?;

        assert_eq!(store.item_count(), 2);
        assert_eq!(store.subtotal()?, money(20_00));
        assert_eq!(store.tax()?, money(1_60));
        assert_eq!(store.shipping()?, money(5_99));
        assert_eq!(store.total()?, money(27_59));
        assert_eq!(store.totals()?.total(), store.total()?);

        Ok(())
    }

    #[test]
    fn failed_write_keeps_in_memory_state() -> TestResult {
        let mut storage = MockKeyValueStorage::new();

        storage.expect_get_item().returning(|_| Ok(None));
        storage
            .expect_set_item()
            .times(1)
            .returning(|_, _| Err(StorageError::QuotaExceeded {
                requested: 10,
                quota: 5,
            }));

        let store = CartStore::open(CartPersistence::new(storage));

        store.add_item(mug(), 2)?;

        assert_eq!(store.item_count(), 2);
        assert!(matches!(
            store.take_persist_error(),
            Some(PersistError::Storage(StorageError::QuotaExceeded { .. }))
        ));
        assert!(store.take_persist_error().is_none(), "error is taken once");

        Ok(())
    }

    #[test]
    fn failed_write_still_notifies_subscribers() -> TestResult {
        let store = CartStore::open(CartPersistence::new(MemoryStorage::with_quota(8)));
        let calls = Arc::new(AtomicUsize::new(0));

        let _subscription = {
            let calls = Arc::clone(&calls);

            store.subscribe(move |_state| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        store.add_one(mug())?;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.take_persist_error().is_some());

        Ok(())
    }

    #[test]
    fn failed_rehydrate_starts_empty() {
        let mut storage = MockKeyValueStorage::new();

        storage
            .expect_get_item()
            .returning(|_| Err(StorageError::InvalidKey("cart-storage".to_string())));

        let store = CartStore::open(CartPersistence::new(storage));

        assert!(store.is_empty());
        assert!(!store.is_drawer_open());
    }

    #[test]
    fn corrupt_record_starts_empty() -> TestResult {
        let storage = MemoryStorage::new();
        storage.set_item(CART_STORAGE_KEY, "{\"state\":")?;

        let store = CartStore::open(CartPersistence::new(storage));

        assert!(store.is_empty());

        Ok(())
    }
}
