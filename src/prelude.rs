//! Lattice Cart prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{CartError, CartState},
    fixtures::{Catalog, FixtureError},
    items::{CartLineItem, LineId},
    persistence::{
        CART_STORAGE_KEY, CartPersistence, PersistError, PersistedCart,
        storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError},
    },
    pricing::{CartTotals, PricingError},
    products::{Product, ProductId},
    store::{CartStore, Subscription},
};
