//! Lattice Cart
//!
//! Lattice Cart is the storefront shopping cart engine: line items with merge-on-add semantics,
//! derived monetary totals (subtotal, tax, shipping, grand total), change subscriptions and
//! persistence to durable key-value storage.

pub mod cart;
pub mod fixtures;
pub mod items;
pub mod persistence;
pub mod prelude;
pub mod pricing;
pub mod products;
pub mod store;
