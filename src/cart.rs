//! Cart
//!
//! [`CartState`] is the pure cart: an insertion-ordered list of line items plus the drawer flag,
//! with the mutation rules and derived totals. It knows nothing about storage or subscribers;
//! [`crate::store::CartStore`] wraps it for sharing.

use std::num::NonZeroU32;

use rustc_hash::FxHashSet;
use rusty_money::{Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    items::CartLineItem,
    pricing::{CartTotals, PricingError, money, shipping_minor, subtotal_minor, tax_minor},
    products::{Product, ProductId},
};

/// Errors raised by cart mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// Items must be added with a quantity of at least one.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// The resulting quantity does not fit in a `u32`.
    #[error("quantity for product {product} is out of range")]
    QuantityOverflow {
        /// Product whose quantity overflowed
        product: ProductId,
    },
}

/// Cart contents and drawer visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    #[serde(default)]
    items: Vec<CartLineItem>,

    #[serde(default, rename = "isOpen")]
    drawer_open: bool,
}

impl CartState {
    /// Create an empty cart with the drawer closed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of a product.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if the merged quantity would overflow.
    pub fn add_one(&mut self, product: Product) -> Result<(), CartError> {
        self.add_item(product, 1)
    }

    /// Add a product to the cart.
    ///
    /// If the product already has a line, its quantity is incremented; otherwise a new line is
    /// appended. A zero quantity is rejected and leaves the cart untouched.
    ///
    /// # Errors
    ///
    /// - [`CartError::ZeroQuantity`]: `quantity` was zero.
    /// - [`CartError::QuantityOverflow`]: the merged quantity would overflow.
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<(), CartError> {
        let quantity = NonZeroU32::new(quantity).ok_or(CartError::ZeroQuantity)?;

        if let Some(existing) = self.line_mut(&product.id) {
            let merged =
                existing
                    .quantity()
                    .checked_add(quantity.get())
                    .ok_or_else(|| CartError::QuantityOverflow {
                        product: product.id.clone(),
                    })?;

            existing.set_quantity(merged);
        } else {
            self.items.push(CartLineItem::new(product, quantity));
        }

        Ok(())
    }

    /// Remove the line for a product. Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &ProductId) -> bool {
        let before = self.items.len();

        self.items.retain(|item| item.product_id() != product_id);

        self.items.len() != before
    }

    /// Set the quantity for a product's line.
    ///
    /// A quantity of zero or below removes the line. Order and the time first added are preserved.
    /// Returns whether the cart changed; a missing product is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::QuantityOverflow`] if `quantity` does not fit in a `u32`.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<bool, CartError> {
        if quantity <= 0 {
            return Ok(self.remove_item(product_id));
        }

        let quantity = u32::try_from(quantity)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| CartError::QuantityOverflow {
                product: product_id.clone(),
            })?;

        let Some(line) = self.line_mut(product_id) else {
            return Ok(false);
        };

        let changed = line.quantity() != quantity;
        line.set_quantity(quantity);

        Ok(changed)
    }

    /// Remove every line. Drawer visibility is left as is. Returns whether anything was removed.
    pub fn clear_cart(&mut self) -> bool {
        let had_items = !self.items.is_empty();

        self.items.clear();

        had_items
    }

    /// Flip drawer visibility, returning the new value.
    pub fn toggle_cart(&mut self) -> bool {
        self.drawer_open = !self.drawer_open;
        self.drawer_open
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity().get()))
            .sum()
    }

    /// Sum of each line's effective price times quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn subtotal(&self) -> Result<Money<'static, Currency>, PricingError> {
        subtotal_minor(&self.items).map(money)
    }

    /// Flat-rate tax on the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the amount overflows.
    pub fn tax(&self) -> Result<Money<'static, Currency>, PricingError> {
        tax_minor(subtotal_minor(&self.items)?).map(money)
    }

    /// Shipping fee for the current subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the subtotal overflows.
    pub fn shipping(&self) -> Result<Money<'static, Currency>, PricingError> {
        Ok(money(shipping_minor(subtotal_minor(&self.items)?)))
    }

    /// Subtotal plus tax plus shipping.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any amount overflows.
    pub fn total(&self) -> Result<Money<'static, Currency>, PricingError> {
        Ok(self.totals()?.total())
    }

    /// All derived figures at once.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any amount overflows.
    pub fn totals(&self) -> Result<CartTotals, PricingError> {
        CartTotals::from_items(&self.items)
    }

    /// Lines in insertion order.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// The line for a product, if present.
    pub fn item(&self, product_id: &ProductId) -> Option<&CartLineItem> {
        self.items
            .iter()
            .find(|item| item.product_id() == product_id)
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the cart drawer is visible.
    pub fn is_drawer_open(&self) -> bool {
        self.drawer_open
    }

    /// First product id that appears on more than one line.
    pub(crate) fn duplicate_product(&self) -> Option<&ProductId> {
        let mut seen = FxHashSet::default();

        self.items
            .iter()
            .map(CartLineItem::product_id)
            .find(|id| !seen.insert(*id))
    }

    fn line_mut(&mut self, product_id: &ProductId) -> Option<&mut CartLineItem> {
        self.items
            .iter_mut()
            .find(|item| item.product_id() == product_id)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn product_a() -> Product {
        Product::new("a", "Ceramic Mug", 10_00)
    }

    fn product_b() -> Product {
        Product::new("b", "Headphones", 100_00).with_discount_price(80_00)
    }

    #[test]
    fn new_cart_is_empty_and_closed() {
        let cart = CartState::new();

        assert!(cart.is_empty());
        assert!(!cart.is_drawer_open());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn add_item_appends_in_order() -> TestResult {
        let mut cart = CartState::new();

        cart.add_item(product_b(), 1)?;
        cart.add_one(product_a())?;

        let ids: Vec<&str> = cart
            .items()
            .iter()
            .map(|item| item.product_id().as_str())
            .collect();

        assert_eq!(ids, vec!["b", "a"]);

        Ok(())
    }

    #[test]
    fn add_item_merges_duplicate_products() -> TestResult {
        let mut cart = CartState::new();

        cart.add_item(product_a(), 2)?;
        let line_id = cart.item(&"a".into()).map(CartLineItem::line_id);
        cart.add_item(product_a(), 3)?;

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(
            cart.item(&"a".into()).map(CartLineItem::line_id),
            line_id,
            "merging must keep the first line"
        );

        Ok(())
    }

    #[test]
    fn add_item_keeps_first_snapshot_on_merge() -> TestResult {
        let mut cart = CartState::new();

        cart.add_one(product_a())?;
        cart.add_one(Product::new("a", "Ceramic Mug", 12_00))?;

        assert_eq!(
            cart.item(&"a".into()).map(|item| item.product().price),
            Some(10_00)
        );

        Ok(())
    }

    #[test]
    fn add_item_rejects_zero_quantity() {
        let mut cart = CartState::new();

        assert_eq!(cart.add_item(product_a(), 0), Err(CartError::ZeroQuantity));
        assert!(cart.is_empty());
    }

    #[test]
    fn add_item_rejects_overflowing_merge() -> TestResult {
        let mut cart = CartState::new();

        cart.add_item(product_a(), u32::MAX)?;
        let result = cart.add_one(product_a());

        assert_eq!(
            result,
            Err(CartError::QuantityOverflow {
                product: "a".into()
            })
        );
        assert_eq!(cart.item_count(), u64::from(u32::MAX));

        Ok(())
    }

    #[test]
    fn remove_item_missing_is_noop() -> TestResult {
        let mut cart = CartState::new();
        cart.add_one(product_a())?;

        assert!(!cart.remove_item(&"missing".into()));
        assert_eq!(cart.len(), 1);

        Ok(())
    }

    #[test]
    fn update_quantity_replaces_in_place() -> TestResult {
        let mut cart = CartState::new();
        cart.add_one(product_a())?;
        cart.add_one(product_b())?;

        assert!(cart.update_quantity(&"a".into(), 4)?);

        assert_eq!(cart.items().first().map(|i| i.quantity().get()), Some(4));
        assert_eq!(cart.item_count(), 5);

        Ok(())
    }

    #[test]
    fn update_quantity_to_same_value_reports_no_change() -> TestResult {
        let mut cart = CartState::new();
        cart.add_item(product_a(), 2)?;

        assert!(!cart.update_quantity(&"a".into(), 2)?);

        Ok(())
    }

    #[test]
    fn update_quantity_zero_or_negative_removes() -> TestResult {
        let mut cart = CartState::new();
        cart.add_one(product_a())?;
        cart.add_one(product_b())?;

        assert!(cart.update_quantity(&"a".into(), 0)?);
        assert!(cart.update_quantity(&"b".into(), -1)?);

        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn update_quantity_missing_product_is_noop() -> TestResult {
        let mut cart = CartState::new();

        assert!(!cart.update_quantity(&"a".into(), 3)?);
        assert!(cart.is_empty());

        Ok(())
    }

    #[test]
    fn update_quantity_rejects_out_of_range() -> TestResult {
        let mut cart = CartState::new();
        cart.add_one(product_a())?;

        let result = cart.update_quantity(&"a".into(), i64::from(u32::MAX) + 1);

        assert!(matches!(result, Err(CartError::QuantityOverflow { .. })));
        assert_eq!(cart.item_count(), 1);

        Ok(())
    }

    #[test]
    fn clear_cart_keeps_drawer_state() -> TestResult {
        let mut cart = CartState::new();
        cart.add_one(product_a())?;
        cart.toggle_cart();

        assert!(cart.clear_cart());
        assert!(!cart.clear_cart());

        assert!(cart.is_empty());
        assert!(cart.is_drawer_open());

        Ok(())
    }

    #[test]
    fn toggle_cart_flips() {
        let mut cart = CartState::new();

        assert!(cart.toggle_cart());
        assert!(!cart.toggle_cart());
    }

    #[test]
    fn accessors_agree_with_totals() -> TestResult {
        let mut cart = CartState::new();
        cart.add_item(product_a(), 2)?;
        cart.add_one(product_b())?;

        let totals = cart.totals()?;

        assert_eq!(cart.subtotal()?, totals.subtotal());
        assert_eq!(cart.tax()?, totals.tax());
        assert_eq!(cart.shipping()?, totals.shipping());
        assert_eq!(cart.total()?, totals.total());
        assert_eq!(cart.subtotal()?, money(100_00));
        assert!(totals.has_free_shipping());

        Ok(())
    }

    #[test]
    fn duplicate_product_detection() -> TestResult {
        let mut cart = CartState::new();
        cart.add_one(product_a())?;

        assert_eq!(cart.duplicate_product(), None);

        cart.items.push(CartLineItem::new(product_a(), NonZeroU32::MIN));

        assert_eq!(cart.duplicate_product(), Some(&"a".into()));

        Ok(())
    }

    #[test]
    fn serializes_drawer_flag_as_is_open() -> TestResult {
        let mut cart = CartState::new();
        cart.toggle_cart();

        let value = serde_json::to_value(&cart)?;

        assert_eq!(value["isOpen"], true);
        assert!(value["items"].is_array());

        Ok(())
    }
}
