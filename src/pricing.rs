//! Pricing
//!
//! Derived monetary figures for a cart. All arithmetic happens in integer minor units with checked
//! operations; values are only wrapped as [`Money`] at the boundary, so subtotal, tax, shipping and
//! total always add up exactly.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use rusty_money::{
    Money,
    iso::{Currency, USD},
};
use thiserror::Error;

use crate::{items::CartLineItem, products::ProductId};

/// Flat sales tax rate applied to the subtotal.
pub const TAX_RATE: f64 = 0.08;

/// Shipping is free when the subtotal is strictly greater than this amount (minor units).
pub const FREE_SHIPPING_THRESHOLD: i64 = 50_00;

/// Shipping fee charged at or below the free shipping threshold (minor units).
pub const FLAT_SHIPPING_FEE: i64 = 5_99;

/// Errors that can occur while pricing a cart.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// A line's price multiplied by its quantity does not fit in minor units.
    #[error("line total for product {0} is out of range")]
    LineOutOfRange(ProductId),

    /// Summing the cart overflowed.
    #[error("cart amount overflowed")]
    Overflow,

    /// Percentage calculation could not be safely converted.
    #[error("tax calculation overflowed or was not finite")]
    TaxConversion,
}

/// Currency every cart amount is expressed in.
#[must_use]
pub fn currency() -> &'static Currency {
    USD
}

/// Wrap an amount in minor units as money in the cart currency.
#[must_use]
pub fn money(minor: i64) -> Money<'static, Currency> {
    Money::from_minor(minor, currency())
}

/// The flat tax rate as a percentage.
#[must_use]
pub fn tax_rate() -> Percentage {
    Percentage::from(TAX_RATE)
}

/// Effective unit price multiplied by quantity, in minor units.
///
/// # Errors
///
/// Returns [`PricingError::LineOutOfRange`] if the result does not fit in an `i64`.
pub fn line_total_minor(item: &CartLineItem) -> Result<i64, PricingError> {
    i64::try_from(item.product().effective_price())
        .ok()
        .and_then(|price| price.checked_mul(i64::from(item.quantity().get())))
        .ok_or_else(|| PricingError::LineOutOfRange(item.product_id().clone()))
}

/// Sum of line totals, in minor units.
///
/// # Errors
///
/// Returns a [`PricingError`] if any line or the running sum overflows.
pub fn subtotal_minor(items: &[CartLineItem]) -> Result<i64, PricingError> {
    items.iter().try_fold(0_i64, |acc, item| {
        acc.checked_add(line_total_minor(item)?)
            .ok_or(PricingError::Overflow)
    })
}

/// Tax owed on a subtotal, rounded to the nearest minor unit (midpoint away from zero).
///
/// # Errors
///
/// Returns [`PricingError::TaxConversion`] if the calculation cannot be represented.
pub fn tax_minor(subtotal: i64) -> Result<i64, PricingError> {
    percent_of_minor(&tax_rate(), subtotal)
}

/// Shipping fee for a subtotal: free strictly above the threshold, flat fee otherwise.
#[must_use]
pub fn shipping_minor(subtotal: i64) -> i64 {
    if subtotal > FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_FEE
    }
}

fn percent_of_minor(percent: &Percentage, minor: i64) -> Result<i64, PricingError> {
    let minor = Decimal::from_i64(minor).ok_or(PricingError::TaxConversion)?;

    ((*percent) * Decimal::ONE) // decimal_percentage doesn't expose the underlying Decimal
        .checked_mul(minor)
        .ok_or(PricingError::TaxConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PricingError::TaxConversion)
}

/// Subtotal, tax, shipping and total computed together from one set of line items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartTotals {
    subtotal: i64,
    tax: i64,
    shipping: i64,
    total: i64,
}

impl CartTotals {
    /// Price a set of line items.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if any amount overflows.
    pub fn from_items(items: &[CartLineItem]) -> Result<Self, PricingError> {
        let subtotal = subtotal_minor(items)?;
        let tax = tax_minor(subtotal)?;
        let shipping = shipping_minor(subtotal);

        let total = subtotal
            .checked_add(tax)
            .and_then(|sum| sum.checked_add(shipping))
            .ok_or(PricingError::Overflow)?;

        Ok(Self {
            subtotal,
            tax,
            shipping,
            total,
        })
    }

    /// Sum of discounted line prices before tax and shipping
    pub fn subtotal(&self) -> Money<'static, Currency> {
        money(self.subtotal)
    }

    /// Tax on the subtotal
    pub fn tax(&self) -> Money<'static, Currency> {
        money(self.tax)
    }

    /// Shipping fee
    pub fn shipping(&self) -> Money<'static, Currency> {
        money(self.shipping)
    }

    /// Subtotal plus tax plus shipping
    pub fn total(&self) -> Money<'static, Currency> {
        money(self.total)
    }

    /// Whether shipping was waived.
    pub fn has_free_shipping(&self) -> bool {
        self.shipping == 0
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use testresult::TestResult;

    use crate::products::Product;

    use super::*;

    fn line(price: u64, quantity: u32) -> CartLineItem {
        CartLineItem::new(
            Product::new(format!("p-{price}"), "Product", price),
            NonZeroU32::new(quantity).unwrap_or(NonZeroU32::MIN),
        )
    }

    #[test]
    fn totals_for_two_ten_dollar_items() -> TestResult {
        let totals = CartTotals::from_items(&[line(10_00, 2)])?;

        assert_eq!(totals.subtotal(), money(20_00));
        assert_eq!(totals.tax(), money(1_60));
        assert_eq!(totals.shipping(), money(5_99));
        assert_eq!(totals.total(), money(27_59));
        assert!(!totals.has_free_shipping());

        Ok(())
    }

    #[test]
    fn empty_cart_still_pays_flat_shipping() -> TestResult {
        let totals = CartTotals::from_items(&[])?;

        assert_eq!(totals.subtotal(), money(0));
        assert_eq!(totals.tax(), money(0));
        assert_eq!(totals.shipping(), money(FLAT_SHIPPING_FEE));

        Ok(())
    }

    #[test]
    fn shipping_threshold_is_strict() {
        assert_eq!(shipping_minor(50_00), FLAT_SHIPPING_FEE);
        assert_eq!(shipping_minor(50_01), 0);
    }

    #[test]
    fn tax_rounds_to_nearest_minor_unit() -> TestResult {
        // 8% of 50.01 is 4.0008
        assert_eq!(tax_minor(50_01)?, 4_00);
        // 8% of 0.19 is 0.0152
        assert_eq!(tax_minor(19)?, 2);
        // 8% of 0.06 is 0.0048
        assert_eq!(tax_minor(6)?, 0);

        Ok(())
    }

    #[test]
    fn line_total_uses_discount_price() -> TestResult {
        let item = CartLineItem::new(
            Product::new("b", "Headphones", 100_00).with_discount_price(80_00),
            NonZeroU32::MIN,
        );

        assert_eq!(line_total_minor(&item)?, 80_00);

        Ok(())
    }

    #[test]
    fn line_total_out_of_range_errors() {
        let item = line(u64::MAX, 1);

        assert!(matches!(
            line_total_minor(&item),
            Err(PricingError::LineOutOfRange(_))
        ));
    }

    #[test]
    fn subtotal_overflow_errors() {
        let items = [line(i64::MAX.unsigned_abs(), 1), line(1, 1)];

        assert_eq!(subtotal_minor(&items), Err(PricingError::Overflow));
    }

    #[test]
    fn tax_conversion_overflow_errors() {
        let result = percent_of_minor(&Percentage::from(2.0), i64::MAX);

        assert_eq!(result, Err(PricingError::TaxConversion));
    }
}
