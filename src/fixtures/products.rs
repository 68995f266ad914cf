//! Product Fixtures

use rust_decimal::{Decimal, prelude::ToPrimitive};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    fixtures::FixtureError,
    pricing::currency,
    products::{Product, ProductId},
};

/// Wrapper for products in YAML, keyed by product id
#[derive(Debug, Deserialize)]
pub struct ProductsFixture {
    /// Map of product id -> product fixture
    pub products: FxHashMap<String, ProductFixture>,
}

/// Product Fixture
#[derive(Debug, Deserialize)]
pub struct ProductFixture {
    /// Product name
    pub name: String,

    /// Product description
    #[serde(default)]
    pub description: String,

    /// Brand name
    #[serde(default)]
    pub brand: String,

    /// Catalog category
    #[serde(default)]
    pub category: String,

    /// Stock keeping unit
    #[serde(default)]
    pub sku: String,

    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,

    /// Product price (e.g., "79.99 USD")
    pub price: String,

    /// Sale price, if discounted (e.g., "59.99 USD")
    #[serde(default)]
    pub discount_price: Option<String>,

    /// Whether the product can be bought
    #[serde(default = "in_stock_by_default")]
    pub in_stock: bool,

    /// Units available
    #[serde(default)]
    pub stock_quantity: u32,
}

fn in_stock_by_default() -> bool {
    true
}

impl ProductFixture {
    /// Build the catalog product for this fixture.
    ///
    /// # Errors
    ///
    /// Returns an error if either price is malformed or not in the cart currency.
    pub fn into_product(self, id: impl Into<ProductId>) -> Result<Product, FixtureError> {
        let price = parse_price(&self.price)?;
        let discount_price = self.discount_price.as_deref().map(parse_price).transpose()?;

        Ok(Product {
            id: id.into(),
            name: self.name,
            description: self.description,
            brand: self.brand,
            category: self.category,
            sku: self.sku,
            images: self.images,
            price,
            discount_price,
            in_stock: self.in_stock,
            stock_quantity: self.stock_quantity,
        })
    }
}

/// Parse price string (e.g., "79.99 USD") into minor units.
///
/// # Errors
///
/// Returns an error if the string is not in the format "AMOUNT CURRENCY", if the amount is not a
/// non-negative decimal with at most two places, or if the currency is not the cart currency.
pub fn parse_price(s: &str) -> Result<u64, FixtureError> {
    let parts: Vec<&str> = s.split_whitespace().collect();

    let [amount, currency_code] = parts.as_slice() else {
        return Err(FixtureError::InvalidPrice(format!(
            "Expected format 'AMOUNT CURRENCY', got: {s}"
        )));
    };

    let amount = amount
        .parse::<Decimal>()
        .map_err(|_err| FixtureError::InvalidPrice(s.to_string()))?;

    if amount.normalize().scale() > 2 {
        return Err(FixtureError::InvalidPrice(format!(
            "Amount has fractions of a cent: {s}"
        )));
    }

    let minor_units = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|value| value.to_u64())
        .ok_or_else(|| FixtureError::InvalidPrice(s.to_string()))?;

    if *currency_code != currency().iso_alpha_code {
        return Err(FixtureError::UnsupportedCurrency((*currency_code).to_string()));
    }

    Ok(minor_units)
}
