//! Products

use std::{
    borrow::Borrow,
    fmt::{Display, Formatter, Result as FmtResult},
};

use serde::{Deserialize, Serialize};

/// Product identifier, as assigned by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a product identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ProductId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Product, as supplied by the catalog.
///
/// Prices are held in minor units (cents). The cart keeps its own copy of a product from the
/// moment it was added, so a product here can be stale relative to the live catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product identifier
    pub id: ProductId,

    /// Display name
    pub name: String,

    /// Long-form description
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

    /// Image URLs, primary image first
    #[serde(default)]
    pub images: Vec<String>,

    /// Base price in minor units
    pub price: u64,

    /// Discounted price in minor units, if the product is on sale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<u64>,

    /// Whether the product can currently be bought
    pub in_stock: bool,

    /// Units available
    #[serde(default)]
    pub stock_quantity: u32,
}

impl Product {
    /// Create a product with a name and base price, in stock, with no discount.
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, price: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            brand: String::new(),
            category: String::new(),
            sku: String::new(),
            images: Vec::new(),
            price,
            discount_price: None,
            in_stock: true,
            stock_quantity: 0,
        }
    }

    /// Set the discounted price.
    #[must_use]
    pub fn with_discount_price(mut self, discount_price: u64) -> Self {
        self.discount_price = Some(discount_price);
        self
    }

    /// The price charged for one unit: the discount price when present, otherwise the base price.
    #[must_use]
    pub fn effective_price(&self) -> u64 {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether a discount price is set.
    #[must_use]
    pub fn is_on_sale(&self) -> bool {
        self.discount_price.is_some()
    }
}
