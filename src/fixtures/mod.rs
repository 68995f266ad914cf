//! Fixtures
//!
//! Product catalogs stored as YAML under `<base>/products/<name>.yml`:
//!
//! ```yaml
//! products:
//!   "1":
//!     name: Wireless Bluetooth Headphones Premium
//!     price: 79.99 USD
//!     discount_price: 59.99 USD
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::products::{Product, ProductId};

pub mod products;

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Invalid price format
    #[error("Invalid price format: {0}")]
    InvalidPrice(String),

    /// Currency other than the cart currency
    #[error("Unsupported currency code: {0}")]
    UnsupportedCurrency(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The same product id appears in two loaded files
    #[error("Product defined more than once: {0}")]
    DuplicateProduct(String),
}

/// Product catalog loaded from fixture files.
#[derive(Debug)]
pub struct Catalog {
    base_path: PathBuf,
    products: FxHashMap<ProductId, Product>,
}

impl Catalog {
    /// Create an empty catalog reading from `./fixtures`.
    pub fn new() -> Self {
        Self::with_base_path("./fixtures")
    }

    /// Create an empty catalog reading from a custom base path.
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            products: FxHashMap::default(),
        }
    }

    /// Base path fixture files are read from.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Load products from a YAML fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if a price is invalid, or if a
    /// product id is already loaded.
    pub fn load_products(&mut self, name: &str) -> Result<&mut Self, FixtureError> {
        let file_path = self.base_path.join("products").join(format!("{name}.yml"));
        let contents = fs::read_to_string(&file_path)?;
        let fixture: products::ProductsFixture = serde_norway::from_str(&contents)?;

        let count = fixture.products.len();

        for (id, product_fixture) in fixture.products {
            if self.products.contains_key(id.as_str()) {
                return Err(FixtureError::DuplicateProduct(id));
            }

            let product = product_fixture.into_product(id)?;

            self.products.insert(product.id.clone(), product);
        }

        debug!(path = %file_path.display(), count, "loaded product fixtures");

        Ok(self)
    }

    /// Create a catalog from the named fixture file under `./fixtures`.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture file cannot be loaded.
    pub fn from_set(name: &str) -> Result<Self, FixtureError> {
        let mut catalog = Self::new();

        catalog.load_products(name)?;

        Ok(catalog)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::ProductNotFound`] if no product has this id.
    pub fn product(&self, id: &str) -> Result<&Product, FixtureError> {
        self.products
            .get(id)
            .ok_or_else(|| FixtureError::ProductNotFound(id.to_string()))
    }

    /// All products, ordered by id.
    pub fn products(&self) -> Vec<&Product> {
        let mut products: Vec<&Product> = self.products.values().collect();

        products.sort_by(|a, b| a.id.cmp(&b.id));

        products
    }

    /// Number of products loaded.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether no products are loaded.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
