//! Storage & Catalog Config

use std::path::PathBuf;

use clap::Args;

/// Where the cart is saved and where products are read from.
#[derive(Debug, Args)]
pub(crate) struct StorageConfig {
    /// Directory the cart record is written to
    #[arg(long, env = "CART_STORAGE_DIR", default_value = ".lattice-cart")]
    pub storage_dir: PathBuf,

    /// Fixture base directory holding `products/<catalog>.yml`
    #[arg(long, env = "CART_FIXTURES_DIR", default_value = "./fixtures")]
    pub fixtures_dir: PathBuf,

    /// Product catalog name
    #[arg(long, env = "CART_CATALOG", default_value = "catalog")]
    pub catalog: String,
}
