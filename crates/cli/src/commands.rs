//! Cart commands

use std::{fmt::Display, io, io::Write, path::PathBuf};

use clap::{Args, Subcommand};
use lattice_cart::{pricing::money, prelude::*};
use thiserror::Error;
use tracing::info;

use crate::config::storage::StorageConfig;

/// Errors raised by a cart command.
#[derive(Debug, Error)]
pub(crate) enum CommandError {
    /// The product catalog could not be read.
    #[error(transparent)]
    Fixture(#[from] FixtureError),

    /// The cart rejected the change.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Cart totals could not be computed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The change was applied but could not be saved.
    #[error("cart changed but was not saved: {0}")]
    Persist(#[from] PersistError),

    /// The product can't be bought right now.
    #[error("product {0} is out of stock")]
    OutOfStock(ProductId),

    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List the catalog
    Products,

    /// Add a product to the cart
    Add(AddArgs),

    /// Remove a product from the cart
    Remove(RemoveArgs),

    /// Set a product's quantity; zero or less removes it
    Update(UpdateArgs),

    /// Empty the cart
    Clear,

    /// Open or close the cart drawer
    Toggle,

    /// Show the cart and its totals
    Show,
}

#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Catalog product id
    pub product_id: String,

    /// Units to add
    #[arg(short, long, default_value_t = 1)]
    pub quantity: u32,
}

#[derive(Debug, Args)]
pub(crate) struct RemoveArgs {
    /// Product id in the cart
    pub product_id: String,
}

#[derive(Debug, Args)]
pub(crate) struct UpdateArgs {
    /// Product id in the cart
    pub product_id: String,

    /// New quantity
    #[arg(allow_negative_numbers = true)]
    pub quantity: i64,
}

/// What a command runs against.
#[derive(Debug)]
pub(crate) struct Context<S: KeyValueStorage> {
    store: CartStore<S>,
    fixtures_dir: PathBuf,
    catalog: String,
}

impl Context<FileStorage> {
    /// Open the cart saved under the configured storage directory.
    pub(crate) fn open(config: &StorageConfig) -> Self {
        let storage = FileStorage::new(&config.storage_dir);

        Self::new(
            CartStore::open(CartPersistence::new(storage)),
            config.fixtures_dir.clone(),
            config.catalog.clone(),
        )
    }
}

impl<S: KeyValueStorage> Context<S> {
    pub(crate) fn new(store: CartStore<S>, fixtures_dir: PathBuf, catalog: String) -> Self {
        Self {
            store,
            fixtures_dir,
            catalog,
        }
    }

    fn load_catalog(&self) -> Result<Catalog, CommandError> {
        let mut catalog = Catalog::with_base_path(&self.fixtures_dir);

        catalog.load_products(&self.catalog)?;

        Ok(catalog)
    }

    fn check_saved(&self) -> Result<(), CommandError> {
        match self.store.take_persist_error() {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }
}

impl Command {
    /// Run the command, writing human-readable output to `out`.
    pub(crate) fn run<S, W>(self, ctx: &Context<S>, out: &mut W) -> Result<(), CommandError>
    where
        S: KeyValueStorage,
        W: Write,
    {
        match self {
            Command::Products => list_products(ctx, out),
            Command::Add(args) => add(ctx, &args, out),
            Command::Remove(args) => remove(ctx, &args, out),
            Command::Update(args) => update(ctx, &args, out),
            Command::Clear => {
                if ctx.store.clear_cart() {
                    writeln!(out, "Cart cleared")?;
                } else {
                    writeln!(out, "Cart is already empty")?;
                }

                ctx.check_saved()
            }
            Command::Toggle => {
                let open = ctx.store.toggle_cart();
                ctx.check_saved()?;

                let state = if open {
                    "open"
                } else {
                    "closed"
                };

                writeln!(out, "Cart drawer {state}")?;

                Ok(())
            }
            Command::Show => show(ctx, out),
        }
    }
}

fn list_products<S: KeyValueStorage, W: Write>(
    ctx: &Context<S>,
    out: &mut W,
) -> Result<(), CommandError> {
    let catalog = ctx.load_catalog()?;

    for product in catalog.products() {
        let price = minor_to_money(product.price)?;

        let mut line = format!("{:<4} {:<40} ", product.id.as_str(), product.name);

        match product.discount_price {
            Some(discount) => {
                line.push_str(&format!("{} (was {price})", minor_to_money(discount)?));
            }
            None => line.push_str(&price.to_string()),
        }

        if !product.in_stock {
            line.push_str("  Out of Stock");
        }

        writeln!(out, "{line}")?;
    }

    Ok(())
}

fn add<S: KeyValueStorage, W: Write>(
    ctx: &Context<S>,
    args: &AddArgs,
    out: &mut W,
) -> Result<(), CommandError> {
    let catalog = ctx.load_catalog()?;
    let product = catalog.product(&args.product_id)?;

    if !product.in_stock {
        return Err(CommandError::OutOfStock(product.id.clone()));
    }

    ctx.store.add_item(product.clone(), args.quantity)?;
    ctx.check_saved()?;

    info!(product = %product.id, quantity = args.quantity, "added to cart");

    writeln!(out, "Added {} x {}", args.quantity, product.name)?;

    show(ctx, out)
}

fn remove<S: KeyValueStorage, W: Write>(
    ctx: &Context<S>,
    args: &RemoveArgs,
    out: &mut W,
) -> Result<(), CommandError> {
    let product_id = ProductId::new(args.product_id.as_str());

    if !ctx.store.remove_item(&product_id) {
        writeln!(out, "Product {product_id} is not in the cart")?;

        return Ok(());
    }

    ctx.check_saved()?;

    writeln!(out, "Removed {product_id}")?;

    show(ctx, out)
}

fn update<S: KeyValueStorage, W: Write>(
    ctx: &Context<S>,
    args: &UpdateArgs,
    out: &mut W,
) -> Result<(), CommandError> {
    let product_id = ProductId::new(args.product_id.as_str());

    if ctx.store.item(&product_id).is_none() {
        writeln!(out, "Product {product_id} is not in the cart")?;

        return Ok(());
    }

    ctx.store.update_quantity(&product_id, args.quantity)?;
    ctx.check_saved()?;

    if args.quantity <= 0 {
        writeln!(out, "Removed {product_id}")?;
    } else {
        writeln!(out, "Set {product_id} to {}", args.quantity)?;
    }

    show(ctx, out)
}

fn show<S: KeyValueStorage, W: Write>(ctx: &Context<S>, out: &mut W) -> Result<(), CommandError> {
    let state = ctx.store.snapshot();

    if state.is_empty() {
        writeln!(out, "Your cart is empty")?;

        return Ok(());
    }

    let count = state.item_count();
    let noun = if count == 1 { "item" } else { "items" };

    writeln!(out, "Cart ({count} {noun})")?;

    for line in state.items() {
        writeln!(
            out,
            "  {:<4} {:<40} x{:<4} {}",
            line.product_id().as_str(),
            line.product().name,
            line.quantity(),
            line.line_total()?,
        )?;
    }

    let totals = state.totals()?;

    writeln!(out, "Subtotal: {}", totals.subtotal())?;
    writeln!(out, "Tax:      {}", totals.tax())?;

    if totals.has_free_shipping() {
        writeln!(out, "Shipping: Free")?;
    } else {
        writeln!(out, "Shipping: {}", totals.shipping())?;
    }

    writeln!(out, "Total:    {}", totals.total())?;

    Ok(())
}

fn minor_to_money(minor: u64) -> Result<impl Display, CommandError> {
    i64::try_from(minor)
        .map(money)
        .map_err(|_err| CommandError::Pricing(PricingError::Overflow))
}
