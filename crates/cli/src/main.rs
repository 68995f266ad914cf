//! Lattice Cart CLI

use std::{io, process};

use tracing::error;

use crate::{commands::Context, config::CliConfig};

mod commands;
mod config;
mod observability;

/// Lattice Cart CLI entry point
pub fn main() {
    let config = CliConfig::load().unwrap_or_else(|error| error.exit());

    if let Err(init_error) = observability::init_subscriber(&config.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized, must use eprintln for setup errors"
        )]
        {
            eprintln!("{init_error}");
        }

        process::exit(1);
    }

    let ctx = Context::open(&config.storage);
    let mut out = io::stdout().lock();

    if let Err(command_error) = config.command.run(&ctx, &mut out) {
        error!("{command_error}");

        process::exit(1);
    }
}
