//! CLI configuration

use clap::Parser;

use crate::{
    commands::Command,
    config::{logging::LoggingConfig, storage::StorageConfig},
};

pub(crate) mod logging;
pub(crate) mod storage;

/// Lattice Cart CLI configuration
#[derive(Debug, Parser)]
#[command(name = "lattice-cart", about = "Lattice Cart CLI", long_about = None)]
pub(crate) struct CliConfig {
    /// Cart storage and catalog settings.
    #[command(flatten)]
    pub storage: StorageConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Cart command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub(crate) fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}
