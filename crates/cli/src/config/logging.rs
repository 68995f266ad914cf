//! Logging Config

use clap::{Args, ValueEnum};

/// How log lines are rendered on stderr.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormat {
    /// One line per event.
    Compact,

    /// Multi-line, for reading by eye while debugging.
    Pretty,

    /// One JSON object per event.
    Json,
}

#[derive(Debug, Args)]
pub(crate) struct LoggingConfig {
    /// Log filter directive, e.g. `info` or `lattice_cart=debug,warn`
    #[arg(long = "log", env = "RUST_LOG", default_value = "info")]
    pub filter: String,

    /// Log line format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Only log errors, overriding the filter
    #[arg(long)]
    pub quiet: bool,
}

impl LoggingConfig {
    /// The filter directive to install.
    pub(crate) fn directive(&self) -> &str {
        if self.quiet { "error" } else { &self.filter }
    }
}
