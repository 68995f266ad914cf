//! Logging subscriber initialisation.

use std::io;

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Registry,
    filter::ParseError,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::logging::{LogFormat, LoggingConfig};

/// Errors raised while initialising logging.
#[derive(Debug, Error)]
pub(crate) enum ObservabilityError {
    /// The log filter directive is malformed.
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        /// Directive as configured
        directive: String,

        /// Parser failure
        source: ParseError,
    },

    /// Failed to initialise tracing subscriber.
    #[error("failed to initialise tracing subscriber: {0}")]
    TracingSubscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Install the global subscriber. Logs go to stderr so command output on stdout stays clean.
pub(crate) fn init_subscriber(config: &LoggingConfig) -> Result<(), ObservabilityError> {
    let filter = build_filter(config)?;

    match config.log_format {
        LogFormat::Compact => init_with_layer(
            filter,
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(true),
        ),
        LogFormat::Pretty => init_with_layer(
            filter,
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(io::stderr),
        ),
        LogFormat::Json => init_with_layer(
            filter,
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_target(true),
        ),
    }
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, ObservabilityError> {
    let directive = config.directive();

    EnvFilter::try_new(directive).map_err(|source| ObservabilityError::Filter {
        directive: directive.to_string(),
        source,
    })
}

fn init_with_layer<L>(filter: EnvFilter, fmt_layer: L) -> Result<(), ObservabilityError>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}
