//! Structured logging configuration.
//!
//! Library code logs through the `log` facade; `init` installs a tracing
//! subscriber that also captures those records.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize logging to stderr, leaving stdout to the JSON-lines protocol.
///
/// The filter is read from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
///
/// # Example
///
/// ```no_run
/// use wi_server::logging;
///
/// logging::init();
/// tracing::info!("Harness starting");
/// ```
pub fn init() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter())
        .with(fmt_layer)
        .init();

    tracing::info!("Logging initialized");
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
