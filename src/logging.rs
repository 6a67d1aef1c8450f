//! Diagnostics for the sidecar.
//!
//! stdout carries the response protocol, so all tracing output goes to
//! stderr. Filtering follows `RUST_LOG` and defaults to `warn`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber. Call once, before handling requests.
///
/// ```bash
/// RUST_LOG=resultd=debug resultd --workspace ./data
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
