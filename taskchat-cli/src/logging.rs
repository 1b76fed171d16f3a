//! Diagnostics for the `taskchat` binary.
//!
//! Everything goes to stderr so stdout carries only the product output
//! (the conversation, task results, listings).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the tracing subscriber.
///
/// Reads `RUST_LOG`, defaults to `warn`. Compact format.
///
/// ```bash
/// RUST_LOG=taskchat_core=debug taskchat run "echo hi"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
