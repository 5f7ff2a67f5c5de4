//! Diagnostic tracing for a running board.
//!
//! Command launches, exit codes and state transitions go to stderr through
//! `tracing`, filtered by `RUST_LOG`. Button faces are presentation output
//! (see [`crate::console`]) and always go to stdout, whatever the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_DIRECTIVE: &str = "macroboard=info";

/// Install the global subscriber. Call once, from `main`.
///
/// ```bash
/// RUST_LOG=macroboard::engine=debug macroboard run
/// ```
pub fn init() {
    tracing_subscriber::registry()
        .with(filter_from_env())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}
