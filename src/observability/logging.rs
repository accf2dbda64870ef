//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Writes to stderr so stdout stays a clean protocol channel
//! - `RUST_LOG` wins over the configured level

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber.
///
/// Falls back to `celo_mcp=<level>` when `RUST_LOG` is unset or invalid.
pub fn init_logging(default_level: &str) {
    let fallback = format!("celo_mcp={},tower_http=info", default_level);

    let result = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();

    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
