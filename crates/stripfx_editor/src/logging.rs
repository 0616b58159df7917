// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracing bootstrap for embedding applications.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor the config supplies one
pub const DEFAULT_FILTER: &str = "stripfx_editor=debug,stripfx_curves=info";

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to `filter`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_logging(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_logging(DEFAULT_FILTER);
        assert!(!init_logging("stripfx_editor=trace"));
    }
}
