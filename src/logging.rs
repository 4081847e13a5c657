//! Subscriber setup for the `wearable` binary and embedding hosts.
//!
//! Adapters, the provider and the loader only emit `tracing` events. The CLI
//! installs a subscriber from `[logging] level` in the config file. A host
//! linking the C library may already own a global subscriber, so installation
//! here never replaces one and never panics.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log at the config file's default level (`info`)
pub fn init() -> bool {
    init_with_level("info")
}

/// Install a stderr subscriber filtered at `default_level`.
///
/// `default_level` accepts a bare level or a directive list such as
/// `"warn,wearable_metrics=debug"`. `RUST_LOG` wins when set. Output goes to
/// stderr so `wearable` can keep stdout for JSON.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_with_level(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_refused() {
        init_test();
        // a subscriber is already installed for this test binary
        assert!(!init_with_level("warn"));
        assert!(!init_with_level("not a directive ==="));
        tracing::debug!("still logging through the test subscriber");
    }
}
