//! Tracing subscriber setup for binaries and tests embedding the crate.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "planner_sync=info";

/// Installs a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter`. Fails if a global subscriber is already set.
pub fn init(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails() {
        let _ = init(DEFAULT_FILTER);
        assert!(init(DEFAULT_FILTER).is_err());
    }
}
