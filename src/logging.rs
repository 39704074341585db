//! Logging setup for the binary and integration tests.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info";

/// Filter used when RUST_LOG is unset: `level` if given, else [`DEFAULT_FILTER`]
pub fn default_env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::new(level.filter(|l| !l.is_empty()).unwrap_or(DEFAULT_FILTER))
}

/// Install the global subscriber. RUST_LOG wins over `level`. Calling this
/// twice keeps the first subscriber.
pub fn init_logging(level: Option<&str>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_env_filter(level));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_level() {
        let filter = format!("{}", default_env_filter(None));
        assert!(filter.contains("info"));
    }

    #[test]
    fn test_explicit_filter() {
        let filter = format!("{}", default_env_filter(Some("warn,orrery::raster=debug")));
        assert!(filter.contains("orrery::raster=debug"));
        assert!(filter.contains("warn"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Some("error"));
        init_logging(Some("debug"));
    }
}
