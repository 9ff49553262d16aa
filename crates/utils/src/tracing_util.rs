//! Helpers related to tracing, used by main entrypoints

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

/// The level logged when `RUST_LOG` is unset or names no default.
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::INFO;

/// Build the filter from `RUST_LOG`-style directives; invalid directives
/// are skipped rather than rejected.
fn env_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(DEFAULT_LOG_LEVEL.into())
        .parse_lossy(directives.unwrap_or_default())
}

/// Initialize tracing: compact, untimed events on stderr, so they stay
/// apart from nydus-image's own output on stdout.
pub fn initialize_tracing() {
    let filter = env_filter(std::env::var("RUST_LOG").ok().as_deref());
    let format = tracing_subscriber::fmt::format()
        .without_time()
        .with_target(false)
        .compact();
    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    /// Whether (warn, info, debug) events pass the filter.
    fn enabled_with(directives: Option<&str>) -> (bool, bool, bool) {
        let subscriber = tracing_subscriber::registry().with(env_filter(directives));
        tracing::subscriber::with_default(subscriber, || {
            (
                tracing::enabled!(Level::WARN),
                tracing::enabled!(Level::INFO),
                tracing::enabled!(Level::DEBUG),
            )
        })
    }

    #[test]
    fn test_default_level() {
        assert_eq!(enabled_with(None), (true, true, false));
        assert_eq!(enabled_with(Some("")), (true, true, false));
    }

    #[test]
    fn test_rust_log_overrides() {
        assert_eq!(enabled_with(Some("debug")), (true, true, true));
        assert_eq!(enabled_with(Some("error")), (false, false, false));
        // Garbage falls back to the default
        assert_eq!(enabled_with(Some("foo=notalevel")), (true, true, false));
    }
}
