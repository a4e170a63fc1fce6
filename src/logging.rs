//! Diagnostic logging setup.
//!
//! Pipeline events are emitted with `tracing`; this installs the subscriber
//! that writes them to stderr, leaving stdout to the report.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

/// Default filter when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "warn,dirshift=debug" } else { "warn" }
}

/// Installs the global subscriber. Later calls do nothing.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init(verbose: bool) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(false);
        init(true);
    }

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(false), "warn");
        assert!(default_filter(true).contains("dirshift=debug"));
    }
}
