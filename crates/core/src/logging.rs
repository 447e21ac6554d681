//! Tracing setup shared by frontends.
//!
//! Logs go to stderr so reports printed on stdout stay machine-readable.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Filter directive for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global subscriber once; later calls, or a subscriber that
/// is already installed, are ignored.
///
/// `RUST_LOG` wins over `verbosity` when set.
pub fn init_logging(verbosity: u8, json: bool) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

        let registry = tracing_subscriber::registry().with(env_filter);
        if json {
            let _ = registry
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(true))
                .try_init();
        } else {
            let _ = registry
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .try_init();
        }
    });
}
