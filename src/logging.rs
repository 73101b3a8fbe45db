//! Tracing subscriber setup shared by the binaries

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "server_stats_engine=info";

/// Initialize stderr logging filtered by `RUST_LOG`
///
/// `verbose` raises the crate default to `debug`. Logs go to stderr so the
/// one-line status on stdout stays clean for the scheduler.
pub fn init(verbose: bool) {
    let default = if verbose {
        "server_stats_engine=debug,server_stats=debug"
    } else {
        DEFAULT_FILTER
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    // try_init: a second call (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
