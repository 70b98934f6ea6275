//! Log subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::{RunnerError, RunnerResult};

/// Default filter directive for a `--verbose` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global log subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `verbosity` when set.
pub fn init_logging(verbosity: u8) -> RunnerResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| RunnerError::Logging(e.to_string()))
}
