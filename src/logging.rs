//! Tracing subscriber setup for binaries and tests.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{QuarryError, Result};

/// Installs a global `fmt` subscriber filtered by `level` (an `EnvFilter` directive).
///
/// Output goes to stderr so machine-readable results on stdout stay clean.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| QuarryError::InvalidOwned(format!("invalid log level: {e}")))?,
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|_| QuarryError::Invalid("logging already initialized"))
}
