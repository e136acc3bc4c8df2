//! Diagnostic logging.
//!
//! Structured events go through `tracing` to stderr. Progress and the final
//! report are printed to stdout by [`crate::output`] and are not affected by
//! the log level.
//!
//! The default level comes from the `-v` count; `RUST_LOG` overrides it:
//!
//! | Flag | Level |
//! |------|-------|
//! | (none) | `warn` |
//! | `-v` | `info` |
//! | `-vv` | `debug` |
//! | `-vvv` | `trace` |

use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Level used when `RUST_LOG` is not set.
pub fn default_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(verbosity: u8) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level(verbosity).into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|err| LoggingError::Install(err.to_string()))
}
