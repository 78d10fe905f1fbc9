//! Subscriber setup for binaries, demos and tests.
//!
//! Library code only emits `tracing` events. Installing a subscriber is the
//! caller's decision; `init_logging` is the stock way to do it.

use tracing::Level;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

use crate::error::CoreError;

/// Install a global subscriber.
///
/// `RUST_LOG` wins when set; otherwise every `causeway*` target logs at
/// `level` and everything else at `warn`.
pub fn init_logging(level: Level, json_output: bool) -> Result<(), CoreError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("causeway={},warn", level)));

    let result = if json_output {
        let fmt_layer = fmt::layer()
            .json()
            .with_timer(SystemTime)
            .with_target(true)
            .with_thread_names(true);
        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(SystemTime)
            .with_target(true)
            .with_thread_names(true);
        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    result.map_err(|e| CoreError::Logging {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_an_error_not_a_panic() {
        let _ = init_logging(Level::DEBUG, false);
        let second = init_logging(Level::DEBUG, true);
        assert!(matches!(second, Err(CoreError::Logging { .. })));
    }
}
