//! Tracing setup for applications embedding the compiler.
//!
//! The compiler itself only emits `tracing` events: parsed filters and
//! finished encodes at `debug`, each encoded node at `trace`, and empty
//! `$in` lists at `warn`. Installing a subscriber is left to the host
//! application, or to [`init`] when the `tracing-subscriber` feature is on.
//!
//! # Environment Variables
//!
//! - `WQL_DEBUG=true|1|yes` - enable debug logging
//! - `WQL_LOG_LEVEL=trace|debug|info|warn|error` - pick a level explicitly
//! - `WQL_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use wql_query::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "WQL_DEBUG";
const LEVEL_VAR: &str = "WQL_LOG_LEVEL";
const FORMAT_VAR: &str = "WQL_LOG_FORMAT";

/// Subscriber output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Check whether `WQL_DEBUG` asks for debug output.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The level from `WQL_LOG_LEVEL`, falling back to `debug` when
/// `WQL_DEBUG` is set and `warn` otherwise.
pub fn log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var(LEVEL_VAR) {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// The format from `WQL_LOG_FORMAT`.
pub fn log_format() -> LogFormat {
    env::var(FORMAT_VAR)
        .map(|f| LogFormat::from_name(&f))
        .unwrap_or_default()
}

/// Install a global subscriber for the compiler's targets.
///
/// Does nothing unless `WQL_DEBUG` or `WQL_LOG_LEVEL` is set, or when the
/// `tracing-subscriber` feature is disabled. Only the first call has any
/// effect.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let filter = EnvFilter::try_new(format!("wql={},wql_query={}", level, level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);

            // A host that already installed a subscriber keeps it.
            let installed = match log_format() {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };
            if installed.is_ok() {
                tracing::info!(level, format = ?log_format(), "WQL logging initialized");
            }
        }
    });
}

/// Set `WQL_LOG_LEVEL` and call [`init`].
///
/// # Safety
///
/// Mutates the process environment; call it at startup before spawning
/// threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("compact"), LogFormat::Compact);
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("xml"), LogFormat::Json);
    }

    #[test]
    fn test_log_level_default() {
        // SAFETY: no other test in this crate touches these variables.
        unsafe {
            env::remove_var(DEBUG_VAR);
            env::remove_var(LEVEL_VAR);
        }
        assert!(!is_debug_enabled());
        assert_eq!(log_level(), "warn");
    }
}
