//! Cross-platform logging.
//!
//! The `log_*!` macros format their arguments once and hand the message to
//! the platform backend:
//! - Web: `web_sys::console`
//! - Native: `tracing`, under the `narrator_client` target

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(target_arch = "wasm32")]
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    let message = wasm_bindgen::JsValue::from_str(&args.to_string());
    match level {
        Level::Debug => web_sys::console::debug_1(&message),
        Level::Info => web_sys::console::log_1(&message),
        Level::Warn => web_sys::console::warn_1(&message),
        Level::Error => web_sys::console::error_1(&message),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    match level {
        Level::Debug => tracing::debug!(target: "narrator_client", "{}", args),
        Level::Info => tracing::info!(target: "narrator_client", "{}", args),
        Level::Warn => tracing::warn!(target: "narrator_client", "{}", args),
        Level::Error => tracing::error!(target: "narrator_client", "{}", args),
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, falling back to
/// `default_filter`. Safe to call more than once.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Error, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log($crate::logging::Level::Debug, format_args!($($arg)*))
    };
}
