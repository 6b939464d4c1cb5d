//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Each module that wants them defines its own switch and pulls the macros
//! from the crate root:
//!
//! ```rust
//! const ENABLE_LOGS: bool = true;
//!
//! use examwatch::log_info;
//!
//! log_info!("only logged when ENABLE_LOGS is true");
//! ```
//!
//! The flag lets chatty modules (the analysis loop runs roughly twice a
//! second) be silenced without touching the global log filter.

/// Conditional info logging. Requires a `const ENABLE_LOGS: bool` in scope.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional debug logging. Requires a `const ENABLE_LOGS: bool` in scope.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Conditional warn logging. Requires a `const ENABLE_LOGS: bool` in scope.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional error logging. Requires a `const ENABLE_LOGS: bool` in scope.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
