//! Thin call-site wrapper around the `log` facade crate.
//!
//! Call sites throughout this crate use `log!(LogDebug, "...", args)` rather
//! than reaching for `log::debug!` directly, so the level names read the same
//! way the rest of the state-machine code does (`LogDebug`, `LogWarn`, ...).
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    LogError,
    LogWarn,
    LogInfo,
    LogDebug,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::LogError => "ERROR",
            LogLevel::LogWarn => "WARN",
            LogLevel::LogInfo => "INFO",
            LogLevel::LogDebug => "DEBUG",
        };
        write!(f, "{}", s)
    }
}

#[macro_export]
macro_rules! log {
    ($level:ident, $($arg:tt)*) => {
        match $crate::logging::LogLevel::$level {
            $crate::logging::LogLevel::LogError => log::error!($($arg)*),
            $crate::logging::LogLevel::LogWarn => log::warn!($($arg)*),
            $crate::logging::LogLevel::LogInfo => log::info!($($arg)*),
            $crate::logging::LogLevel::LogDebug => log::debug!($($arg)*),
        }
    };
}
