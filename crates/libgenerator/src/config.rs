//! Configuration shared by the generators.
//!
//! Generators are drop-in replacements for their systemd counterparts, so
//! there is no config file and no tool-specific environment variables.  The
//! only knobs are the standard `SYSTEMD_LOG_*` variables that the service
//! manager passes to every generator it runs.

use log::LevelFilter;
use std::io::IsTerminal;

pub const ENV_LOG_LEVEL: &str = "SYSTEMD_LOG_LEVEL";
pub const ENV_LOG_TARGET: &str = "SYSTEMD_LOG_TARGET";
pub const ENV_LOG_COLOR: &str = "SYSTEMD_LOG_COLOR";

/// Where log records go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// stderr
    Console,
    /// `/dev/kmsg`
    Kmsg,
    /// The journal is not available this early, so `auto` behaves like `safe`.
    Auto,
    /// `/dev/kmsg` if it can be opened, stderr otherwise.
    Safe,
    /// Drop everything.
    Null,
}

impl LogTarget {
    pub fn parse(s: &str) -> Option<LogTarget> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "console-prefixed" => Some(LogTarget::Console),
            "kmsg" => Some(LogTarget::Kmsg),
            "auto" | "journal-or-kmsg" | "journal" => Some(LogTarget::Auto),
            "safe" | "syslog-or-kmsg" | "syslog" => Some(LogTarget::Safe),
            "null" => Some(LogTarget::Null),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LevelFilter,
    pub target: LogTarget,
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LevelFilter::Info,
            target: LogTarget::Safe,
            color: false,
        }
    }
}

impl LoggingConfig {
    /// Build the logging configuration from the process environment.
    pub fn from_env() -> Self {
        let level = std::env::var(ENV_LOG_LEVEL).ok();
        let target = std::env::var(ENV_LOG_TARGET).ok();
        let color = std::env::var(ENV_LOG_COLOR).ok();
        Self::from_values(
            level.as_deref(),
            target.as_deref(),
            color.as_deref(),
            std::io::stderr().is_terminal(),
        )
    }

    /// Build the logging configuration from raw variable values.  Values that
    /// do not parse are ignored and the default is kept.
    pub fn from_values(
        level: Option<&str>,
        target: Option<&str>,
        color: Option<&str>,
        stderr_is_tty: bool,
    ) -> Self {
        let defaults = LoggingConfig::default();
        LoggingConfig {
            level: level.and_then(parse_log_level).unwrap_or(defaults.level),
            target: target.and_then(LogTarget::parse).unwrap_or(defaults.target),
            color: color.and_then(parse_boolean).unwrap_or(stderr_is_tty),
        }
    }
}

/// Parse a syslog-style level name or number (`0`-`7`).
pub fn parse_log_level(s: &str) -> Option<LevelFilter> {
    let s = s.trim().to_ascii_lowercase();
    let level = match s.as_str() {
        "emerg" | "alert" | "crit" | "err" => LevelFilter::Error,
        "warning" => LevelFilter::Warn,
        "notice" | "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        _ => match s.parse::<u8>().ok()? {
            0..=3 => LevelFilter::Error,
            4 => LevelFilter::Warn,
            5 | 6 => LevelFilter::Info,
            7 => LevelFilter::Debug,
            _ => return None,
        },
    };
    Some(level)
}

/// Parse a systemd-style boolean.
pub fn parse_boolean(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "yes" | "y" | "true" | "t" | "on" => Some(true),
        "0" | "no" | "n" | "false" | "f" | "off" => Some(false),
        _ => None,
    }
}
