//! Structured logging for debugging vxconsole.
//!
//! Log levels:
//! - ERROR: Transport failures and anything that tears down a session
//! - WARN: Recoverable protocol problems (bad payloads, dropped notifications)
//! - INFO: Connection lifecycle (connect, session open, disconnect, give up)
//! - DEBUG: Dispatch decisions, gate traffic, auto-connect transitions
//! - TRACE: Raw wire lines and notifications
//!
//! Debug mode can be enabled with `--debug` flag or `VXCONSOLE_DEBUG=1` env var.
//! `VXCONSOLE_LOG=trace` (or any level name) overrides the level outright.
//!
//! The playtest [`Transcript`] is separate from the diagnostic log: it records
//! what the user saw in the console, one file per target.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Log levels for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(crate::Error::Validation(format!(
                "unknown log level '{}'",
                other
            ))),
        }
    }
}

/// Directory holding the log, config, settings and transcripts.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".vxconsole"))
}

/// Initialize logging to ~/.vxconsole/vxconsole.log, honoring
/// `VXCONSOLE_DEBUG` and `VXCONSOLE_LOG`.
pub fn init_with_debug(debug: bool) {
    let env_debug = std::env::var("VXCONSOLE_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let debug_enabled = debug || env_debug;
    DEBUG_ENABLED.store(debug_enabled, Ordering::SeqCst);

    let mut level = if debug_enabled {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    if let Ok(Ok(explicit)) = std::env::var("VXCONSOLE_LOG").map(|v| v.parse::<LogLevel>()) {
        level = explicit;
    }
    set_level(level);

    if let Some(dir) = data_dir() {
        init_at(&dir.join("vxconsole.log"));
    }
}

/// Point the logger at an explicit file, truncating it.
///
/// Only the first call wins; later calls are ignored.
pub fn init_at(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    // Truncate file on startup
    let _ = std::fs::write(path, "");
    LOG_PATH.set(path.to_path_buf()).ok();
}

/// Check if debug mode is enabled.
pub fn is_debug() -> bool {
    DEBUG_ENABLED.load(Ordering::Relaxed)
}

/// Set the minimum log level for output.
pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Get the current log level.
pub fn get_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Whether a message at `level` would be written.
pub fn enabled(level: LogLevel) -> bool {
    level <= get_level()
}

/// Log a message at the specified level.
pub fn log_at(level: LogLevel, msg: &str) {
    if !enabled(level) {
        return;
    }

    if let Some(path) = LOG_PATH.get() {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] [{}] {}", timestamp, level.as_str(), msg);
        }
    }
}

pub fn error(msg: &str) {
    log_at(LogLevel::Error, msg);
}

pub fn warn(msg: &str) {
    log_at(LogLevel::Warn, msg);
}

pub fn info(msg: &str) {
    log_at(LogLevel::Info, msg);
}

pub fn debug(msg: &str) {
    log_at(LogLevel::Debug, msg);
}

pub fn trace(msg: &str) {
    log_at(LogLevel::Trace, msg);
}

/// Log macro for INFO level.
#[macro_export]
macro_rules! vlog {
    ($($arg:tt)*) => {
        $crate::log::info(&format!($($arg)*))
    };
}

/// Log macro for ERROR level.
#[macro_export]
macro_rules! vlog_error {
    ($($arg:tt)*) => {
        $crate::log::error(&format!($($arg)*))
    };
}

/// Log macro for WARN level.
#[macro_export]
macro_rules! vlog_warn {
    ($($arg:tt)*) => {
        $crate::log::warn(&format!($($arg)*))
    };
}

/// Log macro for DEBUG level (only logs when debug mode is enabled).
#[macro_export]
macro_rules! vlog_debug {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Debug) {
            $crate::log::debug(&format!($($arg)*))
        }
    };
}

/// Log macro for TRACE level. Skips formatting entirely when disabled,
/// since it sits on the per-notification path.
#[macro_export]
macro_rules! vlog_trace {
    ($($arg:tt)*) => {
        if $crate::log::enabled($crate::log::LogLevel::Trace) {
            $crate::log::trace(&format!($($arg)*))
        }
    };
}

/// Append-only copy of console output for playtest sessions.
///
/// Written as `vxconsole_<target>.log` so several consoles can share a
/// data directory.
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(dir: &Path, target: &str) -> Self {
        let target = if target.is_empty() { "default" } else { target };
        let safe: String = target
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        Self {
            path: dir.join(format!("vxconsole_{}.log", safe)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, line: &str) -> crate::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}
