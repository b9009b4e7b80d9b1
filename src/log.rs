//! File logging for the orchestrator.
//!
//! One process-wide sink, filtered by a single threshold. Lines look like
//!
//! ```text
//! 2026-10-18 09:14:03.512 ERROR taskforge::orchestration::orchestrator: phase 0 aborted
//! ```
//!
//! Until [`init`] or [`init_at`] picks a file every macro is a cheap no-op.
//! `TASKFORGE_LOG` sets the threshold by name (`error` through `trace`);
//! `TASKFORGE_DEBUG=1` is shorthand for `debug`.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static SINK: OnceLock<PathBuf> = OnceLock::new();
static THRESHOLD: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

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
    const ALL: [LogLevel; 5] = [
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Threshold requested by the environment, if any.
    ///
    /// `TASKFORGE_LOG` wins over `TASKFORGE_DEBUG`. Unparseable values are
    /// ignored.
    pub fn from_env() -> Option<Self> {
        if let Some(level) = std::env::var("TASKFORGE_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            return Some(level);
        }
        match std::env::var("TASKFORGE_DEBUG").ok()?.to_ascii_lowercase().as_str() {
            "1" | "true" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log level '{}'", s))
    }
}

/// Log to `~/.taskforge/taskforge.log` at the environment's threshold.
pub fn init() {
    if let Some(home) = dirs::home_dir() {
        init_at(&home.join(".taskforge").join("taskforge.log"), LogLevel::Info);
    }
}

/// Log to `path`, truncating it.
///
/// `level` applies unless the environment asks for something else. The
/// first successful call fixes the file for the life of the process.
pub fn init_at(path: &Path, level: LogLevel) {
    set_threshold(LogLevel::from_env().unwrap_or(level));

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if SINK.set(path.to_path_buf()).is_ok() {
        let _ = std::fs::write(path, "");
    }
}

pub fn set_threshold(level: LogLevel) {
    THRESHOLD.store(level as u8, Ordering::SeqCst);
}

pub fn threshold() -> LogLevel {
    let raw = THRESHOLD.load(Ordering::Relaxed);
    LogLevel::ALL
        .get(raw as usize)
        .copied()
        .unwrap_or(LogLevel::Trace)
}

/// Whether a line at `level` would be written.
pub fn enabled(level: LogLevel) -> bool {
    SINK.get().is_some() && level <= threshold()
}

/// Write one line. Used by the `tflog*` macros.
pub fn record(level: LogLevel, target: &str, args: fmt::Arguments<'_>) {
    if !enabled(level) {
        return;
    }
    let Some(path) = SINK.get() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(file, "{} {:<5} {}: {}", now, level, target, args);
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __tflog_at {
    ($level:ident, $($arg:tt)*) => {
        $crate::log::record(
            $crate::log::LogLevel::$level,
            module_path!(),
            format_args!($($arg)*),
        )
    };
}

/// Log at INFO.
#[macro_export]
macro_rules! tflog {
    ($($arg:tt)*) => { $crate::__tflog_at!(Info, $($arg)*) };
}

#[macro_export]
macro_rules! tflog_error {
    ($($arg:tt)*) => { $crate::__tflog_at!(Error, $($arg)*) };
}

#[macro_export]
macro_rules! tflog_warn {
    ($($arg:tt)*) => { $crate::__tflog_at!(Warn, $($arg)*) };
}

#[macro_export]
macro_rules! tflog_debug {
    ($($arg:tt)*) => { $crate::__tflog_at!(Debug, $($arg)*) };
}

#[macro_export]
macro_rules! tflog_trace {
    ($($arg:tt)*) => { $crate::__tflog_at!(Trace, $($arg)*) };
}
