//! Minimal injectable logging sink (ambient stack — §4.7 calls for a
//! swappable logger, not a logging framework). Grounded in the teacher's
//! `DiObserver`/`LoggingObserver` pattern: a small trait plus a
//! stdout-backed default, swappable atomically.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(s)
    }
}

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::Debug, message);
    }
    fn info(&self, message: &str) {
        self.log(Level::Info, message);
    }
    fn warn(&self, message: &str) {
        self.log(Level::Warn, message);
    }
    fn error(&self, message: &str) {
        self.log(Level::Error, message);
    }
}

/// Default sink: writes `[LEVEL] message` to stdout.
#[derive(Debug, Default)]
pub struct StdoutLogger;

impl Logger for StdoutLogger {
    fn log(&self, level: Level, message: &str) {
        println!("[{level}] {message}");
    }
}

/// A sink formatting messages as single-line JSON, used by scenario S5 (a
/// post-config hook reading `logFormat == "json"` and installing this).
#[derive(Debug, Default)]
pub struct JsonLogger;

impl Logger for JsonLogger {
    fn log(&self, level: Level, message: &str) {
        println!(
            "{{\"level\":\"{}\",\"message\":{}}}",
            level,
            serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string())
        );
    }
}

pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(StdoutLogger)
}
