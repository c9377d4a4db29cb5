//! Telemetry
//!
//! Pluggable log sink. The engine narrates what it decided (refresh skipped,
//! state matched, tokens persisted) without ever logging token or secret
//! values; hosts route messages wherever they like.

/// Log severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

/// Log sink interface (for dependency injection).
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Silent sink, the default when a host configures nothing.
#[derive(Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}

/// Sink that forwards to the `tracing` ecosystem.
#[derive(Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "oauth2_engine", "{message}"),
            LogLevel::Info => tracing::info!(target: "oauth2_engine", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "oauth2_engine", "{message}"),
            LogLevel::Error => tracing::error!(target: "oauth2_engine", "{message}"),
        }
    }
}

/// Capturing sink for tests.
#[derive(Default)]
pub struct InMemoryLogger {
    entries: std::sync::Mutex<Vec<(LogLevel, String)>>,
}

impl InMemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .any(|(_, m)| m.contains(fragment))
    }
}

impl Logger for InMemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        self.entries.lock().unwrap().push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_logger_captures() {
        let logger = InMemoryLogger::new();
        logger.info("Refreshing access token");
        logger.warn("State mismatch");

        let entries = logger.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], (LogLevel::Info, "Refreshing access token".into()));
        assert!(logger.contains("State mismatch"));
        assert!(!logger.contains("access_token=X"));
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
    }
}
