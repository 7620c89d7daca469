//! Shared helpers for unit tests (log capture, quiet configuration)

use std::sync::{Arc, Mutex};

use crate::config::RenderConfig;
use crate::log::{self, LogEntry, LogSeverity, Logger};

/// Logger that records every entry for later inspection
///
/// Other tests may log concurrently, so assertions should filter by source
/// or message rather than rely on exact global counts.
#[derive(Clone)]
pub struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl CaptureLogger {
    /// Install a fresh capture logger as the process logger
    pub fn install() -> Self {
        let capture = Self { entries: Arc::new(Mutex::new(Vec::new())) };
        log::set_logger(capture.clone());
        capture
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries emitted by the given source tag
    pub fn entries_from(&self, source: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.source == source)
            .collect()
    }

    /// Whether an entry of `severity` from `source` contains `needle`
    pub fn contains(&self, severity: LogSeverity, source: &str, needle: &str) -> bool {
        self.entries_from(source)
            .iter()
            .any(|e| e.severity == severity && e.message.contains(needle))
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

/// Default configuration with protocol-violation asserts disabled
pub fn quiet_config() -> RenderConfig {
    RenderConfig {
        assert_on_protocol_violation: false,
        ..RenderConfig::default()
    }
}
