//! Diagnostic sinks
//!
//! A document reports human-readable progress and error text to the sink it
//! was built with. Nothing structured crosses this boundary.

use std::sync::Mutex;

pub trait DiagnosticSink: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to `tracing` under the `treedb::diagnostics` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "treedb::diagnostics", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "treedb::diagnostics", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "treedb::diagnostics", "{}", message);
    }
}

/// Keeps every message, prefixed with its level
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }

    fn push(&self, level: &str, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("{}: {}", level, message));
    }
}

impl DiagnosticSink for MemorySink {
    fn info(&self, message: &str) {
        self.push("INFO", message);
    }

    fn warn(&self, message: &str) {
        self.push("WARN", message);
    }

    fn error(&self, message: &str) {
        self.push("ERROR", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_levels() {
        let sink = MemorySink::new();
        sink.info("loaded 3 nodes");
        sink.error("cascade failed");

        assert_eq!(sink.lines(), vec!["INFO: loaded 3 nodes", "ERROR: cascade failed"]);
        assert!(sink.contains("cascade"));
        assert!(!sink.contains("WARN"));
    }
}
