//! Terminal outcome sink
//!
//! Renders one line per outcome and keeps per-severity counts so the CLI
//! can print a summary and choose its exit code. Rendering lives here;
//! the engine only ever sees the `OutcomeSink` trait.

use std::collections::HashMap;
use std::sync::Mutex;

use conform_core::{OutcomeSink, Severity};

/// Sink that prints outcomes and counts severities
#[derive(Debug, Default)]
pub struct TerminalSink {
    counts: Mutex<HashMap<Severity, usize>>,
}

impl TerminalSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outcomes recorded with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.counts
            .lock()
            .expect("sink lock poisoned")
            .get(&severity)
            .copied()
            .unwrap_or(0)
    }

    /// One-line run summary
    pub fn summary(&self) -> String {
        format!(
            "{} OK, {} info, {} issues, {} errors",
            self.count(Severity::Ok),
            self.count(Severity::Info),
            self.count(Severity::Issue),
            self.count(Severity::Error),
        )
    }

    /// True when the run produced at least one Error outcome
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }
}

impl OutcomeSink for TerminalSink {
    fn log(&self, test: &str, severity: Severity, message: &str) {
        *self
            .counts
            .lock()
            .expect("sink lock poisoned")
            .entry(severity)
            .or_insert(0) += 1;

        match severity {
            Severity::Debug => tracing::debug!("{:<28} {}", test, message),
            Severity::Error => {
                tracing::error!("{:<28} {}", test, message);
                println!("{:8} {:<28} {}", severity.to_string(), test, message);
            }
            Severity::Issue => {
                tracing::warn!("{:<28} {}", test, message);
                println!("{:8} {:<28} {}", severity.to_string(), test, message);
            }
            _ => {
                tracing::info!("{:<28} {}", test, message);
                println!("{:8} {:<28} {}", severity.to_string(), test, message);
            }
        }
    }

    fn set_status(&self, test: &str, action: &str, status: &str) {
        tracing::debug!("{}: {} ({})", test, action, status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accumulate_per_severity() {
        let sink = TerminalSink::new();
        sink.log("a", Severity::Ok, "fine");
        sink.log("b", Severity::Ok, "fine");
        sink.log("c", Severity::Error, "broken");

        assert_eq!(sink.count(Severity::Ok), 2);
        assert_eq!(sink.count(Severity::Error), 1);
        assert!(sink.has_errors());
    }

    #[test]
    fn summary_names_all_buckets() {
        let sink = TerminalSink::new();
        sink.log("a", Severity::Issue, "hmm");
        let summary = sink.summary();
        assert!(summary.contains("1 issues"));
        assert!(summary.contains("0 errors"));
    }
}
