//! Severity-classified test outcome stream
//!
//! Every logical check the engine performs emits exactly one outcome record
//! through an [`OutcomeSink`]. The stream is append-only; records are never
//! mutated after emission. Rendering and pass/fail aggregation are the
//! sink implementor's concern, not the engine's.

use std::fmt;
use std::sync::Mutex;

/// Severity of a single test outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// The check passed
    Ok,
    /// Advisory information, not a failure
    Info,
    /// The driver deviates from the protocol in a way that should be fixed
    Issue,
    /// The driver violates a hard protocol requirement
    Error,
    /// Engine diagnostics
    Debug,
    /// Free-form commentary (section headers, skip notices)
    Comment,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Ok => "OK",
            Severity::Info => "INFO",
            Severity::Issue => "ISSUE",
            Severity::Error => "ERROR",
            Severity::Debug => "DEBUG",
            Severity::Comment => "COMMENT",
        };
        write!(f, "{}", label)
    }
}

/// One emitted record per logical check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    /// Name of the member or check that produced this record
    pub test: String,
    pub severity: Severity,
    pub message: String,
}

/// Sink for test outcomes and live progress status
///
/// Implementations must be cheap to call; the engine logs from inside
/// polling loops.
pub trait OutcomeSink: Send + Sync {
    /// Record one test outcome
    fn log(&self, test: &str, severity: Severity, message: &str);

    /// Update the live progress display. The default implementation
    /// discards the status; sinks without a display need not care.
    fn set_status(&self, _test: &str, _action: &str, _status: &str) {}
}

/// A sink that buffers every outcome in memory
///
/// Used by the engine's own tests to assert on the emitted stream, and by
/// callers that want to post-process a finished run.
#[derive(Debug, Default)]
pub struct RecordingSink {
    outcomes: Mutex<Vec<TestOutcome>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn outcomes(&self) -> Vec<TestOutcome> {
        self.outcomes.lock().expect("sink lock poisoned").clone()
    }

    /// Number of outcomes with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.outcomes
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|o| o.severity == severity)
            .count()
    }

    /// All outcomes emitted under the given test name
    pub fn for_test(&self, test: &str) -> Vec<TestOutcome> {
        self.outcomes
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .filter(|o| o.test == test)
            .cloned()
            .collect()
    }
}

impl OutcomeSink for RecordingSink {
    fn log(&self, test: &str, severity: Severity, message: &str) {
        tracing::debug!("{} [{}] {}", test, severity, message);
        self.outcomes
            .lock()
            .expect("sink lock poisoned")
            .push(TestOutcome {
                test: test.to_string(),
                severity,
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_preserves_emission_order() {
        let sink = RecordingSink::new();
        sink.log("RightAscension", Severity::Ok, "12.5");
        sink.log("Declination", Severity::Issue, "out of range");

        let outcomes = sink.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].test, "RightAscension");
        assert_eq!(outcomes[1].severity, Severity::Issue);
    }

    #[test]
    fn count_filters_by_severity() {
        let sink = RecordingSink::new();
        sink.log("a", Severity::Ok, "");
        sink.log("b", Severity::Ok, "");
        sink.log("c", Severity::Error, "");

        assert_eq!(sink.count(Severity::Ok), 2);
        assert_eq!(sink.count(Severity::Error), 1);
        assert_eq!(sink.count(Severity::Issue), 0);
    }

    #[test]
    fn for_test_collects_matching_records() {
        let sink = RecordingSink::new();
        sink.log("Park", Severity::Ok, "parked");
        sink.log("Park", Severity::Ok, "still parked");
        sink.log("UnPark", Severity::Ok, "unparked");

        assert_eq!(sink.for_test("Park").len(), 2);
        assert_eq!(sink.for_test("UnPark").len(), 1);
    }

    #[test]
    fn severity_display_labels() {
        assert_eq!(Severity::Ok.to_string(), "OK");
        assert_eq!(Severity::Issue.to_string(), "ISSUE");
        assert_eq!(Severity::Comment.to_string(), "COMMENT");
    }
}
