//! Test outcomes and the suite report.
//!
//! Each test case produces one immutable [`TestOutcome`]: a pass/fail
//! verdict plus the ordered diagnostic messages the case logged while it
//! ran. [`TestLog`] is the write side — it mirrors every message to
//! `tracing` as the case proceeds and keeps the ordered copy stored in the
//! outcome, so diagnostics survive into the final report.
//!
//! [`SuiteReport`] aggregates outcomes in execution order; the overall
//! verdict is the logical AND of all recorded outcomes.

use std::fmt::Write as _;
use tracing::{info, warn};

/// Diagnostic log accumulated while one test case runs.
#[derive(Debug)]
pub struct TestLog {
    name: &'static str,
    entries: Vec<String>,
}

impl TestLog {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    /// Record a diagnostic message.
    pub fn note(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(case = self.name, "{message}");
        self.entries.push(message);
    }

    /// Record a diagnostic describing a failed check.
    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(case = self.name, "{message}");
        self.entries.push(format!("FAIL: {message}"));
    }

    /// Freeze this log into the case's outcome.
    pub fn into_outcome(self, passed: bool) -> TestOutcome {
        TestOutcome {
            name: self.name,
            passed,
            diagnostics: self.entries,
        }
    }
}

/// Immutable result of one test case.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub name: &'static str,
    pub passed: bool,
    /// Ordered diagnostic messages logged while the case ran.
    pub diagnostics: Vec<String>,
}

impl TestOutcome {
    /// Outcome for a case that failed before producing a log of its own,
    /// e.g. a panic caught at the orchestrator boundary.
    pub fn failed(name: &'static str, reason: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            diagnostics: vec![format!("FAIL: {}", reason.into())],
        }
    }

    fn verdict(&self) -> &'static str {
        if self.passed {
            "PASS"
        } else {
            "FAIL"
        }
    }
}

/// Ordered collection of test outcomes for one suite run.
#[derive(Debug, Default)]
pub struct SuiteReport {
    outcomes: Vec<TestOutcome>,
}

impl SuiteReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next case's outcome, preserving execution order.
    pub fn record(&mut self, outcome: TestOutcome) {
        self.outcomes.push(outcome);
    }

    /// Outcomes in execution order.
    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    /// Find an outcome by case name.
    pub fn outcome(&self, name: &str) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Overall verdict: every recorded outcome passed.
    pub fn all_passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.passed)
    }

    /// Human-readable summary table plus the aggregate verdict line.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- Suite Summary ---");
        for outcome in &self.outcomes {
            let _ = writeln!(out, "{:<28} {}", outcome.name, outcome.verdict());
        }
        let aggregate = if self.all_passed() { "PASS" } else { "FAIL" };
        let _ = writeln!(out, "Overall: {aggregate}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_preserves_message_order() {
        let mut log = TestLog::new("tp1_rate");
        log.note("first");
        log.fail("second");
        log.note("third");
        let outcome = log.into_outcome(false);
        assert_eq!(
            outcome.diagnostics,
            vec!["first", "FAIL: second", "third"]
        );
        assert!(!outcome.passed);
    }

    #[test]
    fn aggregate_is_logical_and() {
        let mut report = SuiteReport::new();
        report.record(TestLog::new("a").into_outcome(true));
        report.record(TestLog::new("b").into_outcome(true));
        assert!(report.all_passed());

        report.record(TestOutcome::failed("c", "boom"));
        assert!(!report.all_passed());
    }

    #[test]
    fn empty_report_is_not_a_pass() {
        assert!(!SuiteReport::new().all_passed());
    }

    #[test]
    fn summary_names_every_case_and_overall() {
        let mut report = SuiteReport::new();
        report.record(TestLog::new("tp1_rate").into_outcome(true));
        report.record(TestOutcome::failed("tp2_alerts", "timeout"));
        let summary = report.summary();
        assert!(summary.contains("tp1_rate"));
        assert!(summary.contains("tp2_alerts"));
        assert!(summary.contains("Overall: FAIL"));
    }

    #[test]
    fn lookup_by_name() {
        let mut report = SuiteReport::new();
        report.record(TestLog::new("tp1_rate").into_outcome(true));
        assert!(report.outcome("tp1_rate").is_some());
        assert!(report.outcome("tp9").is_none());
    }
}
