//! Integration tests for the suite orchestrator: fixed ordering, per-case
//! fault isolation, and aggregate verdicts, exercised with synthetic test
//! cases so no device is required.

use async_trait::async_trait;
use simtemp_harness::config::HarnessConfig;
use simtemp_harness::report::{TestLog, TestOutcome};
use simtemp_harness::suite::{Suite, TestCase, TestContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Records its execution index into a shared counter, then passes or fails.
struct ScriptedCase {
    name: &'static str,
    passes: bool,
    order: Arc<AtomicUsize>,
    seen_at: Arc<AtomicUsize>,
}

#[async_trait]
impl TestCase for ScriptedCase {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, _ctx: &TestContext) -> TestOutcome {
        self.seen_at
            .store(self.order.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
        let mut log = TestLog::new(self.name);
        log.note("scripted case ran");
        log.into_outcome(self.passes)
    }
}

/// Panics mid-run; the orchestrator must contain it.
struct PanickingCase;

#[async_trait]
impl TestCase for PanickingCase {
    fn name(&self) -> &'static str {
        "panicking_case"
    }

    async fn run(&self, _ctx: &TestContext) -> TestOutcome {
        panic!("synthetic fault inside a test case");
    }
}

fn test_ctx() -> Arc<TestContext> {
    // Points at nonexistent paths; synthetic cases never touch them.
    Arc::new(TestContext::new(HarnessConfig::default()))
}

fn scripted(
    name: &'static str,
    passes: bool,
    order: &Arc<AtomicUsize>,
) -> (Arc<dyn TestCase>, Arc<AtomicUsize>) {
    let seen_at = Arc::new(AtomicUsize::new(usize::MAX));
    let case: Arc<dyn TestCase> = Arc::new(ScriptedCase {
        name,
        passes,
        order: Arc::clone(order),
        seen_at: Arc::clone(&seen_at),
    });
    (case, seen_at)
}

#[tokio::test]
async fn cases_run_in_registration_order() {
    let order = Arc::new(AtomicUsize::new(0));
    let (a, a_at) = scripted("first", true, &order);
    let (b, b_at) = scripted("second", true, &order);
    let (c, c_at) = scripted("third", true, &order);

    let report = Suite::with_cases(vec![a, b, c]).run_cases(test_ctx()).await;

    assert_eq!(a_at.load(Ordering::SeqCst), 0);
    assert_eq!(b_at.load(Ordering::SeqCst), 1);
    assert_eq!(c_at.load(Ordering::SeqCst), 2);
    let names: Vec<_> = report.outcomes().iter().map(|o| o.name).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
    assert!(report.all_passed());
}

#[tokio::test]
async fn failing_case_does_not_stop_the_suite() {
    let order = Arc::new(AtomicUsize::new(0));
    let (a, _) = scripted("passes", true, &order);
    let (b, _) = scripted("fails", false, &order);
    let (c, c_at) = scripted("after_failure", true, &order);

    let report = Suite::with_cases(vec![a, b, c]).run_cases(test_ctx()).await;

    // The case after the failure still ran.
    assert_eq!(c_at.load(Ordering::SeqCst), 2);
    assert!(!report.all_passed());
    assert!(report.outcome("fails").is_some_and(|o| !o.passed));
    assert!(report.outcome("after_failure").is_some_and(|o| o.passed));
}

#[tokio::test]
async fn panic_is_recorded_as_that_cases_failure() {
    let order = Arc::new(AtomicUsize::new(0));
    let (before, _) = scripted("before_panic", true, &order);
    let (after, after_at) = scripted("after_panic", true, &order);

    let report = Suite::with_cases(vec![before, Arc::new(PanickingCase), after])
        .run_cases(test_ctx())
        .await;

    let panicked = report.outcome("panicking_case").expect("recorded");
    assert!(!panicked.passed);
    assert!(panicked.diagnostics.iter().any(|d| d.contains("panicked")));

    // The panic did not abort the remaining cases.
    assert_ne!(after_at.load(Ordering::SeqCst), usize::MAX);
    assert!(report.outcome("after_panic").is_some_and(|o| o.passed));
    assert!(!report.all_passed());
}

#[tokio::test]
async fn single_case_suite_reports_just_that_case() {
    let order = Arc::new(AtomicUsize::new(0));
    let (only, _) = scripted("only_case", true, &order);
    let report = Suite::with_cases(vec![only]).run_cases(test_ctx()).await;
    assert_eq!(report.outcomes().len(), 1);
    assert!(report.all_passed());
    assert!(report.summary().contains("Overall: PASS"));
}
