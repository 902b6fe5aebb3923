//! Suite orchestrator.
//!
//! Runs the registered test cases strictly in order, isolating each case
//! from the others' failures: a case may fail, time out, or panic without
//! affecting the cases after it. Panics are caught at the orchestrator
//! boundary by running every case on its own task and inspecting the join
//! result.
//!
//! Preconditions (device node present, sysfs attribute surface present,
//! caller privileged) are checked once before any case runs; failing them
//! aborts the whole suite with a fatal error rather than a per-case
//! failure.

use crate::checks;
use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::report::{SuiteReport, TestOutcome};
use crate::sysfs::{ConfigPort, ATTR_MODE, ATTR_SAMPLING_MS, ATTR_STATS, ATTR_THRESHOLD_MC};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Shared, read-only context handed to every test case.
#[derive(Debug)]
pub struct TestContext {
    pub config: HarnessConfig,
    pub port: ConfigPort,
}

impl TestContext {
    pub fn new(config: HarnessConfig) -> Self {
        let port = ConfigPort::new(config.paths.clone());
        Self { config, port }
    }
}

/// One conformance test case.
///
/// Implementations follow the uniform contract: capture the configuration
/// they mutate, apply the exercising condition, observe against a deadline,
/// verify, restore unconditionally, and return an outcome. Restoration
/// failure downgrades the outcome to failed but never aborts the suite.
#[async_trait]
pub trait TestCase: Send + Sync {
    /// Stable case identifier used in the report.
    fn name(&self) -> &'static str;

    /// Execute the case end to end. Must not leave configuration changed.
    async fn run(&self, ctx: &TestContext) -> TestOutcome;
}

/// Ordered collection of test cases plus the precondition gate.
pub struct Suite {
    cases: Vec<Arc<dyn TestCase>>,
}

impl Suite {
    /// The standard six-case conformance suite, in its fixed order.
    pub fn standard() -> Self {
        Self {
            cases: checks::standard_cases(),
        }
    }

    /// A suite over an explicit case list. Used for single-case runs and
    /// by tests of the orchestrator itself.
    pub fn with_cases(cases: Vec<Arc<dyn TestCase>>) -> Self {
        Self { cases }
    }

    /// One-time environment check: device node, sysfs attributes, privilege.
    pub fn check_preconditions(config: &HarnessConfig) -> HarnessResult<()> {
        if !config.paths.device.exists() {
            return Err(HarnessError::Precondition(format!(
                "device node {} not found (is the driver loaded?)",
                config.paths.device.display()
            )));
        }
        for attr in [ATTR_SAMPLING_MS, ATTR_THRESHOLD_MC, ATTR_MODE, ATTR_STATS] {
            let path = config.paths.attr(attr);
            if !path.exists() {
                return Err(HarnessError::Precondition(format!(
                    "sysfs attribute {} not found",
                    path.display()
                )));
            }
        }
        if !nix::unistd::Uid::effective().is_root() {
            return Err(HarnessError::Precondition(
                "configuration writes require root privileges".into(),
            ));
        }
        Ok(())
    }

    /// Check preconditions, then run every case in order.
    pub async fn run(&self, ctx: Arc<TestContext>) -> HarnessResult<SuiteReport> {
        Self::check_preconditions(&ctx.config)?;
        Ok(self.run_cases(ctx).await)
    }

    /// Run every case in order without the precondition gate.
    ///
    /// Each case executes on its own task so that an unexpected panic is
    /// contained: it is recorded as that case's failure and the remaining
    /// cases still run.
    pub async fn run_cases(&self, ctx: Arc<TestContext>) -> SuiteReport {
        let mut report = SuiteReport::new();
        for case in &self.cases {
            let name = case.name();
            info!(case = name, "--- starting test case ---");
            let task_case = Arc::clone(case);
            let task_ctx = Arc::clone(&ctx);
            let handle = tokio::spawn(async move { task_case.run(&task_ctx).await });
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_err) if join_err.is_panic() => {
                    error!(case = name, "test case panicked");
                    TestOutcome::failed(name, format!("panicked: {join_err}"))
                }
                Err(join_err) => {
                    TestOutcome::failed(name, format!("task aborted: {join_err}"))
                }
            };
            info!(
                case = name,
                passed = outcome.passed,
                "--- test case finished ---"
            );
            report.record(outcome);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_device_node_fails_preconditions() {
        let mut config = HarnessConfig::default();
        config.paths.device = PathBuf::from("/nonexistent/simtemp");
        let err = Suite::check_preconditions(&config);
        assert!(matches!(err, Err(HarnessError::Precondition(_))));
    }

    #[tokio::test]
    async fn run_aborts_fatally_when_preconditions_fail() {
        let mut config = HarnessConfig::default();
        config.paths.device = PathBuf::from("/nonexistent/simtemp");
        let ctx = std::sync::Arc::new(TestContext::new(config));
        let result = Suite::standard().run(ctx).await;
        // No per-case report: the whole run is rejected up front.
        assert!(matches!(result, Err(HarnessError::Precondition(_))));
    }

    #[test]
    fn missing_sysfs_attribute_fails_preconditions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let device = dir.path().join("simtemp");
        std::fs::write(&device, []).expect("device stand-in");

        let mut config = HarnessConfig::default();
        config.paths.device = device;
        config.paths.sysfs = dir.path().join("sysfs");
        let err = Suite::check_preconditions(&config);
        let msg = match err {
            Err(HarnessError::Precondition(msg)) => msg,
            other => panic!("expected precondition error, got {other:?}"),
        };
        assert!(msg.contains("sampling_ms"));
    }
}
