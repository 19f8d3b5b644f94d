//! Directory runner and statistics

use crate::error::TestResult;
use crate::vm_test::{VmTestResults, VmTestRunner};
use pyrite_vm::Fork;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

/// Aggregated test statistics
#[derive(Debug, Default)]
pub struct TestStats {
    /// Total tests executed
    pub total: usize,
    /// Tests passed
    pub passed: usize,
    /// Tests failed
    pub failed: usize,
    /// Total execution time
    pub duration: Duration,
    /// Failed test names with reasons
    pub failures: Vec<(String, String)>,
}

impl TestStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add VM test results
    pub fn add_vm_results(&mut self, results: &VmTestResults) {
        self.total += results.total();
        self.passed += results.passed.len();
        self.failed += results.failed.len();
        for (name, reason) in &results.failed {
            self.failures.push((format!("{}::{}", results.file, name), reason.clone()));
        }
    }

    /// Record a fixture file that could not be read or parsed
    pub fn add_broken_file(&mut self, file: &Path, reason: String) {
        self.total += 1;
        self.failed += 1;
        self.failures.push((file.display().to_string(), reason));
    }

    /// Pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.passed as f64 / self.total as f64) * 100.0
    }
}

impl fmt::Display for TestStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} fixtures, {} passed, {} failed ({:.2}%) in {:.2}s",
            self.total,
            self.passed,
            self.failed,
            self.pass_rate(),
            self.duration.as_secs_f64()
        )?;
        for (name, reason) in &self.failures {
            writeln!(f, "  FAIL {name}: {reason}")?;
        }
        Ok(())
    }
}

/// Main test runner
pub struct TestRunner {
    /// VM test runner
    vm_runner: VmTestRunner,
    /// Verbose output
    verbose: bool,
}

impl TestRunner {
    /// Create new test runner
    pub fn new(fork: Fork, verbose: bool) -> Self {
        Self {
            vm_runner: VmTestRunner::new(fork, verbose),
            verbose,
        }
    }

    /// Run every `.json` fixture under `dir`, recursively
    pub fn run_vm_tests(&self, dir: &Path) -> TestResult<TestStats> {
        let mut stats = TestStats::new();
        let start = Instant::now();

        tracing::info!(dir = %dir.display(), fork = %self.vm_runner.fork(), "running VM fixtures");
        self.run_vm_tests_recursive(dir, &mut stats)?;

        stats.duration = start.elapsed();
        Ok(stats)
    }

    fn run_vm_tests_recursive(&self, dir: &Path, stats: &mut TestStats) -> TestResult<()> {
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "directory not found");
            return Ok(());
        }

        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.run_vm_tests_recursive(&path, stats)?;
            } else if path.extension().is_some_and(|e| e == "json") {
                match self.vm_runner.run_file(&path) {
                    Ok(results) => {
                        if self.verbose && !results.failed.is_empty() {
                            println!(
                                "File: {:?} - {} passed, {} failed",
                                path,
                                results.passed.len(),
                                results.failed.len()
                            );
                        }
                        stats.add_vm_results(&results);
                    }
                    Err(e) => stats.add_broken_file(&path, e.to_string()),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_pass_rate() {
        let mut stats = TestStats::new();
        stats.total = 100;
        stats.passed = 90;
        stats.failed = 10;
        assert!((stats.pass_rate() - 90.0).abs() < 0.01);
    }

    #[test]
    fn test_stats_empty() {
        let stats = TestStats::new();
        assert_eq!(stats.pass_rate(), 100.0);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let runner = TestRunner::new(Fork::Byzantium, false);
        let stats = runner.run_vm_tests(Path::new("/nonexistent/fixtures")).unwrap();
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn test_add_vm_results() {
        let mut results = VmTestResults::new("a.json".to_string());
        results.passed.push("ok".to_string());
        results.failed.push(("bad".to_string(), "gas mismatch".to_string()));

        let mut stats = TestStats::new();
        stats.add_vm_results(&results);
        stats.add_broken_file(Path::new("b.json"), "JSON error".to_string());

        assert_eq!(stats.total, 3);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.failures[0].0, "a.json::bad");

        let summary = stats.to_string();
        assert!(summary.starts_with("3 fixtures, 1 passed, 2 failed"));
        assert!(summary.contains("FAIL a.json::bad: gas mismatch"));
    }
}
