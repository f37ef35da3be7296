use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::{debug, info, warn};
use visual_suite_types::ComparisonResult;

use super::{ListenerProperties, PropertyError, SuiteListener};
use crate::config::{Configuration, TestDescriptor};
use crate::suite::{SuiteSummary, TestFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Debug,
    Info,
}

/// Traces every suite event.
///
/// Property `level` selects `debug` or `info` (the default).
#[derive(Debug)]
pub struct LoggingListener {
    level: LogLevel,
}

impl LoggingListener {
    pub const TYPE: &'static str = "logging";

    pub fn new() -> Self {
        Self {
            level: LogLevel::Info,
        }
    }

    fn emit(&self, event: &str, detail: &str) {
        match self.level {
            LogLevel::Debug => debug!(event, detail, "suite event"),
            LogLevel::Info => info!(event, detail, "suite event"),
        }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl SuiteListener for LoggingListener {
    fn set_properties(&mut self, properties: &ListenerProperties) -> Result<(), PropertyError> {
        if let Some(level) = properties.get("level") {
            self.level = match level.trim().to_ascii_lowercase().as_str() {
                "debug" => LogLevel::Debug,
                "info" => LogLevel::Info,
                _ => return Err(PropertyError::new("level", level, "expected 'debug' or 'info'")),
            };
        }
        Ok(())
    }

    fn configuration_parsed(&self, configuration: &Configuration) {
        self.emit(
            "configuration-parsed",
            &format!("{} tests", configuration.tests().len()),
        );
    }

    fn test_parsed(&self, test: &TestDescriptor) {
        self.emit("test-parsed", &test.name);
    }

    fn image_parsed(&self) {
        self.emit("image-parsed", "");
    }

    fn sample_compared(&self, test: &TestDescriptor, result: &ComparisonResult) {
        let verdict = if result.equal_images { "same" } else { "different" };
        self.emit("sample-compared", &format!("{}: {verdict}", test.name));
    }

    fn sample_failed(&self, test: &TestDescriptor, failure: &TestFailure) {
        self.emit("sample-failed", &format!("{}: {failure}", test.name));
    }

    fn suite_completed(&self, summary: &SuiteSummary) {
        self.emit(
            "suite-completed",
            &format!(
                "{} same, {} different, {} failed",
                summary.same, summary.different, summary.failed
            ),
        );
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub tests: u64,
    pub images: u64,
    pub same: u64,
    pub different: u64,
    pub failed: u64,
}

/// Counts suite outcomes and optionally writes them as JSON.
///
/// Property `output` names the file written when the suite completes.
#[derive(Debug, Default)]
pub struct SummaryListener {
    output: Option<PathBuf>,
    tests: AtomicU64,
    images: AtomicU64,
    same: AtomicU64,
    different: AtomicU64,
    failed: AtomicU64,
}

impl SummaryListener {
    pub const TYPE: &'static str = "summary";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            tests: self.tests.load(Ordering::Relaxed),
            images: self.images.load(Ordering::Relaxed),
            same: self.same.load(Ordering::Relaxed),
            different: self.different.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn write_summary(&self, path: &Path) -> Result<(), std::io::Error> {
        let encoded = serde_json::to_vec_pretty(&self.counts()).map_err(std::io::Error::other)?;
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, encoded)
    }
}

impl SuiteListener for SummaryListener {
    fn set_properties(&mut self, properties: &ListenerProperties) -> Result<(), PropertyError> {
        self.output = properties.path("output");
        Ok(())
    }

    fn test_parsed(&self, _test: &TestDescriptor) {
        self.tests.fetch_add(1, Ordering::Relaxed);
    }

    fn image_parsed(&self) {
        self.images.fetch_add(1, Ordering::Relaxed);
    }

    fn sample_compared(&self, _test: &TestDescriptor, result: &ComparisonResult) {
        if result.equal_images {
            self.same.fetch_add(1, Ordering::Relaxed);
        } else {
            self.different.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn sample_failed(&self, _test: &TestDescriptor, _failure: &TestFailure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn suite_completed(&self, _summary: &SuiteSummary) {
        let Some(path) = self.output.as_ref() else {
            return;
        };
        match self.write_summary(path) {
            Ok(()) => debug!(path = %path.display(), "summary written"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to write summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visual_suite_types::{Area, ComparisonResult};

    use crate::config::TestDescriptor;

    #[test]
    fn logging_level_is_validated() {
        let mut listener = LoggingListener::new();
        listener
            .set_properties(&ListenerProperties::new().with("level", "DEBUG"))
            .unwrap();
        assert_eq!(listener.level, LogLevel::Debug);
        let err = listener
            .set_properties(&ListenerProperties::new().with("level", "trace"))
            .unwrap_err();
        assert_eq!(err.key, "level");
    }

    #[test]
    fn summary_counts_and_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.json");
        let mut listener = SummaryListener::new();
        listener
            .set_properties(
                &ListenerProperties::new().with("output", path.to_string_lossy().to_string()),
            )
            .unwrap();

        let test = TestDescriptor::new("t", "t.png", "t.png");
        listener.test_parsed(&test);
        listener.image_parsed();
        listener.image_parsed();
        listener.sample_compared(&test, &ComparisonResult::identical(Area::new(1, 1)));
        listener.suite_completed(&SuiteSummary {
            same: 1,
            different: 0,
            failed: 0,
        });

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["tests"], 1);
        assert_eq!(written["images"], 2);
        assert_eq!(written["same"], 1);
        assert_eq!(written["different"], 0);
    }
}
