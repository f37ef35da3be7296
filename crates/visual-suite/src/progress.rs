use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use visual_suite_types::ComparisonResult;

use crate::config::{Configuration, TestDescriptor};
use crate::listener::{ListenerProperties, PropertyError, SuiteListener};
use crate::suite::{SuiteSummary, TestFailure};

/// Shows a progress bar over the suite's tests on stderr.
///
/// Property `label` replaces the bar prefix.
pub struct ProgressListener {
    bar: ProgressBar,
    different: AtomicU64,
    failed: AtomicU64,
}

impl ProgressListener {
    pub const TYPE: &'static str = "progress";

    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// Drives an existing bar; tests pass a hidden one.
    pub fn with_bar(bar: ProgressBar) -> Self {
        bar.set_style(bar_style());
        bar.set_prefix("suite");
        Self {
            bar,
            different: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    fn refresh_message(&self) {
        let different = self.different.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        if different > 0 || failed > 0 {
            self.bar
                .set_message(format!("{different} different, {failed} failed"));
        }
    }
}

impl Default for ProgressListener {
    fn default() -> Self {
        Self::new()
    }
}

impl SuiteListener for ProgressListener {
    fn set_properties(&mut self, properties: &ListenerProperties) -> Result<(), PropertyError> {
        if let Some(label) = properties.get("label") {
            let label = label.trim();
            if label.is_empty() {
                return Err(PropertyError::new("label", label, "must not be empty"));
            }
            self.bar.set_prefix(label.to_string());
        }
        Ok(())
    }

    fn configuration_parsed(&self, configuration: &Configuration) {
        self.bar.set_length(configuration.tests().len() as u64);
    }

    fn test_parsed(&self, test: &TestDescriptor) {
        self.bar.set_message(test.name.clone());
    }

    fn sample_compared(&self, _test: &TestDescriptor, result: &ComparisonResult) {
        if !result.equal_images {
            self.different.fetch_add(1, Ordering::Relaxed);
        }
        self.refresh_message();
        self.bar.inc(1);
    }

    fn sample_failed(&self, _test: &TestDescriptor, _failure: &TestFailure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.refresh_message();
        self.bar.inc(1);
    }

    fn suite_completed(&self, summary: &SuiteSummary) {
        self.bar.finish_with_message(format!(
            "{} same, {} different, {} failed",
            summary.same, summary.different, summary.failed
        ));
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:.bold} {bar:40.cyan/blue} {pos:>4}/{len:<4} [{elapsed_precise:.dim}] {msg:.yellow}",
    )
    .expect("invalid suite bar template")
    .progress_chars("█▉▊▋▌▍▎▏ ")
}
