use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::task;
use tracing::{debug, info, warn};
use visual_suite_comparator::{ComparisonError, ImageComparator};
use visual_suite_retriever::{DynRetriever, RetrieveContext};
use visual_suite_types::{ComparisonResult, RetrievalError, SuiteImage};

use crate::config::{Configuration, TestDescriptor};
use crate::listener::{ListenerError, SuiteListener};
use crate::output::{ReportError, ReportOptions, ResultReporter, SourceImages};
use crate::sample::SampleTask;
use crate::settings::ConfigError;

pub const DEFAULT_PREFETCH: usize = 4;

/// Errors that end a suite run.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Why a single test produced no record. The run continues with the next
/// test.
#[derive(Debug, Error)]
pub enum TestFailure {
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("comparison failed: {0}")]
    Comparison(#[from] ComparisonError),

    #[error("comparison task did not complete: {0}")]
    Task(#[from] task::JoinError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SuiteSummary {
    pub same: usize,
    pub different: usize,
    pub failed: usize,
}

impl SuiteSummary {
    pub fn total(&self) -> usize {
        self.same + self.different + self.failed
    }

    pub fn all_same(&self) -> bool {
        self.different == 0 && self.failed == 0
    }
}

/// Drives every test of a configuration through retrieval, comparison and
/// reporting.
pub struct SuiteRunner {
    configuration: Arc<Configuration>,
    comparator: Arc<dyn ImageComparator>,
    output_dir: Option<PathBuf>,
    report_options: ReportOptions,
    prefetch: NonZeroUsize,
}

enum Outcome {
    Compared {
        sources: SourceImages,
        result: ComparisonResult,
    },
    Failed(TestFailure),
}

impl SuiteRunner {
    pub fn new(configuration: Arc<Configuration>, comparator: Arc<dyn ImageComparator>) -> Self {
        Self {
            configuration,
            comparator,
            output_dir: None,
            report_options: ReportOptions::default(),
            prefetch: NonZeroUsize::new(DEFAULT_PREFETCH).unwrap_or(NonZeroUsize::MIN),
        }
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.report_options = options;
        self
    }

    /// Number of sample retrievals kept running ahead of the test being
    /// compared.
    pub fn with_prefetch(mut self, prefetch: NonZeroUsize) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub async fn run(&self) -> Result<SuiteSummary, SuiteError> {
        let configuration = self.configuration.as_ref();
        configuration.check_result_dirs()?;
        let listeners = configuration.listeners().active_listeners()?;
        notify(&listeners, |listener| listener.configuration_parsed(configuration));

        let mut reporter =
            ResultReporter::open(self.output_dir.as_deref(), self.report_options.clone()).await?;
        reporter.record_header().await?;

        let tests = configuration.tests();
        let tasks: Vec<SampleTask> = tests
            .iter()
            .map(|test| configuration.sample_task(test))
            .collect();
        let window = self.prefetch.get();
        let mut summary = SuiteSummary::default();

        for (index, test) in tests.iter().enumerate() {
            for ahead in tasks.iter().skip(index).take(window) {
                ahead.start();
            }

            notify(&listeners, |listener| listener.test_parsed(test));
            for _ in 0..test.image_count() {
                notify(&listeners, |listener| listener.image_parsed());
            }

            match self.evaluate(test, &tasks[index]).await {
                Outcome::Compared { sources, result } => {
                    reporter
                        .record_comparison(test.sample.file_name(), &sources, &result)
                        .await?;
                    if result.equal_images {
                        summary.same += 1;
                    } else {
                        summary.different += 1;
                    }
                    info!(
                        test = %test.name,
                        same = result.equal_images,
                        perceptible = result.perceptible_different_pixels,
                        global = result.global_different_pixels,
                        "test compared"
                    );
                    notify(&listeners, |listener| listener.sample_compared(test, &result));
                }
                Outcome::Failed(failure) => {
                    warn!(test = %test.name, error = %failure, "test skipped");
                    summary.failed += 1;
                    notify(&listeners, |listener| listener.sample_failed(test, &failure));
                }
            }
        }

        reporter.record_footer().await?;
        reporter.close().await?;
        debug!(?summary, "suite finished");
        notify(&listeners, |listener| listener.suite_completed(&summary));
        Ok(summary)
    }

    async fn evaluate(&self, test: &TestDescriptor, sample_task: &SampleTask) -> Outcome {
        match self.try_evaluate(test, sample_task).await {
            Ok((sources, result)) => Outcome::Compared { sources, result },
            Err(failure) => Outcome::Failed(failure),
        }
    }

    async fn try_evaluate(
        &self,
        test: &TestDescriptor,
        sample_task: &SampleTask,
    ) -> Result<(SourceImages, ComparisonResult), TestFailure> {
        let configuration = self.configuration.as_ref();
        let context = test.retrieve_context();
        let sample = sample_task.result().await?;
        let pattern = retrieve(
            configuration.pattern_retriever(),
            test.pattern.clone(),
            context.clone(),
        )
        .await?;
        let mut masks = Vec::with_capacity(test.masks.len());
        for mask in &test.masks {
            masks.push(retrieve(configuration.mask_retriever(), mask.clone(), context.clone()).await?);
        }

        let perception = test.effective_perception(configuration.perception());
        let comparator = Arc::clone(&self.comparator);
        let (pattern_image, sample_image) = (pattern.clone(), sample.clone());
        let result = task::spawn_blocking(move || {
            comparator.compare(&pattern_image, &sample_image, &masks, &perception)
        })
        .await??;

        Ok((SourceImages { pattern, sample }, result))
    }
}

async fn retrieve(
    retriever: &DynRetriever,
    source: String,
    context: RetrieveContext,
) -> Result<SuiteImage, RetrievalError> {
    let retriever = Arc::clone(retriever);
    let source_id = source.clone();
    match task::spawn_blocking(move || retriever.retrieve(&source, &context)).await {
        Ok(outcome) => outcome,
        Err(err) => Err(RetrievalError::interrupted(source_id, err.to_string())),
    }
}

fn notify<F>(listeners: &[Arc<dyn SuiteListener>], event: F)
where
    F: Fn(&dyn SuiteListener),
{
    for listener in listeners {
        event(listener.as_ref());
    }
}
