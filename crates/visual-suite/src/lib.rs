//! Visual regression suite runner.
//!
//! A suite pairs reference patterns with sample screenshots. Each test
//! retrieves both (plus optional masks), compares them under a perception
//! threshold model and records the outcome to `results.xml` with one HTML
//! page per sample. Listeners observe the run.

use std::sync::Arc;

use visual_suite_comparator::ComparatorFactory;

pub mod cli;
pub mod config;
pub mod listener;
pub mod output;
pub mod progress;
pub mod sample;
pub mod settings;
pub mod suite;

pub use config::{Configuration, TestDescriptor};
pub use listener::{
    ListenerCatalog, ListenerDescriptor, ListenerError, ListenerProperties, ListenerRegistry,
    PropertyError, SuiteListener,
};
pub use output::{ReportError, ReportOptions, ResultReporter};
pub use sample::{SampleDescriptor, SampleTask};
pub use settings::{ConfigError, EffectiveSettings, SettingsOverrides};
pub use suite::{SuiteError, SuiteRunner, SuiteSummary, TestFailure};

use progress::ProgressListener;

/// Built-in listeners plus the progress bar.
pub fn default_catalog() -> ListenerCatalog {
    let mut catalog = ListenerCatalog::with_builtins();
    catalog.register(ProgressListener::TYPE, || {
        Ok(Box::new(ProgressListener::new()))
    });
    catalog
}

/// Runs the suite described by `settings` with listeners from `catalog`.
pub async fn run_settings(
    settings: &EffectiveSettings,
    catalog: ListenerCatalog,
) -> Result<SuiteSummary, SuiteError> {
    let configuration = Arc::new(settings.build_configuration(catalog)?);
    let comparator = ComparatorFactory::new(settings.comparator).build();
    SuiteRunner::new(configuration, comparator)
        .with_output_dir(settings.output_dir.clone())
        .with_report_options(settings.report_options())
        .with_prefetch(settings.prefetch)
        .run()
        .await
}
