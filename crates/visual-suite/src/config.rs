use std::collections::HashSet;
use std::fmt;

use visual_suite_retriever::{DynRetriever, RetrieveContext};
use visual_suite_types::Perception;

use crate::listener::{ListenerCatalog, ListenerDescriptor, ListenerRegistry};
use crate::output::result_dir_name;
use crate::sample::{SampleDescriptor, SampleTask};
use crate::settings::ConfigError;

/// One `[[test]]` entry: a sample checked against a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDescriptor {
    pub name: String,
    pub sample: SampleDescriptor,
    pub pattern: String,
    pub masks: Vec<String>,
    /// Per-test override merged over the suite perception.
    pub perception: Option<Perception>,
}

impl TestDescriptor {
    pub fn new(name: impl Into<String>, sample: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sample: SampleDescriptor::new(sample),
            pattern: pattern.into(),
            masks: Vec::new(),
            perception: None,
        }
    }

    pub fn with_mask(mut self, mask: impl Into<String>) -> Self {
        self.masks.push(mask.into());
        self
    }

    pub fn with_perception(mut self, perception: Perception) -> Self {
        self.perception = Some(perception);
        self
    }

    pub fn effective_perception(&self, suite: &Perception) -> Perception {
        match &self.perception {
            Some(overrides) => suite.merged_with(overrides),
            None => suite.clone(),
        }
    }

    /// Number of images a run of this test reads.
    pub fn image_count(&self) -> usize {
        2 + self.masks.len()
    }

    pub fn retrieve_context(&self) -> RetrieveContext {
        RetrieveContext::for_test(self.name.clone())
    }
}

/// Populated suite configuration consumed by the runner.
///
/// Owns the listener registry, so listener instances live exactly as long
/// as the configuration that declared them.
pub struct Configuration {
    perception: Perception,
    pattern_retriever: DynRetriever,
    sample_retriever: DynRetriever,
    mask_retriever: DynRetriever,
    tests: Vec<TestDescriptor>,
    listeners: ListenerRegistry,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("perception", &self.perception)
            .field("pattern_retriever", &self.pattern_retriever.name())
            .field("sample_retriever", &self.sample_retriever.name())
            .field("mask_retriever", &self.mask_retriever.name())
            .field("tests", &self.tests)
            .field("listeners", &self.listeners)
            .finish()
    }
}

impl Configuration {
    /// Configuration reading patterns and masks from `pattern_retriever`.
    pub fn new(pattern_retriever: DynRetriever, sample_retriever: DynRetriever) -> Self {
        Self {
            perception: Perception::default(),
            mask_retriever: pattern_retriever.clone(),
            pattern_retriever,
            sample_retriever,
            tests: Vec::new(),
            listeners: ListenerRegistry::new(ListenerCatalog::with_builtins(), Vec::new()),
        }
    }

    pub fn with_mask_retriever(mut self, retriever: DynRetriever) -> Self {
        self.mask_retriever = retriever;
        self
    }

    pub fn with_perception(mut self, perception: Perception) -> Self {
        self.perception = perception;
        self
    }

    pub fn with_test(mut self, test: TestDescriptor) -> Self {
        self.tests.push(test);
        self
    }

    pub fn with_tests(mut self, tests: impl IntoIterator<Item = TestDescriptor>) -> Self {
        self.tests.extend(tests);
        self
    }

    /// Replaces the listener set. Listeners are built on first use.
    pub fn with_listeners(
        mut self,
        catalog: ListenerCatalog,
        descriptors: Vec<ListenerDescriptor>,
    ) -> Self {
        self.listeners = ListenerRegistry::new(catalog, descriptors);
        self
    }

    pub fn perception(&self) -> &Perception {
        &self.perception
    }

    pub fn pattern_retriever(&self) -> &DynRetriever {
        &self.pattern_retriever
    }

    pub fn sample_retriever(&self) -> &DynRetriever {
        &self.sample_retriever
    }

    pub fn mask_retriever(&self) -> &DynRetriever {
        &self.mask_retriever
    }

    pub fn tests(&self) -> &[TestDescriptor] {
        &self.tests
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn listener_descriptors(&self) -> &[ListenerDescriptor] {
        self.listeners.descriptors()
    }

    /// Fails when two tests would be reported into the same result
    /// directory.
    pub fn check_result_dirs(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for test in &self.tests {
            if !seen.insert(result_dir_name(test.sample.file_name())) {
                return Err(ConfigError::InvalidValue {
                    path: None,
                    field: "test.sample",
                    value: test.sample.source().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Creates the not-yet-started sample task for `test`.
    pub fn sample_task(&self, test: &TestDescriptor) -> SampleTask {
        SampleTask::new(
            test.sample.clone(),
            self.sample_retriever.clone(),
            test.retrieve_context(),
        )
    }
}
