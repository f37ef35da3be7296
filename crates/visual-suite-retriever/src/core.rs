use std::collections::BTreeMap;
use std::sync::Arc;

use visual_suite_types::{RetrievalResult, SuiteImage};

pub type DynRetriever = Arc<dyn Retriever>;

/// Per-call information handed to a retriever.
#[derive(Debug, Clone, Default)]
pub struct RetrieveContext {
    pub test: Option<String>,
    pub properties: BTreeMap<String, String>,
}

impl RetrieveContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_test(name: impl Into<String>) -> Self {
        Self {
            test: Some(name.into()),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Fetches and decodes the image behind a pattern, mask or sample identifier.
///
/// `retrieve` blocks; async callers are expected to move it onto the
/// blocking pool.
pub trait Retriever: Send + Sync + 'static {
    /// Stable backend name used for logging and diagnostics.
    fn name(&self) -> &'static str;

    fn retrieve(&self, source: &str, context: &RetrieveContext) -> RetrievalResult<SuiteImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_properties_are_looked_up_by_key() {
        let context = RetrieveContext::for_test("login").with_property("base-dir", "/tmp/p");
        assert_eq!(context.test.as_deref(), Some("login"));
        assert_eq!(context.property("base-dir"), Some("/tmp/p"));
        assert_eq!(context.property("missing"), None);
    }
}
