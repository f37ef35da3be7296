use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::builtin::{LoggingListener, SummaryListener};
use super::{ListenerDescriptor, ListenerError, SuiteListener};

pub type ListenerFactory =
    Arc<dyn Fn() -> Result<Box<dyn SuiteListener>, ListenerError> + Send + Sync>;

/// Name to constructor mapping used to resolve listener types.
#[derive(Clone, Default)]
pub struct ListenerCatalog {
    factories: BTreeMap<String, ListenerFactory>,
}

impl fmt::Debug for ListenerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerCatalog")
            .field("types", &self.names())
            .finish()
    }
}

impl ListenerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the `logging` and `summary` listeners.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        catalog.register(LoggingListener::TYPE, || Ok(Box::new(LoggingListener::new())));
        catalog.register(SummaryListener::TYPE, || Ok(Box::new(SummaryListener::new())));
        catalog
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Box<dyn SuiteListener>, ListenerError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    fn instantiate(&self, name: &str) -> Result<Box<dyn SuiteListener>, ListenerError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ListenerError::UnknownType {
                listener_type: name.to_string(),
                known: self.names().join(", "),
            })?;
        factory()
    }
}

/// Lazily built set of listeners, one instance per distinct type.
///
/// Descriptors repeating an already-seen type are coalesced: only the first
/// descriptor of a type configures the instance.
pub struct ListenerRegistry {
    catalog: ListenerCatalog,
    descriptors: Vec<ListenerDescriptor>,
    instances: Mutex<Vec<(String, Arc<dyn SuiteListener>)>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let built: Vec<String> = self
            .instances
            .lock()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("catalog", &self.catalog)
            .field("descriptors", &self.descriptors)
            .field("built", &built)
            .finish()
    }
}

impl ListenerRegistry {
    pub fn new(catalog: ListenerCatalog, descriptors: Vec<ListenerDescriptor>) -> Self {
        Self {
            catalog,
            descriptors,
            instances: Mutex::new(Vec::new()),
        }
    }

    pub fn catalog(&self) -> &ListenerCatalog {
        &self.catalog
    }

    pub fn descriptors(&self) -> &[ListenerDescriptor] {
        &self.descriptors
    }

    /// Distinct configured types in first-seen order.
    pub fn configured_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for descriptor in &self.descriptors {
            if !types.contains(&descriptor.listener_type.as_str()) {
                types.push(&descriptor.listener_type);
            }
        }
        types
    }

    /// Returns the listener instances, building any type not built yet.
    ///
    /// Resolution, construction or configuration failure of any type is
    /// returned to the caller; instances built before the failure stay
    /// cached.
    pub fn active_listeners(&self) -> Result<Vec<Arc<dyn SuiteListener>>, ListenerError> {
        let mut instances = self.instances.lock();
        for descriptor in &self.descriptors {
            let listener_type = descriptor.listener_type.as_str();
            if instances.iter().any(|(name, _)| name == listener_type) {
                continue;
            }
            let mut listener = self.catalog.instantiate(listener_type)?;
            listener
                .set_properties(&descriptor.properties)
                .map_err(|source| ListenerError::Configuration {
                    listener_type: listener_type.to_string(),
                    source,
                })?;
            debug!(listener = listener_type, "listener built");
            instances.push((listener_type.to_string(), Arc::from(listener)));
        }
        Ok(instances
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::listener::{ListenerProperties, PropertyError};

    struct Probe {
        label: String,
    }

    impl SuiteListener for Probe {
        fn set_properties(&mut self, properties: &ListenerProperties) -> Result<(), PropertyError> {
            if let Some(label) = properties.get("label") {
                if label.is_empty() {
                    return Err(PropertyError::new("label", label, "must not be empty"));
                }
                self.label = label.to_string();
            }
            Ok(())
        }
    }

    fn counting_catalog(built: Arc<AtomicUsize>) -> ListenerCatalog {
        let mut catalog = ListenerCatalog::new();
        for name in ["A", "B"] {
            let built = built.clone();
            catalog.register(name, move || {
                built.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(Probe {
                    label: String::new(),
                }))
            });
        }
        catalog
    }

    fn data_ptr(listener: &Arc<dyn SuiteListener>) -> *const () {
        Arc::as_ptr(listener) as *const ()
    }

    #[test]
    fn duplicate_types_share_one_instance() {
        let built = Arc::new(AtomicUsize::new(0));
        let registry = ListenerRegistry::new(
            counting_catalog(built.clone()),
            vec![
                ListenerDescriptor::new("A"),
                ListenerDescriptor::new("A"),
                ListenerDescriptor::new("B"),
            ],
        );
        assert_eq!(registry.configured_types(), vec!["A", "B"]);

        let first = registry.active_listeners().unwrap();
        let second = registry.active_listeners().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(built.load(Ordering::SeqCst), 2);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(data_ptr(a), data_ptr(b));
        }
    }

    #[test]
    fn unknown_type_is_an_error() {
        let registry = ListenerRegistry::new(
            ListenerCatalog::with_builtins(),
            vec![ListenerDescriptor::new("logging"), ListenerDescriptor::new("mailer")],
        );
        match registry.active_listeners() {
            Err(ListenerError::UnknownType {
                listener_type,
                known,
            }) => {
                assert_eq!(listener_type, "mailer");
                assert!(known.contains("logging"));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn configuration_failure_names_the_type() {
        let built = Arc::new(AtomicUsize::new(0));
        let registry = ListenerRegistry::new(
            counting_catalog(built),
            vec![ListenerDescriptor::new("B")
                .with_properties(ListenerProperties::new().with("label", ""))],
        );
        let err = registry.active_listeners().err().expect("configuration error");
        assert_eq!(err.listener_type(), "B");
        assert!(matches!(err, ListenerError::Configuration { .. }));
    }

    #[test]
    fn construction_failure_surfaces() {
        let mut catalog = ListenerCatalog::new();
        catalog.register("broken", || Err(ListenerError::construction("broken", "no device")));
        let registry = ListenerRegistry::new(catalog, vec![ListenerDescriptor::new("broken")]);
        assert!(matches!(
            registry.active_listeners(),
            Err(ListenerError::Construction { .. })
        ));
    }

    #[test]
    fn no_descriptors_yield_no_listeners() {
        let registry = ListenerRegistry::new(ListenerCatalog::with_builtins(), Vec::new());
        assert!(registry.active_listeners().unwrap().is_empty());
    }
}
