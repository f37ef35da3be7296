//! Pluggable observers of the suite lifecycle.
//!
//! Listener types are declared by name in the suite document. A
//! [`ListenerCatalog`] maps each name to a constructor, and the
//! [`ListenerRegistry`] owned by a configuration builds one instance per
//! distinct type the first time listeners are needed.

mod builtin;
mod registry;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use visual_suite_types::ComparisonResult;

use crate::config::{Configuration, TestDescriptor};
use crate::suite::{SuiteSummary, TestFailure};

pub use builtin::{LoggingListener, SummaryListener};
pub use registry::{ListenerCatalog, ListenerFactory, ListenerRegistry};

/// Observer notified of parse and comparison events.
///
/// `set_properties` is called exactly once, before the instance is shared.
/// Event hooks take `&self`; a listener that keeps state uses interior
/// mutability.
pub trait SuiteListener: Send + Sync {
    fn set_properties(&mut self, _properties: &ListenerProperties) -> Result<(), PropertyError> {
        Ok(())
    }

    fn configuration_parsed(&self, _configuration: &Configuration) {}

    fn test_parsed(&self, _test: &TestDescriptor) {}

    /// Fired once for every pattern, sample and mask image of a test.
    fn image_parsed(&self) {}

    fn sample_compared(&self, _test: &TestDescriptor, _result: &ComparisonResult) {}

    fn sample_failed(&self, _test: &TestDescriptor, _failure: &TestFailure) {}

    fn suite_completed(&self, _summary: &SuiteSummary) {}
}

/// String properties handed to a listener at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ListenerProperties {
    values: BTreeMap<String, String>,
}

impl ListenerProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Parses `key` with `FromStr`; an absent key is `Ok(None)`.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, PropertyError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|err: T::Err| PropertyError::new(key, raw, err.to_string()))
    }

    pub fn path(&self, key: &str) -> Option<PathBuf> {
        self.get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

impl<K, V> FromIterator<(K, V)> for ListenerProperties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

/// A `[[listener]]` entry: the type name plus its properties.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenerDescriptor {
    #[serde(rename = "type")]
    pub listener_type: String,
    #[serde(default)]
    pub properties: ListenerProperties,
}

impl ListenerDescriptor {
    pub fn new(listener_type: impl Into<String>) -> Self {
        Self {
            listener_type: listener_type.into(),
            properties: ListenerProperties::new(),
        }
    }

    pub fn with_properties(mut self, properties: ListenerProperties) -> Self {
        self.properties = properties;
        self
    }
}

#[derive(Debug, Clone, Error)]
#[error("invalid value '{value}' for property '{key}': {reason}")]
pub struct PropertyError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

impl PropertyError {
    pub fn new(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("unknown listener type '{listener_type}' (known: {known})")]
    UnknownType { listener_type: String, known: String },

    #[error("failed to construct listener '{listener_type}': {reason}")]
    Construction {
        listener_type: String,
        reason: String,
    },

    #[error("failed to configure listener '{listener_type}': {source}")]
    Configuration {
        listener_type: String,
        #[source]
        source: PropertyError,
    },
}

impl ListenerError {
    pub fn construction(listener_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            listener_type: listener_type.into(),
            reason: reason.into(),
        }
    }

    pub fn listener_type(&self) -> &str {
        match self {
            Self::UnknownType { listener_type, .. }
            | Self::Construction { listener_type, .. }
            | Self::Configuration { listener_type, .. } => listener_type,
        }
    }
}
