pub mod backends;
pub mod config;
pub mod core;

pub use config::{RetrieverConfig, RetrieverConfigError, RetrieverKind};
pub use core::{DynRetriever, RetrieveContext, Retriever};
pub use visual_suite_types::{RetrievalError, RetrievalResult, SuiteImage};
