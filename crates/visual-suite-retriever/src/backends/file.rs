use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::core::{RetrieveContext, Retriever};
use visual_suite_types::{RetrievalError, RetrievalResult, SuiteImage};

/// Context property overriding the configured base directory for one call.
pub const BASE_DIR_PROPERTY: &str = "base-dir";

/// Reads images from the local filesystem.
///
/// Sources may be absolute paths, paths relative to the base directory, or
/// `file://` URLs.
#[derive(Debug, Clone, Default)]
pub struct FileRetriever {
    base_dir: Option<PathBuf>,
}

impl FileRetriever {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    fn resolve(&self, source: &str, context: &RetrieveContext) -> RetrievalResult<PathBuf> {
        if source.trim().is_empty() {
            return Err(RetrievalError::invalid_source(source, "empty source"));
        }
        if source.starts_with("file:") {
            let url = Url::parse(source)
                .map_err(|err| RetrievalError::invalid_source(source, err.to_string()))?;
            return url
                .to_file_path()
                .map_err(|_| RetrievalError::invalid_source(source, "not a local file URL"));
        }

        let path = PathBuf::from(source);
        if path.is_absolute() {
            return Ok(path);
        }
        let base = context
            .property(BASE_DIR_PROPERTY)
            .map(PathBuf::from)
            .or_else(|| self.base_dir.clone());
        Ok(match base {
            Some(base) => base.join(path),
            None => path,
        })
    }
}

impl Retriever for FileRetriever {
    fn name(&self) -> &'static str {
        "file"
    }

    fn retrieve(&self, source: &str, context: &RetrieveContext) -> RetrievalResult<SuiteImage> {
        let path = self.resolve(source, context)?;
        debug!(source, path = %path.display(), test = ?context.test, "reading image");
        let bytes = std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => RetrievalError::not_found(source),
            _ => RetrievalError::io(source, err),
        })?;
        SuiteImage::decode(&bytes).map_err(|err| RetrievalError::decode(source, err))
    }
}
