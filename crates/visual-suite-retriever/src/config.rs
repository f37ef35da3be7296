use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::backends::{FileRetriever, MemoryRetriever};
use crate::core::DynRetriever;
use visual_suite_types::RetrievalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrieverKind {
    #[default]
    File,
    Memory,
}

impl FromStr for RetrieverKind {
    type Err = RetrieverConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(RetrieverKind::File),
            "memory" => Ok(RetrieverKind::Memory),
            other => Err(RetrieverConfigError::UnknownKind(other.to_string())),
        }
    }
}

impl RetrieverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrieverKind::File => "file",
            RetrieverKind::Memory => "memory",
        }
    }

    pub fn all() -> [RetrieverKind; 2] {
        [RetrieverKind::File, RetrieverKind::Memory]
    }
}

impl fmt::Display for RetrieverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RetrieverConfigError {
    #[error("unknown retriever type '{0}' (expected 'file' or 'memory')")]
    UnknownKind(String),

    #[error("the {0} retriever requires a base directory")]
    MissingBaseDir(RetrieverKind),

    #[error("failed to preload images: {0}")]
    Preload(#[from] RetrievalError),
}

#[derive(Debug, Clone, Default)]
pub struct RetrieverConfig {
    pub kind: RetrieverKind,
    pub base_dir: Option<PathBuf>,
}

impl RetrieverConfig {
    pub fn file(base_dir: Option<PathBuf>) -> Self {
        Self {
            kind: RetrieverKind::File,
            base_dir,
        }
    }

    pub fn memory(base_dir: PathBuf) -> Self {
        Self {
            kind: RetrieverKind::Memory,
            base_dir: Some(base_dir),
        }
    }

    pub fn create_retriever(&self) -> Result<DynRetriever, RetrieverConfigError> {
        match self.kind {
            RetrieverKind::File => Ok(Arc::new(FileRetriever::new(self.base_dir.clone()))),
            RetrieverKind::Memory => {
                let dir = self
                    .base_dir
                    .as_deref()
                    .ok_or(RetrieverConfigError::MissingBaseDir(RetrieverKind::Memory))?;
                let retriever = MemoryRetriever::new();
                retriever.preload_dir(dir)?;
                Ok(Arc::new(retriever))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("FILE".parse::<RetrieverKind>().unwrap(), RetrieverKind::File);
        assert_eq!(" memory ".parse::<RetrieverKind>().unwrap(), RetrieverKind::Memory);
        let err = "http".parse::<RetrieverKind>().unwrap_err();
        assert!(matches!(err, RetrieverConfigError::UnknownKind(ref kind) if kind == "http"));
    }

    #[test]
    fn kind_round_trips_through_display() {
        for kind in RetrieverKind::all() {
            assert_eq!(kind.to_string().parse::<RetrieverKind>().unwrap(), kind);
        }
    }

    #[test]
    fn memory_retriever_needs_a_directory() {
        let config = RetrieverConfig {
            kind: RetrieverKind::Memory,
            base_dir: None,
        };
        let err = config.create_retriever().err().expect("missing dir");
        assert!(matches!(err, RetrieverConfigError::MissingBaseDir(RetrieverKind::Memory)));
    }

    #[test]
    fn file_retriever_is_created_without_touching_disk() {
        let retriever = RetrieverConfig::file(Some(PathBuf::from("/nonexistent")))
            .create_retriever()
            .expect("file retriever");
        assert_eq!(retriever.name(), "file");
    }
}
