use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ReportError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
    Template {
        path: PathBuf,
        source: std::io::Error,
    },
    Task(tokio::task::JoinError),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Io { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            ReportError::Encode { path, source } => {
                write!(f, "failed to encode {}: {source}", path.display())
            }
            ReportError::Template { path, source } => {
                write!(f, "failed to read template {}: {source}", path.display())
            }
            ReportError::Task(err) => write!(f, "report task failed: {err}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io { source, .. } => Some(source),
            ReportError::Encode { source, .. } => Some(source),
            ReportError::Template { source, .. } => Some(source),
            ReportError::Task(err) => Some(err),
        }
    }
}

impl From<tokio::task::JoinError> for ReportError {
    fn from(value: tokio::task::JoinError) -> Self {
        ReportError::Task(value)
    }
}
