use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::comparators::{ExactComparator, ImageComparator, PerceptualComparator};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ComparatorKind {
    #[default]
    Perceptual,
    Exact,
}

impl ComparatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparatorKind::Perceptual => "perceptual",
            ComparatorKind::Exact => "exact",
        }
    }
}

impl fmt::Display for ComparatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct ComparatorKindParseError(pub String);

impl fmt::Display for ComparatorKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown comparator '{}'", self.0)
    }
}

impl std::error::Error for ComparatorKindParseError {}

impl FromStr for ComparatorKind {
    type Err = ComparatorKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "perceptual" => Ok(ComparatorKind::Perceptual),
            "exact" => Ok(ComparatorKind::Exact),
            _ => Err(ComparatorKindParseError(lower)),
        }
    }
}

pub struct ComparatorFactory {
    kind: ComparatorKind,
}

impl ComparatorFactory {
    pub fn new(kind: ComparatorKind) -> Self {
        Self { kind }
    }

    pub fn build(&self) -> Arc<dyn ImageComparator> {
        match self.kind {
            ComparatorKind::Perceptual => Arc::new(PerceptualComparator::new()),
            ComparatorKind::Exact => Arc::new(ExactComparator::new()),
        }
    }
}
