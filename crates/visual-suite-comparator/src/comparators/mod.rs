pub mod exact;
pub mod perceptual;

pub use exact::ExactComparator;
pub use perceptual::PerceptualComparator;

use thiserror::Error;
use visual_suite_types::{ComparisonResult, Perception, SuiteImage};

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("comparison area {width}x{height} is too large")]
    AreaTooLarge { width: u32, height: u32 },

    #[error("failed to assemble the {width}x{height} difference image")]
    DiffImage { width: u32, height: u32 },
}

/// Trait implemented by all image comparators.
pub trait ImageComparator: Send + Sync {
    /// Stable comparator name used for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Compares `sample` against `pattern`, ignoring pixels covered by any of
    /// `masks`, and judges the outcome with `perception`.
    fn compare(
        &self,
        pattern: &SuiteImage,
        sample: &SuiteImage,
        masks: &[SuiteImage],
        perception: &Perception,
    ) -> Result<ComparisonResult, ComparisonError>;
}
