use crate::comparators::{ComparisonError, ImageComparator, PerceptualComparator};
use visual_suite_types::{ComparisonResult, Perception, SuiteImage};

/// Treats every changed unmasked pixel as a global difference, whatever the
/// configured perception says.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactComparator {
    inner: PerceptualComparator,
}

impl ExactComparator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageComparator for ExactComparator {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn compare(
        &self,
        pattern: &SuiteImage,
        sample: &SuiteImage,
        masks: &[SuiteImage],
        _perception: &Perception,
    ) -> Result<ComparisonResult, ComparisonError> {
        self.inner
            .compare(pattern, sample, masks, &Perception::default())
    }
}
