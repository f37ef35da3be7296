//! Comparator crate entry point with flat, easy-to-import modules.

pub mod comparators;
pub mod factory;

pub use comparators::{ComparisonError, ExactComparator, ImageComparator, PerceptualComparator};
pub use factory::{ComparatorFactory, ComparatorKind, ComparatorKindParseError};

#[cfg(test)]
mod tests;
