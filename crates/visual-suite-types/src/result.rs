use serde::Serialize;

use crate::SuiteImage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Area {
    pub width: u32,
    pub height: u32,
}

impl Area {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Bounding box of the perceptibly different pixels, corners inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub min: Point,
    pub max: Point,
}

impl Rectangle {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Grows the rectangle to cover `point`; `None` starts a new one.
    pub fn extend(current: Option<Rectangle>, point: Point) -> Rectangle {
        match current {
            None => Rectangle::new(point, point),
            Some(rect) => Rectangle::new(
                Point::new(rect.min.x.min(point.x), rect.min.y.min(point.y)),
                Point::new(rect.max.x.max(point.x), rect.max.y.max(point.y)),
            ),
        }
    }

    pub fn union(a: Option<Rectangle>, b: Option<Rectangle>) -> Option<Rectangle> {
        match (a, b) {
            (None, other) | (other, None) => other,
            (Some(a), Some(b)) => {
                let grown = Rectangle::extend(Some(a), b.min);
                Some(Rectangle::extend(Some(grown), b.max))
            }
        }
    }
}

/// Outcome of comparing one sample against its pattern.
///
/// Produced by a comparator and only read afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub equal_images: bool,
    pub area: Area,
    pub rectangle: Rectangle,
    pub total_pixels: u64,
    pub masked_pixels: u64,
    pub perceptible_different_pixels: u64,
    pub global_different_pixels: u64,
    pub small_different_pixels: u64,
    pub equal_pixels: u64,
    #[serde(skip)]
    pub diff_image: Option<SuiteImage>,
}

impl ComparisonResult {
    /// Result for two identical images of `area`.
    pub fn identical(area: Area) -> Self {
        let total = area.pixel_count();
        Self {
            equal_images: true,
            area,
            rectangle: Rectangle::default(),
            total_pixels: total,
            masked_pixels: 0,
            perceptible_different_pixels: 0,
            global_different_pixels: 0,
            small_different_pixels: 0,
            equal_pixels: total,
            diff_image: None,
        }
    }

    /// Pixels that took part in the comparison.
    pub fn considered_pixels(&self) -> u64 {
        self.total_pixels.saturating_sub(self.masked_pixels)
    }
}
