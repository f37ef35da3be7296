use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use tracing::debug;

use crate::comparators::{ComparisonError, ImageComparator};
use visual_suite_types::{
    Area, ComparisonResult, Perception, PixelClass, Point, Rectangle, SuiteImage,
};

const TAG: &str = "perceptual";
const PARALLEL_MIN_PIXELS: u64 = 64 * 1024;

const MASKED_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);
const SMALL_COLOR: Rgba<u8> = Rgba([255, 220, 0, 255]);
const PERCEPTIBLE_COLOR: Rgba<u8> = Rgba([255, 140, 0, 255]);
const GLOBAL_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Pixel-by-pixel comparator driven by the perception thresholds.
///
/// The compared area is the union of both image sizes; pixels present in
/// only one image always count as globally different.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerceptualComparator;

impl PerceptualComparator {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Masked,
    Same,
    Small,
    Perceptible,
    Global,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    masked: u64,
    same: u64,
    small: u64,
    perceptible: u64,
    global: u64,
    rectangle: Option<Rectangle>,
}

impl Tally {
    fn record(&mut self, mark: Mark, x: u32, y: u32) {
        match mark {
            Mark::Masked => self.masked += 1,
            Mark::Same => self.same += 1,
            Mark::Small => self.small += 1,
            Mark::Perceptible | Mark::Global => {
                self.perceptible += 1;
                if mark == Mark::Global {
                    self.global += 1;
                }
                self.rectangle = Some(Rectangle::extend(self.rectangle, Point::new(x, y)));
            }
        }
    }

    fn merge(self, other: Tally) -> Tally {
        Tally {
            masked: self.masked + other.masked,
            same: self.same + other.same,
            small: self.small + other.small,
            perceptible: self.perceptible + other.perceptible,
            global: self.global + other.global,
            rectangle: Rectangle::union(self.rectangle, other.rectangle),
        }
    }
}

fn channel_delta(a: Rgba<u8>, b: Rgba<u8>) -> u8 {
    a.0.iter()
        .zip(b.0.iter())
        .map(|(lhs, rhs)| lhs.abs_diff(*rhs))
        .max()
        .unwrap_or(0)
}

fn is_masked(masks: &[SuiteImage], x: u32, y: u32) -> bool {
    masks
        .iter()
        .any(|mask| mask.pixel(x, y).is_some_and(|pixel| pixel.0[3] != 0))
}

fn mark_pixel(
    pattern: &SuiteImage,
    sample: &SuiteImage,
    masks: &[SuiteImage],
    perception: &Perception,
    x: u32,
    y: u32,
) -> Mark {
    if is_masked(masks, x, y) {
        return Mark::Masked;
    }
    let (Some(expected), Some(actual)) = (pattern.pixel(x, y), sample.pixel(x, y)) else {
        return Mark::Global;
    };
    match perception.classify(channel_delta(expected, actual)) {
        PixelClass::Same => Mark::Same,
        PixelClass::Unperceptible => Mark::Small,
        PixelClass::Perceptible { global: false } => Mark::Perceptible,
        PixelClass::Perceptible { global: true } => Mark::Global,
    }
}

fn scan_row(
    pattern: &SuiteImage,
    sample: &SuiteImage,
    masks: &[SuiteImage],
    perception: &Perception,
    width: u32,
    y: u32,
) -> (Tally, Vec<Mark>) {
    let mut tally = Tally::default();
    let mut marks = Vec::with_capacity(width as usize);
    for x in 0..width {
        let mark = mark_pixel(pattern, sample, masks, perception, x, y);
        tally.record(mark, x, y);
        marks.push(mark);
    }
    (tally, marks)
}

fn dimmed(pixel: Option<Rgba<u8>>) -> Rgba<u8> {
    match pixel {
        Some(Rgba([r, g, b, _])) => {
            let luma = (u16::from(r) * 3 + u16::from(g) * 6 + u16::from(b)) / 10;
            let value = (255 - (255 - luma) / 3) as u8;
            Rgba([value, value, value, 255])
        }
        None => Rgba([255, 255, 255, 255]),
    }
}

fn render_diff(
    pattern: &SuiteImage,
    area: Area,
    rows: &[Vec<Mark>],
) -> Result<SuiteImage, ComparisonError> {
    let mut buffer = Vec::with_capacity(area.pixel_count() as usize * 4);
    for (y, row) in rows.iter().enumerate() {
        for (x, mark) in row.iter().enumerate() {
            let color = match mark {
                Mark::Masked => MASKED_COLOR,
                Mark::Same => dimmed(pattern.pixel(x as u32, y as u32)),
                Mark::Small => SMALL_COLOR,
                Mark::Perceptible => PERCEPTIBLE_COLOR,
                Mark::Global => GLOBAL_COLOR,
            };
            buffer.extend_from_slice(&color.0);
        }
    }
    let image = RgbaImage::from_raw(area.width, area.height, buffer).ok_or(
        ComparisonError::DiffImage {
            width: area.width,
            height: area.height,
        },
    )?;
    Ok(SuiteImage::from_rgba(image))
}

impl ImageComparator for PerceptualComparator {
    fn name(&self) -> &'static str {
        TAG
    }

    fn compare(
        &self,
        pattern: &SuiteImage,
        sample: &SuiteImage,
        masks: &[SuiteImage],
        perception: &Perception,
    ) -> Result<ComparisonResult, ComparisonError> {
        let area = Area::new(
            pattern.width().max(sample.width()),
            pattern.height().max(sample.height()),
        );
        let total = area.pixel_count();
        if total.checked_mul(4).and_then(|bytes| usize::try_from(bytes).ok()).is_none() {
            return Err(ComparisonError::AreaTooLarge {
                width: area.width,
                height: area.height,
            });
        }

        let parallel = total >= PARALLEL_MIN_PIXELS;
        let scan = |y| scan_row(pattern, sample, masks, perception, area.width, y);
        let rows: Vec<(Tally, Vec<Mark>)> = if parallel {
            (0..area.height).into_par_iter().map(scan).collect()
        } else {
            (0..area.height).map(scan).collect()
        };

        let tally = rows
            .iter()
            .fold(Tally::default(), |acc, (row, _)| acc.merge(*row));
        let considered = total - tally.masked;
        let equal_images = !perception.exceeds_global_amount(tally.global, considered);

        debug!(
            comparator = TAG,
            width = area.width,
            height = area.height,
            parallel,
            perceptible = tally.perceptible,
            global = tally.global,
            equal_images,
            "compared images"
        );

        let diff_image = if equal_images {
            None
        } else {
            let marks: Vec<Vec<Mark>> = rows.into_iter().map(|(_, marks)| marks).collect();
            Some(render_diff(pattern, area, &marks)?)
        };

        Ok(ComparisonResult {
            equal_images,
            area,
            rectangle: tally.rectangle.unwrap_or_default(),
            total_pixels: total,
            masked_pixels: tally.masked,
            perceptible_different_pixels: tally.perceptible,
            global_different_pixels: tally.global,
            small_different_pixels: tally.small,
            equal_pixels: tally.same,
            diff_image,
        })
    }
}
