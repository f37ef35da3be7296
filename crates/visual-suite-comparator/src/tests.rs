use image::{Rgba, RgbaImage};
use visual_suite_types::{Perception, Point, SuiteImage};

use crate::{
    ComparatorFactory, ComparatorKind, ExactComparator, ImageComparator, PerceptualComparator,
};

fn solid(width: u32, height: u32, value: u8) -> SuiteImage {
    SuiteImage::from_rgba(RgbaImage::from_pixel(
        width,
        height,
        Rgba([value, value, value, 255]),
    ))
}

fn with_pixels(base: u8, width: u32, height: u32, changed: &[(u32, u32, u8)]) -> SuiteImage {
    let mut pixels = RgbaImage::from_pixel(width, height, Rgba([base, base, base, 255]));
    for &(x, y, value) in changed {
        pixels.put_pixel(x, y, Rgba([value, value, value, 255]));
    }
    SuiteImage::from_rgba(pixels)
}

fn perception(one_pixel: u32, global: u32, amount: Option<&str>) -> Perception {
    let mut perception = Perception::new();
    perception.set_one_pixel_threshold(Some(one_pixel));
    perception.set_global_difference_threshold(Some(global));
    if let Some(amount) = amount {
        perception.set_global_difference_amount(amount);
    }
    perception
}

#[test]
fn identical_images_are_equal_without_diff() {
    let image = solid(6, 4, 120);
    let result = PerceptualComparator::new()
        .compare(&image, &image, &[], &Perception::default())
        .unwrap();
    assert!(result.equal_images);
    assert_eq!(result.total_pixels, 24);
    assert_eq!(result.equal_pixels, 24);
    assert_eq!(result.perceptible_different_pixels, 0);
    assert!(result.diff_image.is_none());
}

#[test]
fn deltas_are_split_by_thresholds() {
    let pattern = solid(4, 4, 100);
    let sample = with_pixels(100, 4, 4, &[(0, 0, 103), (1, 1, 110), (3, 2, 160)]);
    let result = PerceptualComparator::new()
        .compare(&pattern, &sample, &[], &perception(5, 20, Some("0px")))
        .unwrap();
    assert_eq!(result.small_different_pixels, 1);
    assert_eq!(result.perceptible_different_pixels, 2);
    assert_eq!(result.global_different_pixels, 1);
    assert_eq!(result.equal_pixels, 13);
    assert_eq!(result.rectangle.min, Point::new(1, 1));
    assert_eq!(result.rectangle.max, Point::new(3, 2));
    assert!(!result.equal_images);
    let diff = result.diff_image.expect("diff for unequal images");
    assert_eq!((diff.width(), diff.height()), (4, 4));
    assert_eq!(diff.pixel(3, 2), Some(Rgba([255, 0, 0, 255])));
}

#[test]
fn global_amount_tolerates_small_regions() {
    let pattern = solid(10, 10, 0);
    let sample = with_pixels(0, 10, 10, &[(2, 2, 255), (3, 3, 255)]);

    let by_pixels = PerceptualComparator::new()
        .compare(&pattern, &sample, &[], &perception(0, 0, Some("2px")))
        .unwrap();
    assert!(by_pixels.equal_images);
    assert_eq!(by_pixels.global_different_pixels, 2);

    let by_percentage = PerceptualComparator::new()
        .compare(&pattern, &sample, &[], &perception(0, 0, Some("1%")))
        .unwrap();
    assert!(!by_percentage.equal_images);
}

#[test]
fn masked_pixels_are_ignored() {
    let pattern = solid(4, 4, 10);
    let sample = with_pixels(10, 4, 4, &[(1, 1, 200)]);
    let mut mask = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
    mask.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
    let masks = [SuiteImage::from_rgba(mask)];

    let result = PerceptualComparator::new()
        .compare(&pattern, &sample, &masks, &Perception::default())
        .unwrap();
    assert!(result.equal_images);
    assert_eq!(result.masked_pixels, 1);
    assert_eq!(result.considered_pixels(), 15);
}

#[test]
fn size_mismatch_counts_outside_pixels_as_global() {
    let pattern = solid(4, 4, 50);
    let sample = solid(5, 4, 50);
    let result = PerceptualComparator::new()
        .compare(&pattern, &sample, &[], &perception(10, 10, None))
        .unwrap();
    assert_eq!((result.area.width, result.area.height), (5, 4));
    assert_eq!(result.global_different_pixels, 4);
    assert_eq!(result.rectangle.min, Point::new(4, 0));
    assert_eq!(result.rectangle.max, Point::new(4, 3));
    assert!(!result.equal_images);
}

#[test]
fn large_images_take_the_parallel_path() {
    let pattern = solid(512, 256, 30);
    let sample = with_pixels(30, 512, 256, &[(511, 255, 90)]);
    let result = PerceptualComparator::new()
        .compare(&pattern, &sample, &[], &Perception::default())
        .unwrap();
    assert_eq!(result.global_different_pixels, 1);
    assert_eq!(result.equal_pixels, 512 * 256 - 1);
    assert_eq!(result.rectangle.min, Point::new(511, 255));
}

#[test]
fn exact_comparator_ignores_thresholds() {
    let pattern = solid(3, 3, 100);
    let sample = with_pixels(100, 3, 3, &[(0, 0, 101)]);
    let lenient = perception(50, 50, Some("100%"));
    assert!(
        PerceptualComparator::new()
            .compare(&pattern, &sample, &[], &lenient)
            .unwrap()
            .equal_images
    );
    assert!(
        !ExactComparator::new()
            .compare(&pattern, &sample, &[], &lenient)
            .unwrap()
            .equal_images
    );
}

#[test]
fn factory_builds_named_comparators() {
    for kind in [ComparatorKind::Perceptual, ComparatorKind::Exact] {
        let parsed: ComparatorKind = kind.as_str().parse().unwrap();
        assert_eq!(parsed, kind);
        assert_eq!(ComparatorFactory::new(kind).build().name(), kind.as_str());
    }
    assert!("fuzzy".parse::<ComparatorKind>().is_err());
}
