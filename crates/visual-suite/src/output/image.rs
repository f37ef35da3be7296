use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use visual_suite_types::SuiteImage;

use crate::output::error::ReportError;

/// Persists report images. Called on the blocking pool.
pub trait ImageWriter: Send + Sync + 'static {
    fn write(&self, image: &SuiteImage, path: &Path) -> Result<(), ReportError>;
}

/// Writes images as RGBA PNG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngImageWriter;

impl ImageWriter for PngImageWriter {
    fn write(&self, image: &SuiteImage, path: &Path) -> Result<(), ReportError> {
        let mut encoded = Vec::new();
        PngEncoder::new(&mut encoded)
            .write_image(
                image.pixels().as_raw(),
                image.width(),
                image.height(),
                ColorType::Rgba8,
            )
            .map_err(|source| ReportError::Encode {
                path: path.to_path_buf(),
                source,
            })?;
        std::fs::write(path, encoded).map_err(|source| ReportError::io(path, source))
    }
}
