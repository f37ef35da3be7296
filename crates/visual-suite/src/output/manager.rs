use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::task;
use tracing::debug;
use visual_suite_types::{ComparisonResult, SuiteImage};

use super::error::ReportError;
use super::html::{TemplateKind, TemplateSource};
use super::image::{ImageWriter, PngImageWriter};
use super::placeholder::PlaceholderRegistry;
use super::xml;

pub const RESULTS_FILE_NAME: &str = "results.xml";
pub(crate) const HTML_FILE_NAME: &str = "result.html";
pub(crate) const PATTERN_IMAGE_NAME: &str = "source1.png";
pub(crate) const SAMPLE_IMAGE_NAME: &str = "source2.png";
pub(crate) const DIFF_IMAGE_NAME: &str = "diff.png";

/// The two images a comparison was computed from.
#[derive(Debug, Clone)]
pub struct SourceImages {
    pub pattern: SuiteImage,
    pub sample: SuiteImage,
}

#[derive(Clone)]
pub struct ReportOptions {
    pub templates: TemplateSource,
    pub image_writer: Arc<dyn ImageWriter>,
    pub placeholders: PlaceholderRegistry,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            templates: TemplateSource::Embedded,
            image_writer: Arc::new(PngImageWriter),
            placeholders: PlaceholderRegistry::standard(),
        }
    }
}

impl ReportOptions {
    pub fn with_templates(mut self, templates: TemplateSource) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_image_writer(mut self, writer: Arc<dyn ImageWriter>) -> Self {
        self.image_writer = writer;
        self
    }
}

/// Writes `results.xml` plus one result directory per compared sample.
///
/// Opened without an output directory the reporter is a no-op sink: every
/// call succeeds and nothing touches the filesystem. Calls must be
/// serialized; the reporter is driven by one run at a time.
pub struct ResultReporter {
    sink: Option<ReportSink>,
}

struct ReportSink {
    directory: PathBuf,
    xml_path: PathBuf,
    writer: BufWriter<File>,
    options: ReportOptions,
}

impl ResultReporter {
    pub async fn open(
        output_dir: Option<&Path>,
        options: ReportOptions,
    ) -> Result<Self, ReportError> {
        let Some(directory) = output_dir else {
            debug!("no output directory; reporting disabled");
            return Ok(Self { sink: None });
        };
        fs::create_dir_all(directory)
            .await
            .map_err(|source| ReportError::io(directory, source))?;
        let xml_path = directory.join(RESULTS_FILE_NAME);
        let file = File::create(&xml_path)
            .await
            .map_err(|source| ReportError::io(&xml_path, source))?;
        debug!(path = %xml_path.display(), "report opened");
        Ok(Self {
            sink: Some(ReportSink {
                directory: directory.to_path_buf(),
                xml_path,
                writer: BufWriter::new(file),
                options,
            }),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.sink.as_ref().map(|sink| sink.directory.as_path())
    }

    pub async fn record_header(&mut self) -> Result<(), ReportError> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_xml(xml::HEADER).await,
            None => Ok(()),
        }
    }

    pub async fn record_footer(&mut self) -> Result<(), ReportError> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_xml(xml::FOOTER).await,
            None => Ok(()),
        }
    }

    /// Appends the record of one sample and fills its result directory,
    /// named after the sample with the extension removed.
    pub async fn record_comparison(
        &mut self,
        sample_name: &str,
        sources: &SourceImages,
        result: &ComparisonResult,
    ) -> Result<(), ReportError> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(());
        };
        let name = result_dir_name(sample_name);
        sink.write_xml(&xml::test_record(&name, result)).await?;
        sink.fill_result_dir(&name, sources, result).await
    }

    /// Flushes and releases the report file. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), ReportError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        sink.writer
            .shutdown()
            .await
            .map_err(|source| ReportError::io(&sink.xml_path, source))?;
        debug!(path = %sink.xml_path.display(), "report closed");
        Ok(())
    }
}

impl ReportSink {
    async fn write_xml(&mut self, text: &str) -> Result<(), ReportError> {
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(|source| ReportError::io(&self.xml_path, source))
    }

    async fn fill_result_dir(
        &self,
        name: &str,
        sources: &SourceImages,
        result: &ComparisonResult,
    ) -> Result<(), ReportError> {
        let dir = self.directory.join(name);
        debug!(dir = %dir.display(), "creating result directory");
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| ReportError::io(&dir, source))?;

        let mut images = vec![(sources.pattern.clone(), PATTERN_IMAGE_NAME)];
        if !result.equal_images {
            images.push((sources.sample.clone(), SAMPLE_IMAGE_NAME));
            if let Some(diff) = result.diff_image.clone() {
                images.push((diff, DIFF_IMAGE_NAME));
            }
        }
        let writer = Arc::clone(&self.options.image_writer);
        let image_dir = dir.clone();
        task::spawn_blocking(move || {
            for (image, file_name) in images {
                writer.write(&image, &image_dir.join(file_name))?;
            }
            Ok::<(), ReportError>(())
        })
        .await??;

        let kind = TemplateKind::for_result(result);
        let template = self.options.templates.load(kind).await?;
        let page = self.options.placeholders.render(&template, result);
        let html_path = dir.join(HTML_FILE_NAME);
        fs::write(&html_path, page.as_bytes())
            .await
            .map_err(|source| ReportError::io(&html_path, source))
    }
}

/// Name of the result directory of a sample: its file name without the last
/// extension. Names that would not denote a child of the output directory
/// (`.`, `..`, empty) become `_`.
pub fn result_dir_name(sample_name: &str) -> String {
    let path = Path::new(sample_name);
    let name = path
        .file_stem()
        .or_else(|| path.file_name())
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if name.is_empty() || name.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    name.to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ::image::{Rgba, RgbaImage};
    use visual_suite_types::{Area, Point, Rectangle};

    use super::*;

    #[derive(Default)]
    struct CountingWriter {
        calls: AtomicUsize,
    }

    impl ImageWriter for CountingWriter {
        fn write(&self, _image: &SuiteImage, _path: &Path) -> Result<(), ReportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sources() -> SourceImages {
        SourceImages {
            pattern: SuiteImage::from_rgba(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]))),
            sample: SuiteImage::from_rgba(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]))),
        }
    }

    fn different_result() -> ComparisonResult {
        let mut result = ComparisonResult::identical(Area::new(2, 2));
        result.equal_images = false;
        result.equal_pixels = 0;
        result.perceptible_different_pixels = 4;
        result.global_different_pixels = 4;
        result.rectangle = Rectangle::new(Point::new(0, 0), Point::new(1, 1));
        result.diff_image = Some(sources().sample);
        result
    }

    #[test]
    fn result_dir_strips_only_the_last_extension() {
        assert_eq!(result_dir_name("login.png"), "login");
        assert_eq!(result_dir_name("archive.tar.png"), "archive.tar");
        assert_eq!(result_dir_name("samples/page.jpg"), "page");
        assert_eq!(result_dir_name("noext"), "noext");
    }

    #[test]
    fn result_dir_never_leaves_the_output_directory() {
        for name in ["", ".", "..", "a/..", "..png", "..."] {
            assert_eq!(result_dir_name(name), "_", "{name:?}");
        }
        assert_eq!(result_dir_name(".hidden"), ".hidden");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dot_dot_sample_is_written_inside_the_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let writer = Arc::new(CountingWriter::default());
        let options = ReportOptions::default().with_image_writer(writer.clone());
        let mut reporter = ResultReporter::open(Some(&out), options).await.unwrap();
        reporter
            .record_comparison("..", &sources(), &different_result())
            .await
            .unwrap();
        reporter.close().await.unwrap();

        assert!(out.join("_").join(HTML_FILE_NAME).is_file());
        assert!(!dir.path().join(HTML_FILE_NAME).exists());
        assert_eq!(writer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reporter_without_directory_is_a_no_op() {
        let mut reporter = ResultReporter::open(None, ReportOptions::default())
            .await
            .unwrap();
        assert!(!reporter.is_enabled());
        reporter.record_header().await.unwrap();
        reporter.record_footer().await.unwrap();
        reporter.close().await.unwrap();
        reporter.close().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_reporter_skips_images_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        let writer = Arc::new(CountingWriter::default());
        // A template directory that does not exist fails any page render.
        let options = ReportOptions::default()
            .with_image_writer(writer.clone())
            .with_templates(TemplateSource::Directory(dir.path().join("absent")));
        let mut reporter = ResultReporter::open(None, options).await.unwrap();

        reporter.record_header().await.unwrap();
        reporter
            .record_comparison("login.png", &sources(), &different_result())
            .await
            .unwrap();
        reporter.record_footer().await.unwrap();
        reporter.close().await.unwrap();

        assert_eq!(writer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.output_dir(), None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
