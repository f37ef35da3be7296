use std::borrow::Cow;
use std::path::PathBuf;

use visual_suite_types::ComparisonResult;

use super::error::ReportError;

const SAME_IMAGES: &str = include_str!("../../templates/template_same_images.html");
const DIFFERENT_IMAGES: &str = include_str!("../../templates/template_different_images.html");

/// Page template picked by the comparison verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    SameImages,
    DifferentImages,
}

impl TemplateKind {
    pub fn for_result(result: &ComparisonResult) -> Self {
        if result.equal_images {
            TemplateKind::SameImages
        } else {
            TemplateKind::DifferentImages
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::SameImages => "template_same_images.html",
            TemplateKind::DifferentImages => "template_different_images.html",
        }
    }

    fn embedded(&self) -> &'static str {
        match self {
            TemplateKind::SameImages => SAME_IMAGES,
            TemplateKind::DifferentImages => DIFFERENT_IMAGES,
        }
    }
}

/// Where report templates are read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// Templates compiled into the binary.
    #[default]
    Embedded,
    /// A directory holding `template_same_images.html` and
    /// `template_different_images.html`.
    Directory(PathBuf),
}

impl TemplateSource {
    pub async fn load(&self, kind: TemplateKind) -> Result<Cow<'static, str>, ReportError> {
        match self {
            TemplateSource::Embedded => Ok(Cow::Borrowed(kind.embedded())),
            TemplateSource::Directory(dir) => {
                let path = dir.join(kind.file_name());
                tokio::fs::read_to_string(&path)
                    .await
                    .map(Cow::Owned)
                    .map_err(|source| ReportError::Template { path, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use visual_suite_types::Area;

    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn embedded_templates_carry_placeholders() {
        let same = TemplateSource::Embedded
            .load(TemplateKind::SameImages)
            .await
            .unwrap();
        let different = TemplateSource::Embedded
            .load(TemplateKind::DifferentImages)
            .await
            .unwrap();
        assert!(same.contains("${TotalPixels}"));
        assert!(!same.contains("${DiffImage}"));
        assert!(different.contains("${DiffImage}"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn missing_directory_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = TemplateSource::Directory(dir.path().to_path_buf());
        let err = source.load(TemplateKind::SameImages).await.unwrap_err();
        match err {
            ReportError::Template { path, .. } => {
                assert!(path.ends_with("template_same_images.html"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn kind_follows_the_verdict() {
        let mut result = ComparisonResult::identical(Area::new(1, 1));
        assert_eq!(TemplateKind::for_result(&result), TemplateKind::SameImages);
        result.equal_images = false;
        assert_eq!(
            TemplateKind::for_result(&result),
            TemplateKind::DifferentImages
        );
    }
}
