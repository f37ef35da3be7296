use std::collections::HashMap;
use std::path::Path;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::core::{RetrieveContext, Retriever};
use visual_suite_types::{RetrievalError, RetrievalResult, SuiteImage};

/// Serves images registered up front, keyed by source identifier.
#[derive(Debug, Default)]
pub struct MemoryRetriever {
    images: RwLock<HashMap<String, SuiteImage>>,
}

impl MemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, source: impl Into<String>, image: SuiteImage) -> Self {
        self.insert(source, image);
        self
    }

    /// Registers `image` under `source`, returning the image it replaced.
    pub fn insert(&self, source: impl Into<String>, image: SuiteImage) -> Option<SuiteImage> {
        self.images.write().insert(source.into(), image)
    }

    pub fn remove(&self, source: &str) -> Option<SuiteImage> {
        self.images.write().remove(source)
    }

    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }

    /// Decodes every image file directly inside `dir` and registers it under
    /// its file name. Files that fail to decode are skipped.
    pub fn preload_dir(&self, dir: &Path) -> RetrievalResult<usize> {
        let dir_id = dir.display().to_string();
        let entries = std::fs::read_dir(dir).map_err(|err| RetrievalError::io(&dir_id, err))?;
        let mut loaded = 0;
        for entry in entries {
            let entry = entry.map_err(|err| RetrievalError::io(&dir_id, err))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let bytes = std::fs::read(&path).map_err(|err| RetrievalError::io(name, err))?;
            match SuiteImage::decode(&bytes) {
                Ok(image) => {
                    self.insert(name, image);
                    loaded += 1;
                }
                Err(err) => warn!(file = %path.display(), error = %err, "skipping undecodable file"),
            }
        }
        debug!(dir = %dir.display(), loaded, "preloaded images");
        Ok(loaded)
    }
}

impl Retriever for MemoryRetriever {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn retrieve(&self, source: &str, _context: &RetrieveContext) -> RetrievalResult<SuiteImage> {
        self.images
            .read()
            .get(source)
            .cloned()
            .ok_or_else(|| RetrievalError::not_found(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn solid(value: u8) -> SuiteImage {
        SuiteImage::from_rgba(RgbaImage::from_pixel(2, 2, Rgba([value, value, value, 255])))
    }

    #[test]
    fn returns_registered_image_handle() {
        let image = solid(10);
        let retriever = MemoryRetriever::new().with_image("a.png", image.clone());
        let fetched = retriever
            .retrieve("a.png", &RetrieveContext::new())
            .expect("registered image");
        assert!(fetched.ptr_eq(&image));
    }

    #[test]
    fn unknown_source_is_not_found() {
        let retriever = MemoryRetriever::new();
        let err = retriever
            .retrieve("missing.png", &RetrieveContext::new())
            .unwrap_err();
        assert!(matches!(err, RetrievalError::NotFound { .. }));
        assert_eq!(err.source_id(), "missing.png");
    }

    #[test]
    fn insert_replaces_previous_image() {
        let retriever = MemoryRetriever::new();
        assert!(retriever.insert("a.png", solid(1)).is_none());
        assert!(retriever.insert("a.png", solid(2)).is_some());
        assert_eq!(retriever.len(), 1);
        assert!(retriever.remove("a.png").is_some());
        assert!(retriever.is_empty());
    }
}
