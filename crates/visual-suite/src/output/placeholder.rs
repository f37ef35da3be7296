use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::warn;
use visual_suite_types::{ComparisonResult, Point};

use super::manager::DIFF_IMAGE_NAME;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(.*?)\}").expect("placeholder pattern is valid"));

/// Reads one value of a comparison result; `None` means unavailable.
pub type PlaceholderAccessor = fn(&ComparisonResult) -> Option<String>;

/// Named accessors that `${Name}` placeholders in report templates resolve
/// against.
#[derive(Debug, Clone)]
pub struct PlaceholderRegistry {
    accessors: BTreeMap<String, PlaceholderAccessor>,
}

fn point(point: Point) -> String {
    format!("({}, {})", point.x, point.y)
}

impl PlaceholderRegistry {
    pub fn empty() -> Self {
        Self {
            accessors: BTreeMap::new(),
        }
    }

    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("AreaWidth", |r| Some(r.area.width.to_string()));
        registry.register("AreaHeight", |r| Some(r.area.height.to_string()));
        registry.register("RectangleMin", |r| Some(point(r.rectangle.min)));
        registry.register("RectangleMax", |r| Some(point(r.rectangle.max)));
        registry.register("TotalPixels", |r| Some(r.total_pixels.to_string()));
        registry.register("MaskedPixels", |r| Some(r.masked_pixels.to_string()));
        registry.register("PerceptibleDiffs", |r| {
            Some(r.perceptible_different_pixels.to_string())
        });
        registry.register("DifferentPixels", |r| {
            Some(r.global_different_pixels.to_string())
        });
        registry.register("SmallDifferences", |r| {
            Some(r.small_different_pixels.to_string())
        });
        registry.register("EqualPixels", |r| Some(r.equal_pixels.to_string()));
        registry.register("EqualsImages", |r| Some(r.equal_images.to_string()));
        registry.register("DiffImage", |r| {
            r.diff_image.as_ref().map(|_| DIFF_IMAGE_NAME.to_string())
        });
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, accessor: PlaceholderAccessor) {
        self.accessors.insert(name.into(), accessor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.accessors.keys().map(String::as_str)
    }

    pub fn resolve(&self, name: &str, result: &ComparisonResult) -> Option<String> {
        self.accessors.get(name).and_then(|accessor| accessor(result))
    }

    /// Substitutes every `${Name}` in `template`. Unknown or unavailable
    /// names are logged and left as written.
    pub fn render<'t>(&self, template: &'t str, result: &ComparisonResult) -> Cow<'t, str> {
        PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match self.resolve(name, result) {
                Some(value) => value,
                None => {
                    if self.accessors.contains_key(name) {
                        warn!(placeholder = name, "placeholder value unavailable");
                    } else {
                        warn!(placeholder = name, "unknown template placeholder");
                    }
                    caps[0].to_string()
                }
            }
        })
    }
}

impl Default for PlaceholderRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
