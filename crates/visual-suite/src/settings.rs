use std::collections::HashSet;
use std::env;
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::{BaseDirs, ProjectDirs};
use serde::Deserialize;
use tracing::{debug, warn};
use visual_suite_comparator::ComparatorKind;
use visual_suite_retriever::{RetrieverConfig, RetrieverConfigError, RetrieverKind};
use visual_suite_types::{AmountType, Perception};

use crate::cli::CliArgs;
use crate::config::{Configuration, TestDescriptor};
use crate::listener::{ListenerCatalog, ListenerDescriptor};
use crate::output::{ReportOptions, TemplateSource, result_dir_name};
use crate::sample::SampleDescriptor;
use crate::suite::DEFAULT_PREFETCH;

pub const CONFIG_FILE_NAME: &str = "visual-suite.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct FileConfig {
    output_dir: Option<String>,
    template_dir: Option<String>,
    prefetch: Option<usize>,
    comparator: Option<String>,
    perception: Option<Perception>,
    pattern_retriever: Option<RetrieverFileConfig>,
    sample_retriever: Option<RetrieverFileConfig>,
    mask_retriever: Option<RetrieverFileConfig>,
    listener: Vec<ListenerDescriptor>,
    test: Vec<TestFileConfig>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default, rename_all = "kebab-case")]
struct RetrieverFileConfig {
    #[serde(rename = "type")]
    kind: Option<String>,
    base_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(default)]
struct TestFileConfig {
    name: Option<String>,
    sample: Option<String>,
    pattern: Option<String>,
    masks: Vec<String>,
    perception: Option<Perception>,
}

/// Command-line values that win over the suite document.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub output_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
}

impl SettingsOverrides {
    pub fn from_cli(cli: &CliArgs) -> Self {
        Self {
            output_dir: cli.output.clone().map(expand_pathbuf),
            template_dir: cli.templates.clone().map(expand_pathbuf),
        }
    }
}

#[derive(Debug)]
pub struct EffectiveSettings {
    pub config_path: PathBuf,
    pub output_dir: Option<PathBuf>,
    pub template_dir: Option<PathBuf>,
    pub prefetch: NonZeroUsize,
    pub comparator: ComparatorKind,
    pub perception: Perception,
    pub pattern_retriever: RetrieverConfig,
    pub sample_retriever: RetrieverConfig,
    /// `None` reads masks through the pattern retriever.
    pub mask_retriever: Option<RetrieverConfig>,
    pub listeners: Vec<ListenerDescriptor>,
    pub tests: Vec<TestDescriptor>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    InvalidValue {
        path: Option<PathBuf>,
        field: &'static str,
        value: String,
    },
    NotFound {
        path: PathBuf,
    },
    Missing {
        searched: Vec<PathBuf>,
    },
    Retriever {
        field: &'static str,
        source: RetrieverConfigError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read suite file {}: {}", path.display(), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "failed to parse suite file {}: {}", path.display(), source)
            }
            ConfigError::InvalidValue { path, field, value } => {
                if let Some(path) = path {
                    write!(
                        f,
                        "invalid value '{}' for '{}' in {}",
                        value,
                        field,
                        path.display()
                    )
                } else {
                    write!(f, "invalid value '{}' for '{}'", value, field)
                }
            }
            ConfigError::NotFound { path } => {
                write!(f, "suite file {} does not exist", path.display())
            }
            ConfigError::Missing { searched } => {
                let searched: Vec<String> = searched
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect();
                write!(
                    f,
                    "no suite file found (searched: {}); pass --config",
                    searched.join(", ")
                )
            }
            ConfigError::Retriever { field, source } => {
                write!(f, "failed to set up {field}: {source}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Retriever { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
            ConfigError::NotFound { .. } => None,
            ConfigError::Missing { .. } => None,
        }
    }
}

pub fn resolve_settings(cli: &CliArgs) -> Result<EffectiveSettings, ConfigError> {
    let path = locate_config(cli.config.as_deref())?;
    load_settings(&path, &SettingsOverrides::from_cli(cli))
}

/// Reads and validates the suite document at `path`.
pub fn load_settings(
    path: &Path,
    overrides: &SettingsOverrides,
) -> Result<EffectiveSettings, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings(&contents, path, overrides)
}

/// Parses suite document text as if it had been read from `path`; relative
/// paths resolve against the parent directory of `path`.
pub fn parse_settings(
    contents: &str,
    path: &Path,
    overrides: &SettingsOverrides,
) -> Result<EffectiveSettings, ConfigError> {
    let file: FileConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    merge(overrides, file, path)
}

fn locate_config(path_override: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path_override {
        let path = expand_pathbuf(path.to_path_buf());
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        return Ok(path);
    }

    let candidates: Vec<PathBuf> = [project_config_path(), default_config_path()]
        .into_iter()
        .flatten()
        .collect();
    for candidate in &candidates {
        if candidate.exists() {
            debug!(path = %candidate.display(), "using suite file");
            return Ok(candidate.clone());
        }
    }
    Err(ConfigError::Missing {
        searched: candidates,
    })
}

fn merge(
    overrides: &SettingsOverrides,
    file: FileConfig,
    config_path: &Path,
) -> Result<EffectiveSettings, ConfigError> {
    let config_dir = config_path.parent().map(Path::to_path_buf);
    let base = config_dir.as_deref();
    let invalid = |field: &'static str, value: String| ConfigError::InvalidValue {
        path: Some(config_path.to_path_buf()),
        field,
        value,
    };

    let FileConfig {
        output_dir: file_output_dir,
        template_dir: file_template_dir,
        prefetch: file_prefetch,
        comparator: file_comparator,
        perception: file_perception,
        pattern_retriever: file_pattern_retriever,
        sample_retriever: file_sample_retriever,
        mask_retriever: file_mask_retriever,
        listener: listeners,
        test: file_tests,
    } = file;

    let output_dir = overrides.output_dir.clone().or_else(|| {
        normalize_string(file_output_dir).and_then(|dir| resolve_path_from_config(dir, base))
    });
    let template_dir = overrides.template_dir.clone().or_else(|| {
        normalize_string(file_template_dir).and_then(|dir| resolve_path_from_config(dir, base))
    });

    let prefetch = match file_prefetch {
        Some(value) => NonZeroUsize::new(value).ok_or_else(|| invalid("prefetch", value.to_string()))?,
        None => NonZeroUsize::new(DEFAULT_PREFETCH).unwrap_or(NonZeroUsize::MIN),
    };

    let comparator = match normalize_string(file_comparator) {
        Some(value) => {
            ComparatorKind::from_str(&value).map_err(|_| invalid("comparator", value.clone()))?
        }
        None => ComparatorKind::default(),
    };

    let perception = file_perception.unwrap_or_default();
    warn_on_unreadable_amount("perception", &perception);

    let pattern_retriever = retriever_config(
        "pattern-retriever",
        file_pattern_retriever.unwrap_or_default(),
        base,
        config_path,
    )?;
    let sample_retriever = retriever_config(
        "sample-retriever",
        file_sample_retriever.unwrap_or_default(),
        base,
        config_path,
    )?;
    let mask_retriever = file_mask_retriever
        .map(|section| retriever_config("mask-retriever", section, base, config_path))
        .transpose()?;

    let mut seen = HashSet::new();
    let mut result_dirs = HashSet::new();
    let mut tests = Vec::with_capacity(file_tests.len());
    for entry in file_tests {
        let sample = normalize_string(entry.sample)
            .ok_or_else(|| invalid("test.sample", String::new()))?;
        let pattern = normalize_string(entry.pattern)
            .ok_or_else(|| invalid("test.pattern", String::new()))?;
        let name = normalize_string(entry.name)
            .unwrap_or_else(|| SampleDescriptor::new(sample.as_str()).stem().to_string());
        if !seen.insert(name.clone()) {
            return Err(invalid("test.name", name));
        }
        let sample = SampleDescriptor::new(sample);
        if !result_dirs.insert(result_dir_name(sample.file_name())) {
            return Err(invalid("test.sample", sample.source().to_string()));
        }
        if let Some(perception) = entry.perception.as_ref() {
            warn_on_unreadable_amount(&name, perception);
        }
        tests.push(TestDescriptor {
            name,
            sample,
            pattern,
            masks: entry
                .masks
                .into_iter()
                .filter_map(|mask| normalize_string(Some(mask)))
                .collect(),
            perception: entry.perception,
        });
    }

    Ok(EffectiveSettings {
        config_path: config_path.to_path_buf(),
        output_dir,
        template_dir,
        prefetch,
        comparator,
        perception,
        pattern_retriever,
        sample_retriever,
        mask_retriever,
        listeners,
        tests,
    })
}

impl EffectiveSettings {
    /// Creates the retrievers and assembles the runnable configuration.
    pub fn build_configuration(
        &self,
        catalog: ListenerCatalog,
    ) -> Result<Configuration, ConfigError> {
        let pattern = self
            .pattern_retriever
            .create_retriever()
            .map_err(|source| ConfigError::Retriever {
                field: "pattern-retriever",
                source,
            })?;
        let sample = self
            .sample_retriever
            .create_retriever()
            .map_err(|source| ConfigError::Retriever {
                field: "sample-retriever",
                source,
            })?;
        let mut configuration = Configuration::new(pattern, sample)
            .with_perception(self.perception.clone())
            .with_tests(self.tests.iter().cloned())
            .with_listeners(catalog, self.listeners.clone());
        if let Some(mask) = self.mask_retriever.as_ref() {
            let mask = mask
                .create_retriever()
                .map_err(|source| ConfigError::Retriever {
                    field: "mask-retriever",
                    source,
                })?;
            configuration = configuration.with_mask_retriever(mask);
        }
        Ok(configuration)
    }

    pub fn report_options(&self) -> ReportOptions {
        let templates = match self.template_dir.clone() {
            Some(dir) => TemplateSource::Directory(dir),
            None => TemplateSource::Embedded,
        };
        ReportOptions::default().with_templates(templates)
    }
}

fn retriever_config(
    field: &'static str,
    section: RetrieverFileConfig,
    base: Option<&Path>,
    config_path: &Path,
) -> Result<RetrieverConfig, ConfigError> {
    let kind = match normalize_string(section.kind) {
        Some(value) => RetrieverKind::from_str(&value).map_err(|_| ConfigError::InvalidValue {
            path: Some(config_path.to_path_buf()),
            field,
            value,
        })?,
        None => RetrieverKind::default(),
    };
    let base_dir = normalize_string(section.base_dir)
        .and_then(|dir| resolve_path_from_config(dir, base))
        .or_else(|| base.map(Path::to_path_buf));
    Ok(RetrieverConfig { kind, base_dir })
}

fn warn_on_unreadable_amount(scope: &str, perception: &Perception) {
    if let Some(raw) = perception.global_difference_amount()
        && perception.amount_as(AmountType::Pixel).is_wrong_unit()
        && perception.amount_as(AmountType::Percentage).is_wrong_unit()
    {
        warn!(
            scope,
            amount = raw,
            "global difference amount is neither pixels nor a percentage; any global difference fails"
        );
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("rs", "visual-suite", "visual-suite")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn project_config_path() -> Option<PathBuf> {
    env::current_dir().ok().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn normalize_string(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn expand_pathbuf(path: PathBuf) -> PathBuf {
    match path.to_str() {
        Some(s) => expand_home_path(s),
        None => path,
    }
}

fn resolve_path_from_config(value: String, base: Option<&Path>) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let expanded = expand_home_path(trimmed);
    match base {
        Some(base) if !expanded.is_absolute() => Some(base.join(expanded)),
        _ => Some(expanded),
    }
}

fn expand_home_path(value: &str) -> PathBuf {
    if value == "~" {
        if let Some(base) = BaseDirs::new() {
            return base.home_dir().to_path_buf();
        }
    } else if let Some(stripped) = value.strip_prefix("~/")
        && let Some(base) = BaseDirs::new()
    {
        return base.home_dir().join(stripped);
    }
    PathBuf::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
output-dir = "results"
prefetch = 2
comparator = "exact"

[perception]
one-pixel-threshold = 8
global-difference-threshold = 32
global-difference-amount = "1%"

[pattern-retriever]
type = "file"
base-dir = "patterns"

[sample-retriever]
type = "FILE"

[[listener]]
type = "logging"
[listener.properties]
level = "debug"

[[listener]]
type = "summary"

[[test]]
name = "login"
sample = "samples/login.png"
pattern = "login.png"
masks = ["masks/clock.png", "  "]
[test.perception]
global-difference-amount = "5px"

[[test]]
sample = "samples/home.png"
pattern = "home.png"
"#;

    fn parse(contents: &str) -> Result<EffectiveSettings, ConfigError> {
        parse_settings(
            contents,
            Path::new("/suite/visual-suite.toml"),
            &SettingsOverrides::default(),
        )
    }

    #[test]
    fn full_document_is_resolved_against_its_directory() {
        let settings = parse(SUITE).unwrap();
        assert_eq!(settings.output_dir, Some(PathBuf::from("/suite/results")));
        assert_eq!(settings.template_dir, None);
        assert_eq!(settings.prefetch.get(), 2);
        assert_eq!(settings.comparator, ComparatorKind::Exact);
        assert_eq!(settings.perception.one_pixel_threshold(), Some(8));
        assert_eq!(settings.perception.global_difference_percentage(), Some(1));
        assert_eq!(
            settings.pattern_retriever.base_dir,
            Some(PathBuf::from("/suite/patterns"))
        );
        assert_eq!(settings.sample_retriever.kind, RetrieverKind::File);
        assert_eq!(
            settings.sample_retriever.base_dir,
            Some(PathBuf::from("/suite"))
        );
        assert!(settings.mask_retriever.is_none());
        assert_eq!(settings.listeners.len(), 2);
        assert_eq!(settings.listeners[0].properties.get("level"), Some("debug"));

        let login = &settings.tests[0];
        assert_eq!(login.masks, vec!["masks/clock.png".to_string()]);
        let effective = login.effective_perception(&settings.perception);
        assert_eq!(effective.global_difference_pixel_amount(), Some(5));
        assert_eq!(effective.one_pixel_threshold(), Some(8));
        assert_eq!(settings.tests[1].name, "home");
    }

    #[test]
    fn cli_overrides_win() {
        let overrides = SettingsOverrides {
            output_dir: Some(PathBuf::from("/tmp/out")),
            template_dir: Some(PathBuf::from("/tmp/templates")),
        };
        let settings =
            parse_settings(SUITE, Path::new("/suite/visual-suite.toml"), &overrides).unwrap();
        assert_eq!(settings.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(
            settings.report_options().templates,
            TemplateSource::Directory(PathBuf::from("/tmp/templates"))
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            ("prefetch = 0", "prefetch"),
            ("comparator = \"fuzzy\"", "comparator"),
            ("[pattern-retriever]\ntype = \"http\"", "pattern-retriever"),
            ("[[test]]\npattern = \"a.png\"", "test.sample"),
            ("[[test]]\nsample = \"a.png\"", "test.pattern"),
            (
                "[[test]]\nsample = \"a.png\"\npattern = \"a.png\"\n[[test]]\nsample = \"x/a.png\"\npattern = \"b.png\"",
                "test.name",
            ),
            (
                "[[test]]\nname = \"chrome-login\"\nsample = \"chrome/login.png\"\npattern = \"login.png\"\n[[test]]\nname = \"firefox-login\"\nsample = \"firefox/login.png\"\npattern = \"login.png\"",
                "test.sample",
            ),
        ];
        for (contents, expected) in cases {
            match parse(contents) {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("{contents}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            parse("prefetch = ["),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            locate_config(Some(&missing)),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn load_settings_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, SUITE).unwrap();
        let settings = load_settings(&path, &SettingsOverrides::default()).unwrap();
        assert_eq!(settings.output_dir, Some(dir.path().join("results")));
        assert_eq!(settings.tests.len(), 2);
    }
}
