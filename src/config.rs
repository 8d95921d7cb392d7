//! Run properties loaded from a TOML file.
//!
//! Locates the shared datasets and the output directories. Every key is
//! optional; relative paths resolve against `base-path`, which itself
//! defaults to the directory holding the properties file.
//!
//! ## Example
//!
//! ```toml
//! base-path = "/data/ml-1m"
//! train-file = "splits/train.data"
//! max-length = 100
//! filters = ["notInTrain"]
//! format = "simple"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_MAX_LENGTH: usize = 100;
pub const DEFAULT_FORMAT: &str = "simple";
pub const DEFAULT_FILTER: &str = "notInTrain";

/// Resolved run properties.
#[derive(Debug, Clone)]
pub struct Properties {
    /// Properties file these were read from (for display).
    pub source: Option<PathBuf>,
    pub base_path: PathBuf,

    pub users_file: PathBuf,
    pub items_file: PathBuf,
    pub target_users_file: PathBuf,
    pub train_file: PathBuf,
    pub test_file: PathBuf,

    pub recommendation_path: PathBuf,
    pub model_path: PathBuf,
    pub feature_path: PathBuf,

    /// Maximum length of each generated recommendation list.
    pub max_length: usize,
    /// Candidate filters, all of which must pass.
    pub filters: Vec<String>,
    /// Recommendation artifact format name.
    pub format: String,
}

/// Raw properties as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawProperties {
    base_path: Option<PathBuf>,
    users_file: Option<PathBuf>,
    items_file: Option<PathBuf>,
    target_users_file: Option<PathBuf>,
    train_file: Option<PathBuf>,
    test_file: Option<PathBuf>,
    recommendation_path: Option<PathBuf>,
    model_path: Option<PathBuf>,
    feature_path: Option<PathBuf>,
    max_length: Option<usize>,
    filters: Option<Vec<String>>,
    format: Option<String>,
}

impl Properties {
    /// Load properties from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read properties file: {}", path.display()))?;
        let raw: RawProperties = toml::from_str(&content)
            .with_context(|| format!("Failed to parse properties file: {}", path.display()))?;

        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut props = Self::from_raw(raw, &base);
        props.source = Some(path.to_path_buf());
        Ok(props)
    }

    /// Defaults rooted at `base_path`.
    pub fn with_base(base_path: impl Into<PathBuf>) -> Self {
        Self::from_raw(RawProperties::default(), &base_path.into())
    }

    fn from_raw(raw: RawProperties, config_dir: &Path) -> Self {
        let base_path = match raw.base_path {
            Some(p) if p.is_absolute() => p,
            Some(p) => config_dir.join(p),
            None => config_dir.to_path_buf(),
        };
        let resolve = |value: Option<PathBuf>, default: &str| -> PathBuf {
            let p = value.unwrap_or_else(|| PathBuf::from(default));
            if p.is_absolute() {
                p
            } else {
                base_path.join(p)
            }
        };

        Self {
            source: None,
            users_file: resolve(raw.users_file, "users.txt"),
            items_file: resolve(raw.items_file, "items.txt"),
            target_users_file: resolve(raw.target_users_file, "targetUsers.txt"),
            train_file: resolve(raw.train_file, "train.data"),
            test_file: resolve(raw.test_file, "test.data"),
            recommendation_path: resolve(raw.recommendation_path, "recommendations"),
            model_path: resolve(raw.model_path, "models"),
            feature_path: resolve(raw.feature_path, "features"),
            max_length: raw.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            filters: raw
                .filters
                .unwrap_or_else(|| vec![DEFAULT_FILTER.to_string()]),
            format: raw.format.unwrap_or_else(|| DEFAULT_FORMAT.to_string()),
            base_path,
        }
    }

    /// Feature file for feature set `name`.
    pub fn feature_file(&self, name: &str) -> PathBuf {
        self.feature_path.join(format!("{name}.txt"))
    }

    /// Format properties for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.source {
            Some(source) => lines.push(format!("   Properties: {}", source.display())),
            None => lines.push("   Properties: (defaults)".to_string()),
        }
        lines.push(format!("   Base path: {}", self.base_path.display()));
        lines.push(format!("   Train: {}", self.train_file.display()));
        lines.push(format!("   Test: {}", self.test_file.display()));
        lines.push(format!(
            "   Output: {} ({}, max length {})",
            self.recommendation_path.display(),
            self.format,
            self.max_length
        ));
        lines.push(format!("   Filters: {}", self.filters.join(", ")));

        lines.join("\n")
    }
}
