use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fetch::FetchSettings;

pub const DEFAULT_LANGUAGE: &str = "zh-CN";
pub const DEFAULT_IMAGE_CONCURRENCY: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid export options: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("image_concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Export knobs that can be stored alongside other settings as RON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Language recorded when the page declares none.
    pub default_language: String,
    /// Upper bound on image fetches in flight for one article.
    pub image_concurrency: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            default_language: DEFAULT_LANGUAGE.to_string(),
            image_concurrency: DEFAULT_IMAGE_CONCURRENCY,
        }
    }
}

impl ExportOptions {
    /// Parse options from RON; missing fields keep their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let options: Self = ron::from_str(text)?;
        if options.image_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(options)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Where finished `.epub` files are written.
    pub output_dir: PathBuf,
    pub export: ExportOptions,
    pub fetch: FetchSettings,
}

impl EngineConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            export: ExportOptions::default(),
            fetch: FetchSettings::default(),
        }
    }
}
