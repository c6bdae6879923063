//! `sheet2sql.toml` configuration.
//!
//! Lookup order: an explicit path, then `./sheet2sql.toml`, then
//! `<config dir>/sheet2sql/config.toml`, then built-in defaults.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::engine::{ConvertOptions, NullPolicy};
use crate::error::{ConvertError, ConvertResult};
use crate::transpiler::{Dialect, DEFAULT_BATCH_SIZE};

pub const CONFIG_FILE: &str = "sheet2sql.toml";

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub convert: ConvertConfig,
}

/// `[convert]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    pub dialects: Vec<String>,
    pub batch_size: usize,
    pub null_policy: NullPolicy,
    /// Treat any validation issue as a failed run.
    pub strict: bool,
    /// Parallel clean/validate workers.
    pub jobs: usize,
    pub output_dir: PathBuf,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            dialects: Dialect::ALL.iter().map(|d| d.slug().to_string()).collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            null_policy: NullPolicy::default(),
            strict: false,
            jobs: 1,
            output_dir: PathBuf::from("./sheet2sql_output"),
        }
    }
}

impl Config {
    /// Parse configuration text.
    pub fn from_toml(content: &str) -> ConvertResult<Self> {
        toml::from_str(content).map_err(|e| ConvertError::Config(e.to_string()))
    }

    /// Load from `explicit`, or the first file found in the usual places.
    pub fn load(explicit: Option<&Path>) -> ConvertResult<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConvertError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_file(path);
        }

        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_file(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> ConvertResult<Self> {
        debug!(path = %path.display(), "loading config");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ConvertError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Candidate files, in lookup order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sheet2sql").join("config.toml"));
        }
        paths
    }
}

impl ConvertConfig {
    /// Resolve dialect names; an unknown name is a configuration error.
    pub fn dialects(&self) -> ConvertResult<Vec<Dialect>> {
        let mut out = Vec::new();
        for name in &self.dialects {
            let dialect: Dialect = name.parse()?;
            if !out.contains(&dialect) {
                out.push(dialect);
            }
        }
        if out.is_empty() {
            return Err(ConvertError::Config("no dialects selected".to_string()));
        }
        Ok(out)
    }

    pub fn to_options(&self) -> ConvertResult<ConvertOptions> {
        if self.batch_size == 0 {
            return Err(ConvertError::Config(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(ConvertOptions {
            dialects: self.dialects()?,
            batch_size: self.batch_size,
            null_policy: self.null_policy,
        })
    }
}
