//! Project configuration file support for ontoeval.
//!
//! Loads configuration from `ontoeval.toml` in the working directory.

use anyhow::{Context, Result};
use ontoeval_logging::LogFormat;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Records whose target diff is longer than this are skipped
pub const DEFAULT_MAX_DIFF_SIZE_LINES: usize = 10_000;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Project-level configuration loaded from `ontoeval.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Tracing filter level, e.g. `info` or `ontoeval_diff=debug`
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub max_diff_size_lines: Option<usize>,
    /// Where `batch` writes one Markdown report per record
    pub markdown_directory: Option<PathBuf>,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Comparison cache settings
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: Option<bool>,
    /// SQLite database file
    pub path: Option<PathBuf>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "ontoeval.toml";

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let mut config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.resolve_paths(working_dir);

        Ok(Some(config))
    }

    /// Relative paths in the file are relative to the working directory
    fn resolve_paths(&mut self, working_dir: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = working_dir.join(&*p);
            }
        };
        if let Some(dir) = self.markdown_directory.as_mut() {
            resolve(dir);
        }
        if let Some(path) = self.cache.path.as_mut() {
            resolve(path);
        }
    }

    /// Priority: --log-level > config > default
    pub fn log_level(&self, cli: Option<&str>) -> String {
        cli.or(self.log_level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string()
    }

    /// Priority: --log-format > config > pretty
    pub fn log_format(&self, cli: Option<LogFormat>) -> LogFormat {
        cli.or(self.log_format).unwrap_or_default()
    }

    pub fn max_diff_size_lines(&self, cli: Option<usize>) -> usize {
        cli.or(self.max_diff_size_lines)
            .unwrap_or(DEFAULT_MAX_DIFF_SIZE_LINES)
    }

    pub fn markdown_directory(&self, cli: Option<&Path>) -> Option<PathBuf> {
        cli.map(Path::to_path_buf)
            .or_else(|| self.markdown_directory.clone())
    }

    /// `--no-cache` wins over the file; the cache is on by default
    pub fn cache_enabled(&self, no_cache: bool) -> bool {
        !no_cache && self.cache.enabled.unwrap_or(true)
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache.path.as_deref()
    }
}
