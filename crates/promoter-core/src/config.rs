//! Run configuration with precedence
//!
//! Settings are resolved from the following sources (low to high):
//! 1. Built-in defaults
//! 2. Config file (promoter.yaml)
//! 3. Environment variables (PROMOTER_* prefix)
//! 4. CLI flags (handled by caller)

use crate::error::{Error, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

/// Default worker pool width
pub const DEFAULT_THREADS: usize = 10;

/// Settings for one reconciliation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SyncConfig {
    /// Number of workers executing requests concurrently
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Record requests instead of performing them
    #[serde(default)]
    pub dry_run: bool,

    /// Delete destination tags the manifest does not declare
    #[serde(default)]
    pub delete_extra_tags: bool,

    /// Logging verbosity; has no effect on what the engine does
    #[serde(default)]
    pub verbosity: u8,
}

fn default_threads() -> usize {
    DEFAULT_THREADS
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            dry_run: false,
            delete_extra_tags: false,
            verbosity: 0,
        }
    }
}

impl SyncConfig {
    /// Resolve configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Utf8Path>) -> Result<Self> {
        let config = match path {
            Some(p) => Self::load_file(p)?,
            None => Self::default(),
        };
        let config = Self::apply_env_overrides(config)?;
        tracing::debug!("Resolved sync config: {:?}", config);
        Ok(config)
    }

    /// Parse a config file
    pub fn load_file(path: &Utf8Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config_not_found(path.as_str())
            } else {
                Error::Io(e)
            }
        })?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply PROMOTER_* environment variable overrides
    fn apply_env_overrides(mut config: Self) -> Result<Self> {
        if let Ok(val) = env::var("PROMOTER_THREADS") {
            config.threads = val
                .parse()
                .map_err(|_| Error::invalid_config("PROMOTER_THREADS must be a valid number"))?;
        }

        if let Ok(val) = env::var("PROMOTER_DRY_RUN") {
            config.dry_run = parse_bool("PROMOTER_DRY_RUN", &val)?;
        }

        if let Ok(val) = env::var("PROMOTER_DELETE_EXTRA_TAGS") {
            config.delete_extra_tags = parse_bool("PROMOTER_DELETE_EXTRA_TAGS", &val)?;
        }

        Ok(config)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.threads < 1 {
            return Err(Error::InvalidThreads {
                threads: self.threads,
            });
        }
        Ok(())
    }
}

fn parse_bool(name: &str, val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(Error::invalid_config(format!("{} must be true or false", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serial_test::serial;
    use tempfile::TempDir;

    fn write_config(content: &str) -> (Utf8PathBuf, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp_dir.path().join("promoter.yaml"))
            .expect("Invalid UTF-8 path");
        fs::write(&path, content).unwrap();
        (path, temp_dir)
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let config = SyncConfig::load(None).unwrap();
        assert_eq!(config, SyncConfig::default());
        assert_eq!(config.threads, DEFAULT_THREADS);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_file_overrides_defaults() {
        let (path, _temp) = write_config("threads: 4\ndelete-extra-tags: true\n");
        let config = SyncConfig::load(Some(&path)).unwrap();
        assert_eq!(config.threads, 4);
        assert!(config.delete_extra_tags);
        assert!(!config.dry_run);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let (path, _temp) = write_config("threads: 4\n");

        env::set_var("PROMOTER_THREADS", "2");
        env::set_var("PROMOTER_DRY_RUN", "true");

        let config = SyncConfig::load(Some(&path)).unwrap();
        assert_eq!(config.threads, 2);
        assert!(config.dry_run);

        env::remove_var("PROMOTER_THREADS");
        env::remove_var("PROMOTER_DRY_RUN");
    }

    #[test]
    #[serial]
    fn test_bad_env_value() {
        env::set_var("PROMOTER_DELETE_EXTRA_TAGS", "sometimes");
        let result = SyncConfig::load(None);
        env::remove_var("PROMOTER_DELETE_EXTRA_TAGS");

        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = SyncConfig {
            threads: 0,
            ..SyncConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidThreads { threads: 0 })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = SyncConfig::load_file(Utf8Path::new("/nonexistent/promoter.yaml"));
        assert!(matches!(result, Err(Error::ConfigNotFound { .. })));
    }
}
