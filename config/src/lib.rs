//! Configuration for imgpack.
//!
//! Values come from three layers, lowest priority first: built-in defaults, an
//! optional TOML file named by `IMGPACK_CONFIG`, and `IMGPACK_*` environment
//! variables. Fields stay `Option` at this boundary; the accessor methods apply
//! the defaults.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the path of the optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "IMGPACK_CONFIG";

pub const DOWNLOAD_TIMEOUT_ENV: &str = "IMGPACK_DOWNLOAD_TIMEOUT_SECS";
pub const UPLOAD_TIMEOUT_ENV: &str = "IMGPACK_UPLOAD_TIMEOUT_SECS";
pub const WORK_DIR_ENV: &str = "IMGPACK_WORK_DIR";
pub const USER_AGENT_ENV: &str = "IMGPACK_USER_AGENT";
pub const TIMEOUT_WARNING_ENV: &str = "IMGPACK_TIMEOUT_WARNING_MS";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BundlerConfig {
    /// Per-source GET timeout in seconds. Default: 15 (0 also means 15).
    pub download_timeout_seconds: Option<u64>,

    /// Upload POST timeout in seconds. Default: none (0 also means none).
    pub upload_timeout_seconds: Option<u64>,

    /// Root under which per-invocation working directories are created.
    /// Default: the system temp dir.
    pub work_dir: Option<PathBuf>,

    /// User-Agent for both downloads and the upload.
    pub user_agent: Option<String>,

    /// Warn this many milliseconds before the invocation deadline. 0 disables.
    pub timeout_warning_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value {value:?} for {var}: expected a non-negative integer")]
    InvalidEnv { var: &'static str, value: String },
}

impl BundlerConfig {
    pub const DEFAULT_DOWNLOAD_TIMEOUT_SECONDS: u64 = 15;
    pub const DEFAULT_TIMEOUT_WARNING_MS: u64 = 1500;

    /// Load from the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_path() {
            Some(path) => Self::from_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        config.apply_env(|var| env::var(var).ok())?;
        Ok(config)
    }

    /// Read a TOML config file. A missing file is `Ok(None)`.
    pub fn from_file(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    /// Overlay `IMGPACK_*` variables. Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(DOWNLOAD_TIMEOUT_ENV) {
            self.download_timeout_seconds = Some(parse_u64(DOWNLOAD_TIMEOUT_ENV, &value)?);
        }
        if let Some(value) = get(UPLOAD_TIMEOUT_ENV) {
            self.upload_timeout_seconds = Some(parse_u64(UPLOAD_TIMEOUT_ENV, &value)?);
        }
        if let Some(value) = get(TIMEOUT_WARNING_ENV) {
            self.timeout_warning_ms = Some(parse_u64(TIMEOUT_WARNING_ENV, &value)?);
        }
        if let Some(value) = get(WORK_DIR_ENV) {
            self.work_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = get(USER_AGENT_ENV) {
            self.user_agent = Some(value);
        }
        Ok(())
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(
            self.download_timeout_seconds
                .filter(|&secs| secs > 0)
                .unwrap_or(Self::DEFAULT_DOWNLOAD_TIMEOUT_SECONDS),
        )
    }

    #[must_use]
    pub fn upload_timeout(&self) -> Option<Duration> {
        self.upload_timeout_seconds
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(env::temp_dir)
    }

    #[must_use]
    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(default_user_agent)
    }

    #[must_use]
    pub fn timeout_warning(&self) -> Option<Duration> {
        let ms = self
            .timeout_warning_ms
            .unwrap_or(Self::DEFAULT_TIMEOUT_WARNING_MS);
        (ms > 0).then(|| Duration::from_millis(ms))
    }
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_PATH_ENV)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
}

fn default_user_agent() -> String {
    format!("imgpack/{}", env!("CARGO_PKG_VERSION"))
}

fn parse_u64(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv {
            var,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::{BundlerConfig, ConfigError};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |var: &str| map.get(var).cloned()
    }

    #[test]
    fn defaults_match_handler_contract() {
        let config = BundlerConfig::default();
        assert_eq!(config.download_timeout(), Duration::from_secs(15));
        assert_eq!(config.upload_timeout(), None);
        assert_eq!(config.timeout_warning(), Some(Duration::from_millis(1500)));
        assert!(config.user_agent().starts_with("imgpack/"));
        assert_eq!(config.work_dir(), std::env::temp_dir());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = BundlerConfig::from_file(&dir.path().join("absent.toml")).expect("ok");
        assert!(result.is_none());
    }

    #[test]
    fn parses_toml_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("imgpack.toml");
        std::fs::write(
            &path,
            "download_timeout_seconds = 30\nupload_timeout_seconds = 60\nwork_dir = \"/scratch\"\n",
        )
        .expect("write");

        let config = BundlerConfig::from_file(&path).expect("ok").expect("some");
        assert_eq!(config.download_timeout(), Duration::from_secs(30));
        assert_eq!(config.upload_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.work_dir(), PathBuf::from("/scratch"));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("imgpack.toml");
        std::fs::write(&path, "download_timeout_seconds = \"soon\"").expect("write");

        let err = BundlerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = BundlerConfig {
            download_timeout_seconds: Some(30),
            user_agent: Some("from-file".to_string()),
            ..Default::default()
        };
        config
            .apply_env(lookup(&[
                ("IMGPACK_DOWNLOAD_TIMEOUT_SECS", "5"),
                ("IMGPACK_USER_AGENT", "from-env"),
                ("IMGPACK_WORK_DIR", "/var/tmp"),
                ("IMGPACK_TIMEOUT_WARNING_MS", "0"),
            ]))
            .expect("apply");

        assert_eq!(config.download_timeout(), Duration::from_secs(5));
        assert_eq!(config.user_agent(), "from-env");
        assert_eq!(config.work_dir(), PathBuf::from("/var/tmp"));
        assert_eq!(config.timeout_warning(), None);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = BundlerConfig {
            upload_timeout_seconds: Some(10),
            ..Default::default()
        };
        config
            .apply_env(lookup(&[("IMGPACK_UPLOAD_TIMEOUT_SECS", "  ")]))
            .expect("apply");
        assert_eq!(config.upload_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn non_numeric_env_is_rejected() {
        let mut config = BundlerConfig::default();
        let err = config
            .apply_env(lookup(&[("IMGPACK_DOWNLOAD_TIMEOUT_SECS", "fifteen")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                var: "IMGPACK_DOWNLOAD_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn zero_upload_timeout_means_none() {
        let config = BundlerConfig {
            upload_timeout_seconds: Some(0),
            ..Default::default()
        };
        assert_eq!(config.upload_timeout(), None);
    }

    #[test]
    fn zero_download_timeout_falls_back_to_default() {
        let from_file = BundlerConfig {
            download_timeout_seconds: Some(0),
            ..Default::default()
        };
        assert_eq!(from_file.download_timeout(), Duration::from_secs(15));

        let mut from_env = BundlerConfig::default();
        from_env
            .apply_env(lookup(&[("IMGPACK_DOWNLOAD_TIMEOUT_SECS", "0")]))
            .expect("apply");
        assert_eq!(from_env.download_timeout(), Duration::from_secs(15));
    }
}
