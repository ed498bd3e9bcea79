//! Resolved configuration.
//!
//! Converts the optional, boundary-level [`BundlerConfig`] into concrete values
//! once per process so the pipeline never handles `Option` defaults.
use std::path::PathBuf;
use std::time::Duration;

use imgpack_config::BundlerConfig;

#[derive(Debug, Clone)]
pub(crate) struct ResolvedConfig {
    pub work_dir: PathBuf,
    pub user_agent: String,
    pub download_timeout: Duration,
    pub upload_timeout: TimeoutSetting,
}

impl ResolvedConfig {
    pub fn from_config(config: &BundlerConfig) -> Self {
        Self {
            work_dir: config.work_dir(),
            user_agent: config.user_agent(),
            download_timeout: config.download_timeout(),
            upload_timeout: config
                .upload_timeout()
                .map_or(TimeoutSetting::Disabled, TimeoutSetting::Enabled),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimeoutSetting {
    Disabled,
    Enabled(Duration),
}
