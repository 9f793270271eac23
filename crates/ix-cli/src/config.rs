//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ix_coord::CoordinatorConfig;
use ix_coord::export::DEFAULT_MAX_EXPORT_BYTES;
use ix_core::CaptureConfig;
use ix_db::WritePolicy;
use serde::{Deserialize, Serialize};

/// Write failure handling, as named in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicyName {
    #[default]
    LogAndContinue,
    AtLeastOnce,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Directory exports are written to.
    pub export_dir: PathBuf,
    pub max_export_bytes: usize,
    pub write_policy: WritePolicyName,
    /// Attempts per write under `at_least_once`.
    pub max_write_attempts: u32,
    /// URL schemes never recorded.
    pub privileged_schemes: Vec<String>,
    /// How long each page gets to answer a status request.
    pub status_timeout_ms: u64,
    /// Page capture timing.
    pub capture: CaptureConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let coordinator = CoordinatorConfig::default();
        Self {
            database_path: data_dir.join("ix.db"),
            export_dir: data_dir.join("exports"),
            max_export_bytes: DEFAULT_MAX_EXPORT_BYTES,
            write_policy: WritePolicyName::default(),
            max_write_attempts: 3,
            privileged_schemes: coordinator.privileged_schemes,
            status_timeout_ms: coordinator.status_timeout_ms,
            capture: CaptureConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `~/.config/ix/config.toml`, the given
    /// file, then `IX_*` environment variables (`__` separates nested keys,
    /// e.g. `IX_CAPTURE__IDLE_THRESHOLD_MS`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("IX_").split("__"));

        figment.extract()
    }

    pub const fn write_policy(&self) -> WritePolicy {
        match self.write_policy {
            WritePolicyName::LogAndContinue => WritePolicy::LogAndContinue,
            WritePolicyName::AtLeastOnce => WritePolicy::AtLeastOnce {
                max_attempts: self.max_write_attempts,
            },
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            privileged_schemes: self.privileged_schemes.clone(),
            max_export_bytes: self.max_export_bytes,
            status_timeout_ms: self.status_timeout_ms,
        }
    }
}

/// Returns the platform-specific config directory for ix.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ix"))
}

/// Returns the platform-specific data directory for ix.
///
/// On Linux: `~/.local/share/ix`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("ix"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_data_dir() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("ix.db"));
        assert_eq!(config.export_dir, data_dir.join("exports"));
        assert_eq!(config.capture.idle_threshold_ms, 3000);
        assert!(config.privileged_schemes.iter().any(|s| s == "chrome"));
    }

    #[test]
    fn test_config_file_overrides_nested_capture_keys() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ix.toml");
        std::fs::write(
            &path,
            r#"
database_path = "/tmp/ix-test.db"
write_policy = "at_least_once"
max_write_attempts = 5

[capture]
idle_threshold_ms = 1200
"#,
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/ix-test.db"));
        assert_eq!(config.capture.idle_threshold_ms, 1200);
        assert_eq!(config.capture.flush_interval_ms, 5000);
        assert_eq!(
            config.write_policy(),
            WritePolicy::AtLeastOnce { max_attempts: 5 }
        );
    }

    #[test]
    fn test_coordinator_config_carries_export_limit_and_status_timeout() {
        let config = Config {
            max_export_bytes: 1024,
            ..Config::default()
        };
        let coordinator = config.coordinator_config();
        assert_eq!(coordinator.max_export_bytes, 1024);
        assert_eq!(coordinator.status_timeout_ms, 1000);
    }

    #[test]
    fn test_status_timeout_is_configurable() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ix.toml");
        std::fs::write(&path, "status_timeout_ms = 250\n").unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.status_timeout_ms, 250);
        assert_eq!(config.coordinator_config().status_timeout_ms, 250);
    }
}
