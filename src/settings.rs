// Engine configuration
//
// Layering, lowest to highest precedence:
//   built-in defaults  <  TOML file  <  SECURE_ERASE_* environment
//
// Nested keys use a double underscore in the environment, e.g.
// SECURE_ERASE_FALLBACK__TIMEOUT_MULTIPLIER=4.

use crate::algorithms::BUFFER_SIZE;
use crate::error::{EraseError, EraseResult};
use ::config::{Config, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "SECURE_ERASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Chunk size used by every pass
    pub buffer_size: usize,
    /// Sector size used for progress reporting only
    pub sector_size: u64,
    /// Refuse to open devices held by another process
    pub exclusive_open: bool,
    pub status: StatusConfig,
    pub fallback: FallbackConfig,
    pub logging: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_size: BUFFER_SIZE,
            sector_size: 512,
            exclusive_open: true,
            status: StatusConfig::default(),
            fallback: FallbackConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Status file mirrored while a session runs; none disables mirroring
    pub file: Option<PathBuf>,
    pub interval_ms: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            file: None,
            interval_ms: 500,
        }
    }
}

impl StatusConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(50))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
    /// Route zero-size devices to the fallback utility instead of failing
    pub on_zero_size: bool,
    pub poll_interval_ms: u64,
    /// Conservative throughput for the time-based estimate
    pub assumed_throughput_mib_s: f64,
    /// Hard timeout = estimated duration x multiplier
    pub timeout_multiplier: f64,
    /// Lower bound on the hard timeout
    pub min_timeout_secs: u64,
    /// Estimated duration when the device size is unknown
    pub default_estimate_secs: u64,
    /// Replaces the platform's default utility
    pub command: Option<CommandConfig>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_zero_size: false,
            poll_interval_ms: 500,
            assumed_throughput_mib_s: 30.0,
            timeout_multiplier: 3.0,
            min_timeout_secs: 600,
            default_estimate_secs: 7200,
            command: None,
        }
    }
}

impl FallbackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.clamp(50, 1000))
    }
}

/// External wipe utility. `{device}` and `{disk}` are substituted in
/// `args` and `stdin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub stdin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter when RUST_LOG is unset
    pub level: String,
    pub json: bool,
    /// Daily rolling log files go here when set
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            directory: None,
        }
    }
}

impl EngineConfig {
    /// Load defaults, then the config file, then the environment.
    ///
    /// An explicit `path` must exist; the per-user default file is optional.
    pub fn load(path: Option<&Path>) -> EraseResult<Self> {
        let mut builder = Config::builder();

        match path {
            Some(explicit) => {
                builder = builder.add_source(File::from(explicit).format(FileFormat::Toml).required(true));
            }
            None => {
                if let Some(default) = Self::default_config_path() {
                    builder =
                        builder.add_source(File::from(default).format(FileFormat::Toml).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// `config.toml` in the platform's per-user config directory
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "secure-erase").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> EraseResult<()> {
        if self.buffer_size == 0 {
            return Err(EraseError::Config("buffer_size must be greater than zero".to_string()));
        }
        if self.sector_size == 0 {
            return Err(EraseError::Config("sector_size must be greater than zero".to_string()));
        }
        let fallback = &self.fallback;
        if !fallback.assumed_throughput_mib_s.is_finite() || fallback.assumed_throughput_mib_s <= 0.0 {
            return Err(EraseError::Config(
                "fallback.assumed_throughput_mib_s must be positive".to_string(),
            ));
        }
        if !fallback.timeout_multiplier.is_finite() || fallback.timeout_multiplier < 1.0 {
            return Err(EraseError::Config(
                "fallback.timeout_multiplier must be at least 1.0".to_string(),
            ));
        }
        if let Some(command) = &fallback.command {
            if command.program.trim().is_empty() {
                return Err(EraseError::Config("fallback.command.program is empty".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_size, 1024 * 1024);
        assert!(config.fallback.enabled);
        assert!(!config.fallback.on_zero_size);
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "buffer_size = 65536\n\n[fallback]\ntimeout_multiplier = 5.0\n\n[fallback.command]\nprogram = \"shred\"\nargs = [\"-n\", \"1\", \"{{device}}\"]\n"
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.buffer_size, 65536);
        assert_eq!(config.fallback.timeout_multiplier, 5.0);
        assert_eq!(config.fallback.min_timeout_secs, 600, "Unset keys keep defaults");

        let command = config.fallback.command.unwrap();
        assert_eq!(command.program, "shred");
        assert_eq!(command.args, vec!["-n", "1", "{device}"]);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[fallback]\npoll_interval_ms = 900").unwrap();

        std::env::set_var("SECURE_ERASE_FALLBACK__POLL_INTERVAL_MS", "700");
        let result = EngineConfig::load(Some(file.path()));
        std::env::remove_var("SECURE_ERASE_FALLBACK__POLL_INTERVAL_MS");

        assert_eq!(result.unwrap().fallback.poll_interval_ms, 700);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_error() {
        let err = EngineConfig::load(Some(Path::new("/nonexistent/secure-erase.toml"))).unwrap_err();
        assert!(matches!(err, EraseError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let config = EngineConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shrinking_multiplier() {
        let mut config = EngineConfig::default();
        config.fallback.timeout_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_is_bounded() {
        let mut fallback = FallbackConfig::default();
        fallback.poll_interval_ms = 10_000;
        assert_eq!(fallback.poll_interval(), Duration::from_secs(1));
    }
}
