//! Configuration loading from TOML files

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings read from `pkgsweep.toml`.
///
/// Every field is optional; unset ones keep the library default.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub paths: PathsConfig,
    pub sweep: SweepConfig,
    pub main: PassFileConfig,
    pub retry: PassFileConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub names_file: Option<PathBuf>,
    pub error_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub start: Option<usize>,
    pub retry_errors: Option<bool>,
    pub skip_main: Option<bool>,
    pub skip_completed: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PassFileConfig {
    pub shard_size: Option<NonZeroUsize>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub registry_url: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub max_in_flight: Option<NonZeroUsize>,
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

fn apply_pass(pass: &mut pkgsweep_npm::PassConfig, file: &PassFileConfig) {
    if let Some(size) = file.shard_size {
        pass.shard_size = size;
    }
    if let Some(ms) = file.interval_ms {
        pass.pacing.interval = Duration::from_millis(ms);
    }
}

impl FileConfig {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./pkgsweep.toml (current directory)
    /// 2. ~/.config/pkgsweep/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("pkgsweep.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "pkgsweep") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Library config with the file's values laid over the defaults
    pub fn resolve(&self) -> pkgsweep_npm::Config {
        let mut config = pkgsweep_npm::Config::default();

        if let Some(p) = &self.paths.names_file {
            config.names_file = p.clone();
        }
        if let Some(p) = &self.paths.error_file {
            config.error_file = p.clone();
        }
        if let Some(p) = &self.paths.output_dir {
            config.output_dir = p.clone();
        }

        let sweep = &self.sweep;
        config.start = sweep.start.unwrap_or(config.start);
        config.retry_errors = sweep.retry_errors.unwrap_or(config.retry_errors);
        config.skip_main = sweep.skip_main.unwrap_or(config.skip_main);
        config.skip_completed = sweep.skip_completed.unwrap_or(config.skip_completed);

        apply_pass(&mut config.main, &self.main);
        apply_pass(&mut config.retry, &self.retry);

        let http = &self.http;
        if let Some(url) = &http.registry_url {
            config.registry_url = url.clone();
        }
        if let Some(n) = http.max_attempts {
            config.retry_policy.max_attempts = n;
        }
        if let Some(ms) = http.base_delay_ms {
            config.retry_policy.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = http.timeout_ms {
            config.retry_policy.timeout_unit = Duration::from_millis(ms);
        }
        if let Some(ms) = http.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if http.max_in_flight.is_some() {
            config.main.pacing.max_in_flight = http.max_in_flight;
            config.retry.pacing.max_in_flight = http.max_in_flight;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_keeps_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        let resolved = config.resolve();
        let defaults = pkgsweep_npm::Config::default();
        assert_eq!(resolved.names_file, defaults.names_file);
        assert_eq!(resolved.main, defaults.main);
        assert_eq!(resolved.retry, defaults.retry);
        assert_eq!(resolved.retry_policy, defaults.retry_policy);
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[paths]
names_file = "/data/names.json"
output_dir = "/data/out"

[sweep]
start = 3
retry_errors = false

[main]
shard_size = 500
interval_ms = 10

[retry]
interval_ms = 1000

[http]
registry_url = "https://mirror.example.com/"
max_attempts = 3
base_delay_ms = 250
max_in_flight = 64
"#;
        let resolved = toml::from_str::<FileConfig>(toml).unwrap().resolve();
        assert_eq!(resolved.names_file, PathBuf::from("/data/names.json"));
        assert_eq!(resolved.output_dir, PathBuf::from("/data/out"));
        assert_eq!(resolved.error_file, PathBuf::from("errorlist"));
        assert_eq!(resolved.start, 3);
        assert!(!resolved.retry_errors);
        assert_eq!(resolved.main.shard_size.get(), 500);
        assert_eq!(resolved.main.pacing.interval, Duration::from_millis(10));
        assert_eq!(resolved.retry.shard_size.get(), 2_000);
        assert_eq!(resolved.retry.pacing.interval, Duration::from_secs(1));
        assert_eq!(resolved.registry_url, "https://mirror.example.com/");
        assert_eq!(resolved.retry_policy.max_attempts, 3);
        assert_eq!(resolved.retry_policy.base_delay, Duration::from_millis(250));
        assert_eq!(resolved.main.pacing.max_in_flight.map(|n| n.get()), Some(64));
        assert_eq!(resolved.retry.pacing.max_in_flight.map(|n| n.get()), Some(64));
    }

    #[test]
    fn zero_shard_size_is_rejected() {
        assert!(toml::from_str::<FileConfig>("[main]\nshard_size = 0\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<FileConfig>("[main]\nshard = 10\n").is_err());
    }

    #[test]
    fn from_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgsweep.toml");
        std::fs::write(&path, "[http\n").unwrap();
        let err = FileConfig::from_file(&path).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse config file"));
    }
}
